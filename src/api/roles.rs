use std::sync::Arc;

use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::{ApiResponse, OpenApi, Tags, payload::Json};

use crate::api::helpers::authenticate;
use crate::api::{Api, BearerAuth};
use crate::config::RuntimeEnvironment;
use crate::coordinators::RoleCoordinator;
use crate::errors::ApiError;
use crate::providers::TokenProvider;
use crate::types::dto::common::{Envelope, MessageEnvelope, PaginatedEnvelope};
use crate::types::dto::role::{CreateRoleRequest, RoleDto, UpdateRoleRequest};
use crate::types::dto::user::UserDto;
use crate::types::internal::query::{PageRequest, RoleQuery};

/// Role management endpoints
pub struct RoleApi {
    role_coordinator: Arc<RoleCoordinator>,
    token_provider: Arc<TokenProvider>,
    environment: RuntimeEnvironment,
}

impl RoleApi {
    pub fn new(
        role_coordinator: Arc<RoleCoordinator>,
        token_provider: Arc<TokenProvider>,
        environment: RuntimeEnvironment,
    ) -> Self {
        Self {
            role_coordinator,
            token_provider,
            environment,
        }
    }
}

impl Api for RoleApi {
    fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }
}

#[derive(Tags)]
enum RoleTags {
    /// Role management
    Roles,
}

#[derive(ApiResponse)]
enum CreateRoleResponse {
    /// Role created
    #[oai(status = 201)]
    Created(Json<Envelope<RoleDto>>),
}

#[OpenApi]
impl RoleApi {
    /// List roles with their permissions and member counts
    #[oai(path = "/roles", method = "get", tag = "RoleTags::Roles")]
    async fn list(
        &self,
        req: &Request,
        auth: BearerAuth,
        page: Query<Option<u64>>,
        limit: Query<Option<u64>>,
        name: Query<Option<String>>,
        #[oai(name = "isSystem")] is_system: Query<Option<bool>>,
        permission: Query<Option<String>>,
    ) -> Result<Json<PaginatedEnvelope<RoleDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let query = RoleQuery {
            name: name.0.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            is_system: is_system.0,
            permission: permission.0.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            page: PageRequest::new(page.0, limit.0),
        };

        let roles = self
            .role_coordinator
            .list(&ctx, &query)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(PaginatedEnvelope::from_page(
            "Roles retrieved successfully",
            roles.map(|snapshot| RoleDto::from(&snapshot)),
        )))
    }

    #[oai(path = "/roles", method = "post", tag = "RoleTags::Roles")]
    async fn create(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<CreateRoleRequest>,
    ) -> Result<CreateRoleResponse, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let role = self
            .role_coordinator
            .create(&ctx, body.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(CreateRoleResponse::Created(Json(Envelope::created(
            "Role created successfully",
            RoleDto::from(&role),
        ))))
    }

    #[oai(path = "/roles/:id", method = "get", tag = "RoleTags::Roles")]
    async fn get(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<Envelope<RoleDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let role = self
            .role_coordinator
            .get(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok("Role retrieved successfully", RoleDto::from(&role))))
    }

    /// Users currently holding the role
    #[oai(path = "/roles/:id/users", method = "get", tag = "RoleTags::Roles")]
    async fn users(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<Envelope<Vec<UserDto>>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let users = self
            .role_coordinator
            .users(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok(
            "Role users retrieved successfully",
            users.iter().map(UserDto::from_model).collect(),
        )))
    }

    /// Partial update; `permissionIds` replaces the permission set when present
    #[oai(path = "/roles/:id", method = "put", tag = "RoleTags::Roles")]
    async fn update(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
        body: Json<UpdateRoleRequest>,
    ) -> Result<Json<Envelope<RoleDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let role = self
            .role_coordinator
            .update(&ctx, id.0, body.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok("Role updated successfully", RoleDto::from(&role))))
    }

    /// Delete a non-system role nobody holds
    #[oai(path = "/roles/:id", method = "delete", tag = "RoleTags::Roles")]
    async fn delete(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        self.role_coordinator
            .delete(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("Role deleted successfully")))
    }
}
