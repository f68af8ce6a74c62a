use std::sync::Arc;

use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::{ApiResponse, OpenApi, Tags, payload::Json};

use crate::api::helpers::authenticate;
use crate::api::{Api, BearerAuth};
use crate::config::RuntimeEnvironment;
use crate::coordinators::PermissionCoordinator;
use crate::errors::ApiError;
use crate::providers::TokenProvider;
use crate::types::dto::common::{Envelope, MessageEnvelope, PaginatedEnvelope};
use crate::types::dto::permission::{PermissionDto, PermissionRequest};
use crate::types::internal::query::{PageRequest, PermissionQuery};
use crate::types::internal::rbac::{PermissionAction, PermissionModule};

/// Permission catalogue endpoints, restricted to superadmins
pub struct PermissionApi {
    permission_coordinator: Arc<PermissionCoordinator>,
    token_provider: Arc<TokenProvider>,
    environment: RuntimeEnvironment,
}

impl PermissionApi {
    pub fn new(
        permission_coordinator: Arc<PermissionCoordinator>,
        token_provider: Arc<TokenProvider>,
        environment: RuntimeEnvironment,
    ) -> Self {
        Self {
            permission_coordinator,
            token_provider,
            environment,
        }
    }
}

impl Api for PermissionApi {
    fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }
}

#[derive(Tags)]
enum PermissionTags {
    /// Permission catalogue
    Permissions,
}

#[derive(ApiResponse)]
enum CreatePermissionResponse {
    /// Permission created
    #[oai(status = 201)]
    Created(Json<Envelope<PermissionDto>>),
}

#[OpenApi]
impl PermissionApi {
    #[oai(path = "/permissions", method = "get", tag = "PermissionTags::Permissions")]
    async fn list(
        &self,
        req: &Request,
        auth: BearerAuth,
        page: Query<Option<u64>>,
        limit: Query<Option<u64>>,
        module: Query<Option<PermissionModule>>,
        action: Query<Option<PermissionAction>>,
    ) -> Result<Json<PaginatedEnvelope<PermissionDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let query = PermissionQuery {
            module: module.0,
            action: action.0,
            page: PageRequest::new(page.0, limit.0),
        };

        let permissions = self
            .permission_coordinator
            .list(&ctx, &query)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(PaginatedEnvelope::from_page(
            "Permissions retrieved successfully",
            permissions.map(|model| PermissionDto::from(&model)),
        )))
    }

    #[oai(path = "/permissions", method = "post", tag = "PermissionTags::Permissions")]
    async fn create(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<PermissionRequest>,
    ) -> Result<CreatePermissionResponse, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let permission = self
            .permission_coordinator
            .create(&ctx, body.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(CreatePermissionResponse::Created(Json(Envelope::created(
            "Permission created successfully",
            PermissionDto::from(&permission),
        ))))
    }

    #[oai(path = "/permissions/:id", method = "get", tag = "PermissionTags::Permissions")]
    async fn get(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<Envelope<PermissionDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let permission = self
            .permission_coordinator
            .get(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok(
            "Permission retrieved successfully",
            PermissionDto::from(&permission),
        )))
    }

    #[oai(path = "/permissions/:id", method = "put", tag = "PermissionTags::Permissions")]
    async fn update(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
        body: Json<PermissionRequest>,
    ) -> Result<Json<Envelope<PermissionDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let permission = self
            .permission_coordinator
            .update(&ctx, id.0, body.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok(
            "Permission updated successfully",
            PermissionDto::from(&permission),
        )))
    }

    /// Delete a permission no role grants
    #[oai(path = "/permissions/:id", method = "delete", tag = "PermissionTags::Permissions")]
    async fn delete(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        self.permission_coordinator
            .delete(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("Permission deleted successfully")))
    }
}
