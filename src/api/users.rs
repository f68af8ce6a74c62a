use std::sync::Arc;

use chrono::DateTime;
use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::{ApiResponse, OpenApi, Tags, payload::Json};

use crate::api::helpers::authenticate;
use crate::api::{Api, BearerAuth};
use crate::config::RuntimeEnvironment;
use crate::coordinators::UserCoordinator;
use crate::errors::internal::RequestError;
use crate::errors::{ApiError, InternalError};
use crate::providers::TokenProvider;
use crate::types::dto::common::{Envelope, MessageEnvelope, PaginatedEnvelope};
use crate::types::dto::user::{
    BulkOutcomeDto, BulkUpdateRequest, CreateUserRequest, ResetPasswordRequest, UpdateUserRequest,
    UserDto,
};
use crate::types::internal::query::{PageRequest, SortOrder, UserQuery, UserSortField};

/// User administration endpoints
pub struct UserApi {
    user_coordinator: Arc<UserCoordinator>,
    token_provider: Arc<TokenProvider>,
    environment: RuntimeEnvironment,
}

impl UserApi {
    pub fn new(
        user_coordinator: Arc<UserCoordinator>,
        token_provider: Arc<TokenProvider>,
        environment: RuntimeEnvironment,
    ) -> Self {
        Self {
            user_coordinator,
            token_provider,
            environment,
        }
    }
}

impl Api for UserApi {
    fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }
}

#[derive(Tags)]
enum UserTags {
    /// User management
    Users,
}

#[derive(ApiResponse)]
enum CreateUserResponse {
    /// User created
    #[oai(status = 201)]
    Created(Json<Envelope<UserDto>>),
}

/// Parse an RFC 3339 filter bound into unix seconds
fn timestamp_filter(name: &str, value: Option<String>) -> Result<Option<i64>, InternalError> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| dt.timestamp())
                .map_err(|_| {
                    InternalError::from(RequestError::invalid(format!(
                        "{} must be an RFC 3339 timestamp",
                        name
                    )))
                })
        })
        .transpose()
}

#[OpenApi]
impl UserApi {
    /// List users with filters, sorting and pagination
    #[oai(path = "/users", method = "get", tag = "UserTags::Users")]
    async fn list(
        &self,
        req: &Request,
        auth: BearerAuth,
        page: Query<Option<u64>>,
        limit: Query<Option<u64>>,
        #[oai(name = "sortBy")] sort_by: Query<Option<String>>,
        #[oai(name = "sortOrder")] sort_order: Query<Option<String>>,
        #[oai(name = "isActive")] is_active: Query<Option<bool>>,
        #[oai(name = "isVerified")] is_verified: Query<Option<bool>>,
        #[oai(name = "isLocked")] is_locked: Query<Option<bool>>,
        search: Query<Option<String>>,
        #[oai(name = "roleId")] role_id: Query<Option<i32>>,
        #[oai(name = "createdAfter")] created_after: Query<Option<String>>,
        #[oai(name = "createdBefore")] created_before: Query<Option<String>>,
    ) -> Result<Json<PaginatedEnvelope<UserDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;

        let query = UserQuery {
            is_active: is_active.0,
            is_verified: is_verified.0,
            is_locked: is_locked.0,
            search: search.0.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            role_id: role_id.0,
            created_after: timestamp_filter("createdAfter", created_after.0).map_err(|e| self.fail(e))?,
            created_before: timestamp_filter("createdBefore", created_before.0)
                .map_err(|e| self.fail(e))?,
            sort_by: UserSortField::parse_or_default(sort_by.0.as_deref()),
            order: SortOrder::parse_or_default(sort_order.0.as_deref()),
            page: PageRequest::new(page.0, limit.0),
        };

        let users = self
            .user_coordinator
            .list(&ctx, &query)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(PaginatedEnvelope::from_page(
            "Users retrieved successfully!",
            users.map(|snapshot| UserDto::from(&snapshot)),
        )))
    }

    /// Create a user with a generated password
    #[oai(path = "/users", method = "post", tag = "UserTags::Users")]
    async fn create(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<CreateUserRequest>,
    ) -> Result<CreateUserResponse, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let created = self
            .user_coordinator
            .create(&ctx, body.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(CreateUserResponse::Created(Json(Envelope::created(
            "User created successfully!",
            UserDto::from(&created),
        ))))
    }

    /// Apply the same update to up to 100 users
    #[oai(path = "/users/bulk-update", method = "post", tag = "UserTags::Users")]
    async fn bulk_update(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<BulkUpdateRequest>,
    ) -> Result<Json<Envelope<BulkOutcomeDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let BulkUpdateRequest { user_ids, update } = body.0;
        update.validate().map_err(|e| self.fail(e.into()))?;

        let outcome = self
            .user_coordinator
            .bulk_update(&ctx, &user_ids, update.into_update())
            .await
            .map_err(|e| self.fail(e))?;

        let message = format!(
            "Bulk update completed: {} succeeded, {} failed",
            outcome.success, outcome.failed
        );
        Ok(Json(Envelope::ok(message, BulkOutcomeDto::from(outcome))))
    }

    #[oai(path = "/users/:id", method = "get", tag = "UserTags::Users")]
    async fn get(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<Envelope<UserDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        let user = self
            .user_coordinator
            .get(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok("User retrieved successfully!", UserDto::from(&user))))
    }

    /// Partial update; `roleIds` replaces the role set when present
    #[oai(path = "/users/:id", method = "put", tag = "UserTags::Users")]
    async fn update(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
        body: Json<UpdateUserRequest>,
    ) -> Result<Json<Envelope<UserDto>>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        let user = self
            .user_coordinator
            .update(&ctx, id.0, body.0.into_update())
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok("User updated successfully!", UserDto::from(&user))))
    }

    #[oai(path = "/users/:id", method = "delete", tag = "UserTags::Users")]
    async fn delete(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        self.user_coordinator
            .delete(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("User deleted successfully!")))
    }

    /// Set a new password, clearing the lock and the failed-attempt counter
    #[oai(path = "/users/:id/reset-password", method = "post", tag = "UserTags::Users")]
    async fn reset_password(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
        body: Json<ResetPasswordRequest>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        self.user_coordinator
            .reset_password(&ctx, id.0, &body.new_password)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("Password reset successfully!")))
    }

    #[oai(path = "/users/:id/unlock", method = "post", tag = "UserTags::Users")]
    async fn unlock(
        &self,
        req: &Request,
        auth: BearerAuth,
        id: Path<i32>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = authenticate(self, req, &auth, &self.token_provider)?;
        self.user_coordinator
            .unlock(&ctx, id.0)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("User unlocked successfully!")))
    }
}
