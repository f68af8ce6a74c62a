use std::sync::Arc;

use poem::Request;
use poem_openapi::{OpenApi, SecurityScheme, Tags, auth::Bearer, payload::Json};

use crate::api::Api;
use crate::api::helpers::{anonymous_context, authenticate};
use crate::config::RuntimeEnvironment;
use crate::coordinators::AuthCoordinator;
use crate::errors::ApiError;
use crate::types::dto::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};
use crate::types::dto::common::{Envelope, MessageEnvelope};
use crate::types::dto::user::UserDto;
use crate::types::internal::context::RequestContext;

/// Authentication API endpoints
pub struct AuthApi {
    auth_coordinator: Arc<AuthCoordinator>,
    environment: RuntimeEnvironment,
}

impl AuthApi {
    pub fn new(auth_coordinator: Arc<AuthCoordinator>, environment: RuntimeEnvironment) -> Self {
        Self {
            auth_coordinator,
            environment,
        }
    }

    fn authenticate(&self, req: &Request, auth: &BearerAuth) -> Result<RequestContext, ApiError> {
        authenticate(self, req, auth, &self.auth_coordinator.token_provider())
    }
}

impl Api for AuthApi {
    fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }
}

/// JWT Bearer token authentication
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    key_name = "Authorization",
    key_in = "header",
    bearer_format = "JWT"
)]
pub struct BearerAuth(pub Bearer);

/// API tags for authentication endpoints
#[derive(Tags)]
enum AuthTags {
    /// Authentication endpoints
    Authentication,
}

#[OpenApi(prefix_path = "/auth")]
impl AuthApi {
    /// Login with username and password
    ///
    /// Returns an access/refresh token pair together with the sanitized user,
    /// its role names and its effective permissions.
    #[oai(path = "/login", method = "post", tag = "AuthTags::Authentication")]
    async fn login(
        &self,
        req: &Request,
        body: Json<LoginRequest>,
    ) -> Result<Json<Envelope<LoginResponse>>, ApiError> {
        body.validate().map_err(|e| self.fail(e.into()))?;
        let ctx = anonymous_context(self, req);

        let session = self
            .auth_coordinator
            .login(&ctx, &body.username, &body.password)
            .await
            .map_err(|e| self.fail(e))?;

        let response = LoginResponse {
            access_token: session.tokens.access_token.clone(),
            refresh_token: session.tokens.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: session.tokens.expires_in,
            user: UserDto::from(&session.user),
            roles: session.user.role_names(),
            permissions: session.user.effective_permissions().into_iter().collect(),
        };
        Ok(Json(Envelope::ok("Login successfully!", response)))
    }

    /// Exchange a refresh token for a new token pair
    #[oai(path = "/refresh-token", method = "post", tag = "AuthTags::Authentication")]
    async fn refresh_token(
        &self,
        req: &Request,
        body: Json<RefreshRequest>,
    ) -> Result<Json<Envelope<RefreshResponse>>, ApiError> {
        let ctx = anonymous_context(self, req);
        let tokens = self
            .auth_coordinator
            .refresh(&ctx, &body.refresh_token)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok(
            "Token refreshed successfully!",
            RefreshResponse {
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
                token_type: "Bearer".to_string(),
                expires_in: tokens.expires_in,
            },
        )))
    }

    /// Current user with roles and effective permissions
    #[oai(path = "/profile", method = "get", tag = "AuthTags::Authentication")]
    async fn profile(
        &self,
        req: &Request,
        auth: BearerAuth,
    ) -> Result<Json<Envelope<UserDto>>, ApiError> {
        let ctx = self.authenticate(req, &auth)?;
        let snapshot = self
            .auth_coordinator
            .profile(&ctx)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(Envelope::ok("Profile retrieved successfully!", UserDto::from(&snapshot))))
    }

    #[oai(path = "/change-password", method = "post", tag = "AuthTags::Authentication")]
    async fn change_password(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<ChangePasswordRequest>,
    ) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = self.authenticate(req, &auth)?;
        body.validate().map_err(|e| self.fail(e.into()))?;

        self.auth_coordinator
            .change_password(&ctx, &body.current_password, &body.new_password)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("Password changed successfully!")))
    }

    /// Acknowledge logout; tokens stay valid until they expire
    #[oai(path = "/logout", method = "post", tag = "AuthTags::Authentication")]
    async fn logout(&self, req: &Request, auth: BearerAuth) -> Result<Json<MessageEnvelope>, ApiError> {
        let ctx = self.authenticate(req, &auth)?;
        self.auth_coordinator
            .logout(&ctx)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(Json(MessageEnvelope::message("Logout successful!")))
    }
}
