// API layer - HTTP endpoints
pub mod auth;
pub mod health;
pub mod helpers;
pub mod permissions;
pub mod roles;
pub mod users;

pub use auth::{AuthApi, BearerAuth};
pub use health::HealthApi;
pub use permissions::PermissionApi;
pub use roles::RoleApi;
pub use users::UserApi;

use std::sync::Arc;

use poem::{Endpoint, EndpointExt, IntoResponse, Request, Response, Route};
use poem_openapi::OpenApiService;
use poem_openapi::error::AuthorizationError;

use crate::app_data::AppData;
use crate::config::RuntimeEnvironment;
use crate::coordinators::{
    AuthCoordinator, PermissionCoordinator, RoleCoordinator, UserCoordinator,
};
use crate::errors::{ApiError, InternalError};

/// Answer for requests the bearer scheme rejects before any handler runs
pub const MISSING_TOKEN_MESSAGE: &str = "Access token is required";

/// Full HTTP surface: the API under `/api` and Swagger UI under `/swagger`
///
/// A missing or malformed `Authorization` header never reaches a handler;
/// it is caught here and answered with the usual error envelope.
pub fn routes(app_data: Arc<AppData>) -> impl Endpoint<Output = Response> {
    let settings = app_data.settings.clone();
    let environment = settings.environment;
    let token_provider = app_data.token_provider.clone();

    let auth_api = AuthApi::new(Arc::new(AuthCoordinator::new(app_data.clone())), environment);
    let user_api = UserApi::new(
        Arc::new(UserCoordinator::new(app_data.clone())),
        token_provider.clone(),
        environment,
    );
    let role_api = RoleApi::new(
        Arc::new(RoleCoordinator::new(app_data.clone())),
        token_provider.clone(),
        environment,
    );
    let permission_api = PermissionApi::new(
        Arc::new(PermissionCoordinator::new(app_data)),
        token_provider,
        environment,
    );

    let api_service = OpenApiService::new(
        (HealthApi, auth_api, user_api, role_api, permission_api),
        "RBAC Backend API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("http://localhost:{}/api", settings.server_port));

    // Generate Swagger UI from OpenAPI service
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/api", api_service)
        .nest("/swagger", ui)
        .catch_error(|err: AuthorizationError| async move {
            tracing::debug!("Request rejected by bearer scheme: {}", err);
            ApiError::unauthorized(MISSING_TOKEN_MESSAGE).into_response()
        })
}

pub trait Api {
    /// Runtime environment, deciding how much error detail leaves the service
    fn environment(&self) -> RuntimeEnvironment;

    fn extract_ip_address(&self, req: &Request) -> Option<String> {
        // Check X-Forwarded-For header (proxy/load balancer)
        if let Some(forwarded) = req.header("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }

        // Check X-Real-IP header (nginx)
        if let Some(real_ip) = req.header("X-Real-IP") {
            return Some(real_ip.trim().to_string());
        }

        // Fall back to remote address
        req.remote_addr()
            .as_socket_addr()
            .map(|addr| addr.ip().to_string())
    }

    fn fail(&self, err: InternalError) -> ApiError {
        ApiError::from_internal_error(err, self.environment())
    }
}
