use poem::Request;

use crate::errors::{ApiError, InternalError};
use crate::providers::TokenProvider;
use crate::types::internal::auth::TokenKind;
use crate::types::internal::context::RequestContext;

use super::{Api, BearerAuth};

/// Context for an unauthenticated endpoint (login, refresh)
pub fn anonymous_context<A: Api + ?Sized>(api: &A, req: &Request) -> RequestContext {
    let ctx = RequestContext::new();
    match api.extract_ip_address(req) {
        Some(ip) => ctx.with_ip_address(ip),
        None => ctx,
    }
}

/// Verify the bearer token as an access token and build the caller's context
///
/// Refresh and reset tokens are rejected here even when their signature is valid.
pub fn create_request_context<A: Api + ?Sized>(
    api: &A,
    req: &Request,
    auth: &BearerAuth,
    token_provider: &TokenProvider,
) -> Result<RequestContext, InternalError> {
    let claims = token_provider.verify(&auth.0.token, Some(TokenKind::Access))?;
    let ctx = anonymous_context(api, req).with_claims(claims)?;
    tracing::debug!(request_id = %ctx.request_id, "Authenticated request for user {:?}", ctx.actor_id);
    Ok(ctx)
}

/// `create_request_context` with the failure already mapped to a response
pub fn authenticate<A: Api + ?Sized>(
    api: &A,
    req: &Request,
    auth: &BearerAuth,
    token_provider: &TokenProvider,
) -> Result<RequestContext, ApiError> {
    create_request_context(api, req, auth, token_provider).map_err(|e| api.fail(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeEnvironment;
    use crate::test::utils::setup_test_app;
    use crate::types::internal::auth::TokenIdentity;
    use poem_openapi::auth::Bearer;

    struct ProbeApi;

    impl Api for ProbeApi {
        fn environment(&self) -> RuntimeEnvironment {
            RuntimeEnvironment::Test
        }
    }

    fn identity() -> TokenIdentity {
        TokenIdentity {
            user_id: 7,
            username: "alice".to_string(),
            email: "alice@example.org".to_string(),
        }
    }

    fn bearer(token: String) -> BearerAuth {
        BearerAuth(Bearer { token })
    }

    #[test]
    fn test_forwarded_for_wins() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .header("X-Real-IP", "10.0.0.2")
            .finish();
        assert_eq!(ProbeApi.extract_ip_address(&req).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = Request::builder().header("X-Real-IP", "10.0.0.2").finish();
        assert_eq!(ProbeApi.extract_ip_address(&req).as_deref(), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn test_access_token_builds_authenticated_context() {
        let app = setup_test_app().await;
        let token = app.token_provider.issue(&identity(), TokenKind::Access).unwrap();
        let req = Request::builder().finish();

        let ctx = create_request_context(&ProbeApi, &req, &bearer(token), &app.token_provider).unwrap();
        assert_eq!(ctx.actor_id().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_credential() {
        let app = setup_test_app().await;
        let token = app.token_provider.issue(&identity(), TokenKind::Refresh).unwrap();
        let req = Request::builder().finish();

        let result = create_request_context(&ProbeApi, &req, &bearer(token), &app.token_provider);
        assert!(matches!(result, Err(InternalError::Token(_))));
    }
}
