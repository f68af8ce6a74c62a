// Integration tests for login, lockout and token handling

mod common;

use common::*;
use rbac_backend::config::AppSettings;
use rbac_backend::coordinators::{AuthCoordinator, UserCoordinator};
use rbac_backend::errors::internal::CredentialError;
use rbac_backend::errors::{ApiError, InternalError};
use rbac_backend::types::internal::auth::TokenKind;
use rbac_backend::types::internal::context::RequestContext;

#[tokio::test]
async fn test_superadmin_login_returns_tokens_roles_and_permissions() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let auth = AuthCoordinator::new(app.clone());

    let session = auth
        .login(&RequestContext::new(), "superadmin", SUPERADMIN_PASSWORD)
        .await
        .unwrap();

    assert_eq!(session.user.role_names(), vec!["superadmin".to_string()]);
    assert!(!session.user.effective_permissions().is_empty());
    assert_eq!(session.user.user.login_attempts, 0);
    assert!(session.user.user.last_login_at.is_some());

    let claims = app
        .token_provider
        .verify(&session.tokens.access_token, Some(TokenKind::Access))
        .unwrap();
    assert_eq!(claims.user_id().unwrap(), root.id);
    assert!(
        app.token_provider
            .verify(&session.tokens.refresh_token, Some(TokenKind::Refresh))
            .is_ok()
    );
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
    let app = setup_app().await;
    create_user(&app, "alice", &[USER_ROLE_ID]).await;
    let auth = AuthCoordinator::new(app.clone());

    let unknown = auth
        .login(&RequestContext::new(), "nobody", USER_PASSWORD)
        .await
        .unwrap_err();
    let wrong = auth
        .login(&RequestContext::new(), "alice", "Wrong123!")
        .await
        .unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    let unknown = ApiError::from_internal_error(unknown, app.settings.environment);
    let wrong = ApiError::from_internal_error(wrong, app.settings.environment);
    assert_eq!(unknown.status_code(), 401);
    assert_eq!(unknown.status_code(), wrong.status_code());
    assert_eq!(unknown.message(), wrong.message());
}

#[tokio::test]
async fn test_lockout_is_idempotent_until_unlocked() {
    let app = setup_app_with(AppSettings {
        max_login_attempts: 3,
        ..AppSettings::default()
    })
    .await;
    let root = seed_superadmin(&app).await;
    let user = create_user(&app, "bob", &[USER_ROLE_ID]).await;
    let auth = AuthCoordinator::new(app.clone());

    for _ in 0..3 {
        let err = auth
            .login(&RequestContext::new(), "bob", "Wrong123!")
            .await
            .unwrap_err();
        assert!(matches!(err, InternalError::Credential(CredentialError::InvalidCredentials)));
    }
    let locked = reload(&app, user.id).await;
    assert!(locked.is_locked);
    assert_eq!(locked.login_attempts, 3);

    for password in ["Wrong123!", USER_PASSWORD, "Wrong123!"] {
        let err = auth
            .login(&RequestContext::new(), "bob", password)
            .await
            .unwrap_err();
        assert!(matches!(err, InternalError::Credential(CredentialError::AccountLocked)));
    }
    let still_locked = reload(&app, user.id).await;
    assert!(still_locked.is_locked);
    assert_eq!(still_locked.login_attempts, 3);

    UserCoordinator::new(app.clone())
        .unlock(&as_user(root.id), user.id)
        .await
        .unwrap();
    let unlocked = reload(&app, user.id).await;
    assert!(!unlocked.is_locked);
    assert_eq!(unlocked.login_attempts, 0);

    assert!(auth.login(&RequestContext::new(), "bob", USER_PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_refresh_rejects_access_tokens() {
    let app = setup_app().await;
    create_user(&app, "carol", &[USER_ROLE_ID]).await;
    let auth = AuthCoordinator::new(app.clone());

    let session = auth
        .login(&RequestContext::new(), "carol", USER_PASSWORD)
        .await
        .unwrap();

    let refreshed = auth
        .refresh(&RequestContext::new(), &session.tokens.refresh_token)
        .await
        .unwrap();
    assert!(!refreshed.access_token.is_empty());

    let err = auth
        .refresh(&RequestContext::new(), &session.tokens.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, InternalError::Token(_)));
}
