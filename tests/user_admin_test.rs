// Integration tests for user administration workflows

mod common;

use common::*;
use rbac_backend::coordinators::UserCoordinator;
use rbac_backend::errors::InternalError;
use rbac_backend::errors::internal::{AccessError, PasswordValidationError, RequestError};
use rbac_backend::types::dto::user::CreateUserRequest;
use rbac_backend::types::internal::user_update::{UserField, UserUpdate};

fn john_doe() -> CreateUserRequest {
    CreateUserRequest {
        username: "john_doe".to_string(),
        email: "john@example.com".to_string(),
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        display_name: None,
        phone: None,
        role_ids: vec![ADMIN_ROLE_ID],
        send_password_email: false,
    }
}

#[tokio::test]
async fn test_create_user_links_creator_and_roles() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let users = UserCoordinator::new(app.clone());

    let created = users.create(&as_user(root.id), john_doe()).await.unwrap();

    assert_eq!(created.user.username, "john_doe");
    assert_eq!(created.user.created_by, Some(root.id));
    assert_eq!(created.role_names(), vec!["admin".to_string()]);
    assert!(created.user.is_active);

    let err = users.create(&as_user(root.id), john_doe()).await.unwrap_err();
    assert!(matches!(err, InternalError::Request(RequestError::UsernameTaken)));
}

#[tokio::test]
async fn test_weak_reset_password_names_the_failing_rule() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let target = create_user(&app, "dave", &[USER_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());

    let err = users
        .reset_password(&as_user(root.id), target.id, "weakpass1!")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InternalError::Request(RequestError::WeakPassword(PasswordValidationError::MissingUppercase))
    ));
    assert_eq!(err.to_string(), "Password must contain at least one uppercase letter");

    let err = users
        .reset_password(&as_user(root.id), target.id, "weak")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Password must be at least 8 characters long");

    let unchanged = reload(&app, target.id).await;
    assert_eq!(unchanged.password_hash, target.password_hash);
}

#[tokio::test]
async fn test_self_deletion_is_refused() {
    let app = setup_app().await;
    let deleter_role = app
        .role_store
        .insert(&app.db, "user-deleter".to_string(), None, false)
        .await
        .unwrap();
    // user.read, user.delete
    app.role_store
        .replace_permissions(&app.db, deleter_role.id, &[1, 3])
        .await
        .unwrap();
    let deleter = create_user(&app, "eve", &[deleter_role.id]).await;
    let victim = create_user(&app, "frank", &[USER_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());

    let err = users.delete(&as_user(deleter.id), deleter.id).await.unwrap_err();
    assert!(matches!(err, InternalError::Access(AccessError::SelfDeletion)));
    assert_eq!(reload(&app, deleter.id).await.id, deleter.id);

    users.delete(&as_user(deleter.id), victim.id).await.unwrap();
    assert!(app.user_store.find_by_id(&app.db, victim.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_superadmin_is_immune_to_other_admins() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let admin = create_user(&app, "gina", &[ADMIN_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());

    let update = UserUpdate::new().set(UserField::IsActive(false));
    let err = users.update(&as_user(admin.id), root.id, update).await.unwrap_err();
    assert!(matches!(err, InternalError::Access(AccessError::SuperadminModification)));
    assert!(reload(&app, root.id).await.is_active);

    let err = users.delete(&as_user(root.id), root.id).await.unwrap_err();
    assert!(matches!(err, InternalError::Access(AccessError::SuperadminDeletion)));
}

#[tokio::test]
async fn test_reads_after_update_see_the_new_state() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let target = create_user(&app, "hank", &[USER_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());
    let ctx = as_user(root.id);

    let before = users.get(&ctx, target.id).await.unwrap();
    assert_eq!(before.role_names(), vec!["user".to_string()]);
    assert!(app.cache.get_user(target.id).is_some());

    let update = UserUpdate::new()
        .set(UserField::DisplayName(Some("Hank H.".to_string())))
        .with_roles(vec![ADMIN_ROLE_ID]);
    users.update(&ctx, target.id, update).await.unwrap();

    let after = users.get(&ctx, target.id).await.unwrap();
    assert_eq!(after.user.display_name.as_deref(), Some("Hank H."));
    assert_eq!(after.role_names(), vec!["admin".to_string()]);
    assert!(after.effective_permissions().contains("user.write"));
    assert_eq!(after.user.updated_by, Some(root.id));
}

#[tokio::test]
async fn test_concurrent_updates_both_commit() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let admin = create_user(&app, "ivy", &[ADMIN_ROLE_ID]).await;
    let target = create_user(&app, "jack", &[USER_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());

    let by_root = as_user(root.id);
    let by_admin = as_user(admin.id);
    let first = users.update(
        &by_root,
        target.id,
        UserUpdate::new().set(UserField::FirstName(Some("Jack".to_string()))),
    );
    let second = users.update(
        &by_admin,
        target.id,
        UserUpdate::new().set(UserField::Phone(Some("+1 555 0100".to_string()))),
    );
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let stored = reload(&app, target.id).await;
    assert_eq!(stored.first_name.as_deref(), Some("Jack"));
    assert_eq!(stored.phone.as_deref(), Some("+1 555 0100"));
    assert!(stored.updated_by == Some(root.id) || stored.updated_by == Some(admin.id));
}

#[tokio::test]
async fn test_bulk_update_reports_per_item_failures() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let a = create_user(&app, "kate", &[USER_ROLE_ID]).await;
    let b = create_user(&app, "liam", &[USER_ROLE_ID]).await;
    let users = UserCoordinator::new(app.clone());

    let outcome = users
        .bulk_update(
            &as_user(root.id),
            &[a.id, 9999, b.id],
            UserUpdate::new().set(UserField::IsVerified(false)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.success, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors[0].id, 9999);
    assert!(!reload(&app, a.id).await.is_verified);
    assert!(!reload(&app, b.id).await.is_verified);
}
