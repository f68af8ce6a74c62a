// Integration tests for role management guards

mod common;

use common::*;
use rbac_backend::coordinators::{RoleCoordinator, UserCoordinator};
use rbac_backend::errors::InternalError;
use rbac_backend::errors::internal::{AccessError, RequestError};
use rbac_backend::types::dto::role::CreateRoleRequest;
use rbac_backend::types::dto::user::CreateUserRequest;
use rbac_backend::types::internal::user_update::UserUpdate;

#[tokio::test]
async fn test_role_with_members_cannot_be_deleted() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let roles = RoleCoordinator::new(app.clone());
    let ctx = as_user(root.id);

    let guide = roles
        .create(
            &ctx,
            CreateRoleRequest {
                name: "guide".to_string(),
                description: Some("Tour guides".to_string()),
                is_system: false,
                permission_ids: vec![10],
            },
        )
        .await
        .unwrap();
    let member = create_user(&app, "mona", &[guide.role.id]).await;

    let err = roles.delete(&ctx, guide.role.id).await.unwrap_err();
    assert!(matches!(err, InternalError::Request(RequestError::RoleInUse)));

    app.user_store
        .replace_roles(&app.db, member.id, &[USER_ROLE_ID])
        .await
        .unwrap();
    roles.delete(&ctx, guide.role.id).await.unwrap();
    assert!(app.role_store.find_by_id(&app.db, guide.role.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_system_roles_are_deleted_only_by_superadmin() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let roles = RoleCoordinator::new(app.clone());

    let ops = roles
        .create(
            &as_user(root.id),
            CreateRoleRequest {
                name: "operations".to_string(),
                description: None,
                is_system: true,
                permission_ids: vec![1],
            },
        )
        .await
        .unwrap();

    let cleaner_role = app
        .role_store
        .insert(&app.db, "role-cleaner".to_string(), None, false)
        .await
        .unwrap();
    // role.read, role.delete
    app.role_store
        .replace_permissions(&app.db, cleaner_role.id, &[4, 6])
        .await
        .unwrap();
    let cleaner = create_user(&app, "oscar", &[cleaner_role.id]).await;

    let err = roles.delete(&as_user(cleaner.id), ops.role.id).await.unwrap_err();
    assert!(matches!(err, InternalError::Access(AccessError::SystemRoleDeletion)));

    roles.delete(&as_user(root.id), ops.role.id).await.unwrap();
}

#[tokio::test]
async fn test_admin_cannot_create_roles_without_role_write() {
    let app = setup_app().await;
    let admin = create_user(&app, "nina", &[ADMIN_ROLE_ID]).await;
    let roles = RoleCoordinator::new(app.clone());

    let err = roles
        .create(
            &as_user(admin.id),
            CreateRoleRequest {
                name: "auditor".to_string(),
                description: None,
                is_system: false,
                permission_ids: vec![1],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InternalError::Access(_)));
}

#[tokio::test]
async fn test_cached_role_member_count_follows_user_changes() {
    let app = setup_app().await;
    let root = seed_superadmin(&app).await;
    let roles = RoleCoordinator::new(app.clone());
    let users = UserCoordinator::new(app.clone());
    let ctx = as_user(root.id);

    let guide = roles
        .create(
            &ctx,
            CreateRoleRequest {
                name: "guide".to_string(),
                description: None,
                is_system: false,
                permission_ids: vec![10],
            },
        )
        .await
        .unwrap();
    let guide_id = guide.role.id;
    let walker = create_user(&app, "walker", &[USER_ROLE_ID]).await;

    // Warm both entries
    assert_eq!(roles.get(&ctx, guide_id).await.unwrap().user_count, 0);
    let user_count_before = roles.get(&ctx, USER_ROLE_ID).await.unwrap().user_count;

    users
        .update(&ctx, walker.id, UserUpdate::new().with_roles(vec![guide_id]))
        .await
        .unwrap();
    assert_eq!(roles.get(&ctx, guide_id).await.unwrap().user_count, 1);
    assert_eq!(
        roles.get(&ctx, USER_ROLE_ID).await.unwrap().user_count,
        user_count_before - 1
    );

    let hiker = users
        .create(
            &ctx,
            CreateUserRequest {
                username: "hiker".to_string(),
                email: "hiker@example.com".to_string(),
                first_name: "Hannah".to_string(),
                last_name: "Hike".to_string(),
                display_name: None,
                phone: None,
                role_ids: vec![guide_id],
                send_password_email: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(roles.get(&ctx, guide_id).await.unwrap().user_count, 2);

    users
        .bulk_update(&ctx, &[hiker.id()], UserUpdate::new().with_roles(vec![USER_ROLE_ID]))
        .await
        .unwrap();
    assert_eq!(roles.get(&ctx, guide_id).await.unwrap().user_count, 1);

    users.delete(&ctx, walker.id).await.unwrap();
    let refreshed = roles.get(&ctx, guide_id).await.unwrap();
    assert_eq!(refreshed.user_count, 0);
    assert_eq!(app.role_store.user_count(&app.db, guide_id).await.unwrap(), 0);
}
