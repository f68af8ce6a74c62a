use crate::errors::InternalError;
use crate::errors::internal::AccessError;
use crate::types::internal::snapshot::UserSnapshot;

/// How a list of required permissions is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// At least one listed permission
    Any,
    /// Every listed permission
    All,
}

/// Role and permission gates over a user snapshot
///
/// Holding the `superadmin` role satisfies every check. No other bypass exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationEvaluator;

impl AuthorizationEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn has_permission(&self, user: &UserSnapshot, permission: &str) -> bool {
        user.is_superadmin() || user.effective_permissions().contains(permission)
    }

    /// Passes when the user holds any of `roles`
    pub fn assert_role(&self, user: Option<&UserSnapshot>, roles: &[&str]) -> Result<(), InternalError> {
        let user = user.ok_or(AccessError::Unauthenticated)?;
        if user.is_superadmin() || roles.is_empty() {
            return Ok(());
        }
        if roles.iter().any(|role| user.has_role(role)) {
            return Ok(());
        }

        tracing::warn!(
            user_id = user.id(),
            required = ?roles,
            "Role check failed"
        );
        Err(AccessError::InsufficientRole.into())
    }

    pub fn assert_permission(
        &self,
        user: Option<&UserSnapshot>,
        permissions: &[&str],
        mode: MatchMode,
    ) -> Result<(), InternalError> {
        let user = user.ok_or(AccessError::Unauthenticated)?;
        if user.is_superadmin() || permissions.is_empty() {
            return Ok(());
        }

        let granted = user.effective_permissions();
        let (allowed, denial) = match mode {
            MatchMode::Any => (
                permissions.iter().any(|p| granted.contains(*p)),
                AccessError::InsufficientPermissions,
            ),
            MatchMode::All => (
                permissions.iter().all(|p| granted.contains(*p)),
                AccessError::MissingPermissions,
            ),
        };
        if allowed {
            return Ok(());
        }

        tracing::warn!(
            user_id = user.id(),
            required = ?permissions,
            mode = ?mode,
            "Permission check failed"
        );
        Err(denial.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::snapshot::fixtures::{grant, snapshot};

    fn admin() -> UserSnapshot {
        snapshot(2, vec![grant(2, "admin", &["user.read", "user.write", "role.read"])])
    }

    fn superadmin() -> UserSnapshot {
        snapshot(1, vec![grant(1, "superadmin", &[])])
    }

    #[test]
    fn test_superadmin_bypasses_everything() {
        let evaluator = AuthorizationEvaluator::new();
        let root = superadmin();

        assert!(evaluator.has_permission(&root, "anything.at.all"));
        assert!(evaluator.assert_role(Some(&root), &["auditor"]).is_ok());
        assert!(
            evaluator
                .assert_permission(Some(&root), &["x.y", "z.w"], MatchMode::All)
                .is_ok()
        );
    }

    #[test]
    fn test_any_and_all_modes() {
        let evaluator = AuthorizationEvaluator::new();
        let admin = admin();

        assert!(
            evaluator
                .assert_permission(Some(&admin), &["user.delete", "user.read"], MatchMode::Any)
                .is_ok()
        );
        let err = evaluator
            .assert_permission(Some(&admin), &["user.delete", "user.read"], MatchMode::All)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required permissions");

        let err = evaluator
            .assert_permission(Some(&admin), &["user.delete"], MatchMode::Any)
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient permissions");
    }

    #[test]
    fn test_role_denial_is_distinct_from_permission_denial() {
        let evaluator = AuthorizationEvaluator::new();

        let err = evaluator.assert_role(Some(&admin()), &["superadmin"]).unwrap_err();

        assert!(matches!(err, InternalError::Access(AccessError::InsufficientRole)));
    }

    #[test]
    fn test_missing_user_is_unauthenticated() {
        let evaluator = AuthorizationEvaluator::new();

        let err = evaluator
            .assert_permission(None, &["user.read"], MatchMode::Any)
            .unwrap_err();

        assert!(matches!(err, InternalError::Access(AccessError::Unauthenticated)));
    }
}
