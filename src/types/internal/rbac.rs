use std::fmt;
use std::str::FromStr;

use poem_openapi::Enum;

use crate::errors::InternalError;

/// The one role that satisfies every role and permission check
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// Username of the bootstrap account; it cannot be deleted and only a
/// superadmin may modify it
pub const SUPERADMIN_USERNAME: &str = "superadmin";

/// Functional area a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[oai(rename_all = "UPPERCASE")]
pub enum PermissionModule {
    User,
    Role,
    Permission,
    Tour,
    Auth,
    System,
}

/// Operation a permission grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[oai(rename_all = "UPPERCASE")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl PermissionModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Role => "ROLE",
            Self::Permission => "PERMISSION",
            Self::Tour => "TOUR",
            Self::Auth => "AUTH",
            Self::System => "SYSTEM",
        }
    }
}

impl PermissionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Manage => "MANAGE",
        }
    }
}

impl FromStr for PermissionModule {
    type Err = InternalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ROLE" => Ok(Self::Role),
            "PERMISSION" => Ok(Self::Permission),
            "TOUR" => Ok(Self::Tour),
            "AUTH" => Ok(Self::Auth),
            "SYSTEM" => Ok(Self::System),
            other => Err(InternalError::parse("PermissionModule", other)),
        }
    }
}

impl FromStr for PermissionAction {
    type Err = InternalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "READ" => Ok(Self::Read),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "MANAGE" => Ok(Self::Manage),
            other => Err(InternalError::parse("PermissionAction", other)),
        }
    }
}

impl fmt::Display for PermissionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_parsing_is_case_insensitive() {
        assert_eq!("user".parse::<PermissionModule>().unwrap(), PermissionModule::User);
        assert_eq!("SYSTEM".parse::<PermissionModule>().unwrap(), PermissionModule::System);
        assert!("billing".parse::<PermissionModule>().is_err());
    }

    #[test]
    fn test_action_round_trips_through_storage_name() {
        for action in [
            PermissionAction::Create,
            PermissionAction::Read,
            PermissionAction::Update,
            PermissionAction::Delete,
            PermissionAction::Manage,
        ] {
            assert_eq!(action.as_str().parse::<PermissionAction>().unwrap(), action);
        }
    }
}
