use sea_orm::ActiveValue::Set;

use crate::types::db::user;

/// One whitelisted user field change
///
/// Nullable profile fields take `None` to clear the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserField {
    FirstName(Option<String>),
    LastName(Option<String>),
    DisplayName(Option<String>),
    Phone(Option<String>),
    Email(String),
    IsActive(bool),
    IsVerified(bool),
}

impl UserField {
    /// Trim text values; emails are also lower-cased
    pub fn normalized(self) -> Self {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        match self {
            UserField::FirstName(v) => UserField::FirstName(trim(v)),
            UserField::LastName(v) => UserField::LastName(trim(v)),
            UserField::DisplayName(v) => UserField::DisplayName(trim(v)),
            UserField::Phone(v) => UserField::Phone(trim(v)),
            UserField::Email(v) => UserField::Email(v.trim().to_lowercase()),
            flag => flag,
        }
    }

    pub fn apply(&self, model: &mut user::ActiveModel) {
        match self {
            UserField::FirstName(v) => model.first_name = Set(v.clone()),
            UserField::LastName(v) => model.last_name = Set(v.clone()),
            UserField::DisplayName(v) => model.display_name = Set(v.clone()),
            UserField::Phone(v) => model.phone = Set(v.clone()),
            UserField::Email(v) => model.email = Set(v.clone()),
            UserField::IsActive(v) => model.is_active = Set(*v),
            UserField::IsVerified(v) => model.is_verified = Set(*v),
        }
    }
}

/// Partial user update: absent fields stay untouched
///
/// `role_ids`, when present, replaces the whole role set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub fields: Vec<UserField>,
    pub role_ids: Option<Vec<i32>>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: UserField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_roles(mut self, role_ids: Vec<i32>) -> Self {
        self.role_ids = Some(role_ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.role_ids.is_none()
    }

    pub fn new_email(&self) -> Option<&str> {
        self.fields.iter().rev().find_map(|field| match field {
            UserField::Email(email) => Some(email.as_str()),
            _ => None,
        })
    }

    /// Normalize and apply every field change to `model`
    pub fn apply_to(&self, model: &mut user::ActiveModel) {
        for field in &self.fields {
            field.clone().normalized().apply(model);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::snapshot::fixtures;
    use sea_orm::{ActiveValue, IntoActiveModel};

    #[test]
    fn test_only_present_fields_are_changed() {
        let mut model = fixtures::user(1, "alice").into_active_model();

        UserUpdate::new()
            .set(UserField::FirstName(Some("  Alice ".to_string())))
            .set(UserField::Phone(None))
            .apply_to(&mut model);

        assert_eq!(model.first_name, ActiveValue::Set(Some("Alice".to_string())));
        assert_eq!(model.phone, ActiveValue::Set(None));
        assert!(matches!(model.last_name, ActiveValue::Unchanged(_)));
        assert!(matches!(model.email, ActiveValue::Unchanged(_)));
    }

    #[test]
    fn test_email_is_lowercased_and_trimmed() {
        let mut model = fixtures::user(1, "alice").into_active_model();

        UserUpdate::new()
            .set(UserField::Email(" Alice@Example.ORG ".to_string()))
            .apply_to(&mut model);

        assert_eq!(model.email, ActiveValue::Set("alice@example.org".to_string()));
    }

    #[test]
    fn test_empty_string_applied_as_given() {
        let mut model = fixtures::user(1, "alice").into_active_model();

        UserUpdate::new()
            .set(UserField::DisplayName(Some(String::new())))
            .apply_to(&mut model);

        assert_eq!(model.display_name, ActiveValue::Set(Some(String::new())));
    }

    #[test]
    fn test_empty_update_detected() {
        assert!(UserUpdate::new().is_empty());
        assert!(!UserUpdate::new().with_roles(vec![1]).is_empty());
    }
}
