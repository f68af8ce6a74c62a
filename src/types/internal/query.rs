use crate::types::internal::rbac::{PermissionAction, PermissionModule};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Clamped pagination input: `page >= 1`, `1 <= limit <= 100`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page index for sea-orm paginators
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.to_ascii_uppercase()) {
            Some(v) if v == "ASC" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Whitelisted user sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    #[default]
    CreatedAt,
    UpdatedAt,
    LastLoginAt,
}

impl UserSortField {
    /// Unknown names fall back to `CreatedAt`
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.unwrap_or_default() {
            "id" => Self::Id,
            "username" => Self::Username,
            "email" => Self::Email,
            "firstName" => Self::FirstName,
            "lastName" => Self::LastName,
            "updatedAt" => Self::UpdatedAt,
            "lastLoginAt" => Self::LastLoginAt,
            _ => Self::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_locked: Option<bool>,
    /// Substring over username, email and the name fields
    pub search: Option<String>,
    pub role_id: Option<i32>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
    pub sort_by: UserSortField,
    pub order: SortOrder,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct RoleQuery {
    pub name: Option<String>,
    pub is_system: Option<bool>,
    /// Only roles granting the permission with this exact name
    pub permission: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionQuery {
    pub module: Option<PermissionModule>,
    pub action: Option<PermissionAction>,
    pub page: PageRequest,
}
