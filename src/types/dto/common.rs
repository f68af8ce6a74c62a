use chrono::{DateTime, Utc};
use poem_openapi::Object;
use poem_openapi::types::{ParseFromJSON, ToJSON};

use crate::types::internal::query::Page;

/// Render a unix timestamp (seconds) as RFC 3339
pub fn rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Response model for health check endpoint
#[derive(Object, Debug)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,

    /// Timestamp of the health check (ISO 8601 format)
    pub timestamp: String,
}

/// Error body shared by every non-2xx response
#[derive(Object, Debug, Clone)]
#[oai(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Always "error"
    pub status: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,

    /// Time the error was produced (ISO 8601 format)
    pub timestamp: String,

    /// Field-level violations, only present on 422
    #[oai(skip_serializing_if_is_none)]
    pub errors: Option<Vec<FieldErrorDto>>,
}

#[derive(Object, Debug, Clone)]
pub struct FieldErrorDto {
    pub field: String,
    pub message: String,
}

/// Success body: `{status:"success", message, statusCode, data, timestamp}`
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct Envelope<T: ParseFromJSON + ToJSON> {
    pub status: String,
    pub message: String,
    pub status_code: u16,
    #[oai(skip_serializing_if_is_none)]
    pub data: Option<T>,
    pub timestamp: String,
}

impl<T: ParseFromJSON + ToJSON> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, 200, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(message, 201, Some(data))
    }

    fn with_status(message: impl Into<String>, status_code: u16, data: Option<T>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            status_code,
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Envelope for operations that answer with a message only
pub type MessageEnvelope = Envelope<serde_json::Value>;

impl MessageEnvelope {
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(message, 200, None)
    }
}

#[derive(Object, Debug, Clone, PartialEq, Eq)]
#[oai(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Success body for list endpoints, with a `pagination` block
#[derive(Object, Debug)]
#[oai(rename_all = "camelCase")]
pub struct PaginatedEnvelope<T: ParseFromJSON + ToJSON> {
    pub status: String,
    pub message: String,
    pub status_code: u16,
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub timestamp: String,
}

impl<T: ParseFromJSON + ToJSON> PaginatedEnvelope<T> {
    pub fn from_page(message: impl Into<String>, page: Page<T>) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            status: "success".to_string(),
            message: message.into(),
            status_code: 200,
            data: page.items,
            pagination,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::query::PageRequest;

    #[test]
    fn test_paginated_envelope_carries_total_pages() {
        let page = Page::new(vec![1i32, 2, 3], 23, PageRequest::new(Some(2), Some(10)));
        let envelope = PaginatedEnvelope::from_page("Users retrieved", page);

        assert_eq!(envelope.status, "success");
        assert_eq!(
            envelope.pagination,
            Pagination { page: 2, limit: 10, total: 23, total_pages: 3 }
        );
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = Envelope::ok("done", 7i32);
        let json = envelope.to_json().unwrap_or_default();

        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["data"], 7);

        let message_only = MessageEnvelope::message("bye").to_json().unwrap_or_default();
        assert!(message_only.get("data").is_none());
    }

    #[test]
    fn test_rfc3339_renders_epoch() {
        assert_eq!(rfc3339(0), "1970-01-01T00:00:00+00:00");
    }
}
