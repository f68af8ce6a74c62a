use uuid::Uuid;

use crate::errors::internal::AccessError;
use crate::errors::InternalError;
use crate::types::internal::auth::Claims;

/// Where a request entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    API,
    CLI,
    System,
}

/// Request context that flows through all layers
///
/// Carries the request id for log correlation and, once a bearer token has
/// been verified, the acting user's id and claims.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub request_id: String,
    pub source: RequestSource,
    pub actor_id: Option<i32>,
    pub claims: Option<Claims>,
}

impl RequestContext {
    /// Anonymous API request with a generated request_id
    pub fn new() -> Self {
        Self {
            ip_address: None,
            request_id: Uuid::new_v4().to_string(),
            source: RequestSource::API,
            actor_id: None,
            claims: None,
        }
    }

    /// Context for work done on behalf of a known user outside the HTTP layer
    pub fn for_actor(actor_id: i32, source: RequestSource) -> Self {
        Self {
            source,
            actor_id: Some(actor_id),
            ..Self::new()
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Attach verified claims; the subject becomes the acting user
    pub fn with_claims(mut self, claims: Claims) -> Result<Self, InternalError> {
        self.actor_id = Some(claims.user_id()?);
        self.claims = Some(claims);
        Ok(self)
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor_id.is_some()
    }

    /// Id of the acting user, or `Unauthenticated`
    pub fn actor_id(&self) -> Result<i32, InternalError> {
        self.actor_id
            .ok_or_else(|| InternalError::from(AccessError::Unauthenticated))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::auth::TokenKind;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            username: "alice".to_string(),
            email: "alice@example.org".to_string(),
            kind: TokenKind::Access,
            iss: "rbac-backend".to_string(),
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn test_new_context_is_anonymous() {
        let ctx = RequestContext::new();

        assert!(!ctx.is_authenticated());
        assert!(matches!(
            ctx.actor_id(),
            Err(InternalError::Access(AccessError::Unauthenticated))
        ));
        assert!(!ctx.request_id.is_empty());
    }

    #[test]
    fn test_with_claims_sets_actor() {
        let ctx = RequestContext::new()
            .with_ip_address("10.0.0.1")
            .with_claims(claims("42"))
            .unwrap();

        assert_eq!(ctx.actor_id().unwrap(), 42);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        assert!(RequestContext::new().with_claims(claims("abc")).is_err());
    }

    #[test]
    fn test_each_context_gets_its_own_request_id() {
        assert_ne!(RequestContext::new().request_id, RequestContext::new().request_id);
    }
}
