//! Classified authentication flow errors
//!
//! Adapters raise typed failures; the transport boundary collapses everything
//! except method dispatch into one opaque client-facing error so internal
//! detail is logged but never returned.

use actix_web::http::StatusCode;
use thiserror::Error;

/// Errors raised while driving a sign-in flow
#[derive(Debug, Error)]
pub enum AuthError {
    /// The HTTP method has no handler for this provider
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The provider rejected the authorization code
    #[error("provider rejected authorization code: {0}")]
    InvalidGrant(String),

    /// The state token could not be decoded
    #[error("malformed state token: {0}")]
    MalformedState(String),

    /// The network round trip to the provider failed
    #[error("provider unreachable: {0}")]
    ProviderUnavailable(String),

    /// The provider replied with something the adapter cannot interpret
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),

    /// The adapter is missing required configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Transport status for this failure.
    ///
    /// Everything except method dispatch maps to 400: invalid codes and
    /// transport failures are deliberately indistinguishable to the caller.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Internal detail stays in the logs.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "Method not allowed",
            _ => "Invalid request",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_dispatch_maps_to_405() {
        let err = AuthError::MethodNotAllowed;
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.client_message(), "Method not allowed");
    }

    #[test]
    fn test_flow_failures_collapse_to_opaque_400() {
        let errors = [
            AuthError::InvalidGrant("invalid_grant".to_string()),
            AuthError::MalformedState("bad base64".to_string()),
            AuthError::ProviderUnavailable("connection refused".to_string()),
            AuthError::InvalidResponse("missing access_token".to_string()),
            AuthError::Configuration("missing client_id".to_string()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert_eq!(err.client_message(), "Invalid request");
        }
    }

    #[test]
    fn test_internal_detail_preserved_in_display() {
        let err = AuthError::InvalidGrant("invalid_grant".to_string());
        assert!(err.to_string().contains("invalid_grant"));
    }
}
