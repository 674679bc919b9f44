//! Error types for Conduit.
//!
//! This module provides [`ResourceError`], the single error type that flows
//! through routers, version selectors, filters and handlers.
//!
//! Errors are categorised rather than stringly typed. The dispatch core only
//! ever raises two categories itself:
//!
//! | Category | Raised when |
//! |---|---|
//! | `BadRequest` | a template, version string or binding is malformed at configuration time |
//! | `NotFound` | no route matches a path, or no compatible version exists |
//!
//! Every other category is produced by downstream handlers or filters and is
//! passed back to the caller unchanged.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ResourceError`].
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request or configuration.
    BadRequest,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// No route, version or resource matched.
    NotFound,
    /// The handler does not implement the requested operation.
    NotSupported,
    /// Concurrent modification or duplicate resource.
    Conflict,
    /// The supplied revision does not match the current one.
    PreconditionFailed,
    /// A required backend is unavailable.
    Unavailable,
    /// Unexpected failure inside a handler.
    Internal,
}

impl ErrorCategory {
    /// Returns the snake_case label of this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::NotSupported => "not_supported",
            Self::Conflict => "conflict",
            Self::PreconditionFailed => "precondition_failed",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }

    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotSupported => StatusCode::NOT_IMPLEMENTED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Conduit.
///
/// # Example
///
/// ```
/// use conduit_core::{ErrorCategory, ResourceError};
///
/// fn check_template(template: &str) -> Result<(), ResourceError> {
///     if template.contains("{}") {
///         return Err(ResourceError::bad_request("empty template variable"));
///     }
///     Ok(())
/// }
///
/// let err = check_template("users/{}").unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::BadRequest);
/// ```
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Malformed request or configuration.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Permission denied.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// Route, version or resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The resource path that could not be resolved.
        resource_path: Option<String>,
    },

    /// Operation not supported by the handler.
    #[error("Not supported: {message}")]
    NotSupported {
        /// Human-readable error message.
        message: String,
    },

    /// Conflict error (e.g., concurrent modification).
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// Revision mismatch.
    #[error("Precondition failed: {message}")]
    PreconditionFailed {
        /// Human-readable error message.
        message: String,
    },

    /// Backend unavailable.
    #[error("Service unavailable: {message}")]
    Unavailable {
        /// Human-readable error message.
        message: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ResourceError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_path: None,
        }
    }

    /// Creates a not found error for a resource path.
    #[must_use]
    pub fn not_found_path(resource_path: impl Into<String>) -> Self {
        let resource_path = resource_path.into();
        Self::NotFound {
            message: format!("Resource '{resource_path}' not found"),
            resource_path: Some(resource_path),
        }
    }

    /// Creates a not supported error.
    #[must_use]
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a precondition failed error.
    #[must_use]
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Creates a service unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::Forbidden { .. } => ErrorCategory::Forbidden,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::NotSupported { .. } => ErrorCategory::NotSupported,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::PreconditionFailed { .. } => ErrorCategory::PreconditionFailed,
            Self::Unavailable { .. } => ErrorCategory::Unavailable,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a `BadRequest` error.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest { .. })
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.status_code().as_u16(),
            reason: self
                .status_code()
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.to_string(),
            category: self.category(),
            detail: self.detail(),
        }
    }

    fn detail(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound {
                resource_path: Some(path),
                ..
            } => Some(serde_json::json!({ "resource_path": path })),
            _ => None,
        }
    }
}

/// Serializable error envelope for protocol adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Numeric error code (matches the HTTP status).
    pub code: u16,
    /// Short reason phrase.
    pub reason: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_error() {
        let error = ResourceError::bad_request("template contains unclosed variable");
        assert_eq!(error.category(), ErrorCategory::BadRequest);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(error.is_bad_request());
        assert!(error.to_string().contains("unclosed variable"));
    }

    #[test]
    fn test_not_found_path() {
        let error = ResourceError::not_found_path("users/42");
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.is_not_found());
        assert!(error.to_string().contains("users/42"));
    }

    #[test]
    fn test_internal_with_source() {
        let error = ResourceError::internal_with_source(
            "backend failed",
            std::io::Error::new(std::io::ErrorKind::Other, "disk"),
        );
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_envelope_serialization() {
        let error = ResourceError::not_found_path("users/42");
        let envelope = error.to_envelope();

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":404"));
        assert!(json.contains("\"reason\":\"Not Found\""));
        assert!(json.contains("\"category\":\"not_found\""));
        assert!(json.contains("\"resource_path\":\"users/42\""));
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::BadRequest,
            ErrorCategory::Forbidden,
            ErrorCategory::NotFound,
            ErrorCategory::NotSupported,
            ErrorCategory::Conflict,
            ErrorCategory::PreconditionFailed,
            ErrorCategory::Unavailable,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }
}
