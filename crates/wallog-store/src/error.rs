//! Store error types with transient/permanent classification.

use thiserror::Error;

/// Error raised while talking to the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    // Transport errors (usually transient)
    /// Failed to reach the remote endpoint.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote store answered with a server-side failure.
    #[error("remote store unavailable: {status} {message}")]
    Unavailable { status: u16, message: String },

    // Caller/permanent errors
    /// The request was rejected (4xx other than 401/404).
    #[error("request rejected: {status} {message}")]
    Rejected { status: u16, message: String },

    /// Credentials were missing, expired or refused.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A fetch-by-id found nothing.
    #[error("record not found: {collection}({id})")]
    NotFound { collection: String, id: String },

    /// The client was constructed with an unusable configuration.
    #[error("invalid store configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A response body could not be decoded.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed { .. } | StoreError::Unavailable { .. }
        )
    }

    /// Stable code for logs and error summaries.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            StoreError::Unavailable { .. } => "REMOTE_UNAVAILABLE",
            StoreError::Rejected { .. } => "REQUEST_REJECTED",
            StoreError::AuthenticationFailed { .. } => "AUTH_FAILED",
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            StoreError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
        }
    }

    // Convenience constructors

    /// A connection failure without an underlying source.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        StoreError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// A connection failure wrapping its underlying error.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unavailable(status: u16, message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            status,
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        StoreError::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        StoreError::AuthenticationFailed {
            message: message.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        StoreError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        StoreError::MalformedResponse {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
