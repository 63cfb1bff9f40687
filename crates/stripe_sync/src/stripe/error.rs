use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Permanent API error from the provider.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded. Carries the provider-suggested delay if present.
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    /// Authentication required or failed.
    #[error("authentication required")]
    AuthRequired,

    /// Resource not found (account, endpoint, object id).
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Webhook signature could not be verified.
    #[error("invalid webhook signature: {message}")]
    Signature { message: String },

    /// A response body did not parse as expected.
    #[error("unexpected response shape: {message}")]
    Deserialize { message: String },
}

impl StripeError {
    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[inline]
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }

    #[inline]
    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::Deserialize {
            message: message.into(),
        }
    }

    /// Whether a retry with backoff could plausibly succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The provider-suggested retry delay, when one was given.
    #[inline]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, StripeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(StripeError::RateLimited { retry_after: None }.is_retryable());
        assert!(StripeError::network("connection reset").is_retryable());
        assert!(StripeError::api(502, "bad gateway").is_retryable());
        assert!(!StripeError::api(400, "bad request").is_retryable());
        assert!(!StripeError::AuthRequired.is_retryable());
        assert!(!StripeError::not_found("we_123").is_retryable());
    }

    #[test]
    fn retry_after_only_surfaces_for_rate_limits() {
        let limited = StripeError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(StripeError::network("x").retry_after(), None);
    }
}
