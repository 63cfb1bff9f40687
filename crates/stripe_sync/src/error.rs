//! Engine-level error taxonomy.
//!
//! Transient provider failures are retried inside the client and only reach
//! this type once retries are exhausted. Everything here is a terminal
//! outcome for the operation that raised it.

use sea_orm::DbErr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::entity::object_kind::ObjectKind;
use crate::stripe::StripeError;

/// Errors surfaced by the public engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration. Fatal at init.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A migration failed; the ledger is unchanged for that migration.
    #[error("migration failed: {0}")]
    Migration(String),

    /// The provider rejected the credential. Fatal.
    #[error("provider rejected the credential")]
    Auth,

    /// Webhook signature verification failed. Callers answer 400.
    #[error("webhook signature verification failed: {0}")]
    Signature(String),

    /// A provider call failed after exhausting retries.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The provider returned a permanent API error.
    #[error("provider error: {0}")]
    Provider(String),

    /// A projector could not make sense of a payload.
    #[error("projection failed for {kind} {id}: {message}")]
    Projection {
        kind: ObjectKind,
        id: String,
        message: String,
    },

    /// A second `process_until_done` while another run is open.
    /// Reported, not retried.
    #[error("a sync run is already open for account {account_id}")]
    ConcurrentRun { account_id: String },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl SyncError {
    pub(crate) fn projection(
        kind: ObjectKind,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Projection {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }
}

impl From<StripeError> for SyncError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::AuthRequired => SyncError::Auth,
            StripeError::Signature { message } => SyncError::Signature(message),
            StripeError::RateLimited { .. } | StripeError::Network { .. } => {
                SyncError::Transient(err.to_string())
            }
            StripeError::Api { status, .. } if status >= 500 => {
                SyncError::Transient(err.to_string())
            }
            other => SyncError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_errors_map_into_the_taxonomy() {
        assert!(matches!(
            SyncError::from(StripeError::AuthRequired),
            SyncError::Auth
        ));
        assert!(matches!(
            SyncError::from(StripeError::RateLimited { retry_after: None }),
            SyncError::Transient(_)
        ));
        assert!(matches!(
            SyncError::from(StripeError::api(503, "upstream down")),
            SyncError::Transient(_)
        ));
        assert!(matches!(
            SyncError::from(StripeError::api(400, "bad request")),
            SyncError::Provider(_)
        ));
        assert!(matches!(
            SyncError::from(StripeError::signature("no v1 signature")),
            SyncError::Signature(_)
        ));
    }
}
