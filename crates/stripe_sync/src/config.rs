//! Engine configuration.
//!
//! All knobs the sync engine recognizes live here, validated once at
//! construction. Invalid configuration is fatal at init; nothing else in the
//! crate re-checks these values.

use std::time::Duration;

use thiserror::Error;

/// Default database namespace. Empty string means "no schema prefix".
pub const DEFAULT_SCHEMA: &str = "stripe";

/// Default page size for paginated list calls.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Default number of object kinds advanced concurrently per run.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default connection pool size.
pub const DEFAULT_POOL_MAX: u32 = 10;

/// Default deadline for a single provider network call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default drain window for in-flight operations on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(10_000);

/// Errors raised while validating configuration. Fatal at init.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stripe secret key is required")]
    MissingSecretKey,

    #[error("database url is required")]
    MissingDatabaseUrl,

    #[error("invalid schema name: {0:?}")]
    InvalidSchema(String),

    #[error("page limit must be between 1 and 100, got {0}")]
    InvalidPageLimit(u64),

    #[error("max_concurrent must be at least 1")]
    InvalidMaxConcurrent,

    #[error("webhook secret is required for webhook processing")]
    MissingWebhookSecret,

    #[error("engine builder is missing its {0}")]
    MissingComponent(&'static str),
}

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
///
/// Built with [`SyncConfig::new`] plus the chained setters, then validated
/// by the engine builder.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Stripe secret key (`sk_...` / `rk_...`).
    pub secret_key: String,
    /// Pinned Stripe API version; `None` uses the key's default version.
    pub api_version: Option<String>,
    /// Signing secret (`whsec_...`) used to verify incoming webhooks.
    pub webhook_secret: Option<String>,
    /// Database namespace holding all mirror state.
    pub schema: String,
    /// Database connection string. Ignored when an existing connection is
    /// handed to the engine builder.
    pub database_url: String,
    /// Connection pool size.
    pub pool_max: u32,
    /// Expand single-hop sub-objects (subscription items, default payment
    /// method stubs) while projecting.
    pub auto_expand_lists: bool,
    /// During backfill, also enqueue referenced kinds that have never been
    /// synced for this account.
    pub backfill_related_entities: bool,
    /// Page size for paginated list calls.
    pub page_limit: u64,
    /// Upper bound on object kinds advanced concurrently per run.
    pub max_concurrent: usize,
    /// Deadline for a single provider network call.
    pub request_timeout: Duration,
    /// Drain window for in-flight operations on shutdown.
    pub shutdown_grace: Duration,
}

impl SyncConfig {
    pub fn new(secret_key: impl Into<String>, database_url: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_version: None,
            webhook_secret: None,
            schema: DEFAULT_SCHEMA.to_string(),
            database_url: database_url.into(),
            pool_max: DEFAULT_POOL_MAX,
            auto_expand_lists: false,
            backfill_related_entities: true,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Set the database namespace. An empty string disables schema scoping.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub fn pool_max(mut self, max: u32) -> Self {
        self.pool_max = max;
        self
    }

    #[must_use]
    pub fn auto_expand_lists(mut self, enabled: bool) -> Self {
        self.auto_expand_lists = enabled;
        self
    }

    #[must_use]
    pub fn backfill_related_entities(mut self, enabled: bool) -> Self {
        self.backfill_related_entities = enabled;
        self
    }

    #[must_use]
    pub fn page_limit(mut self, limit: u64) -> Self {
        self.page_limit = limit;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check every invariant the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        if !is_valid_schema(&self.schema) {
            return Err(ConfigError::InvalidSchema(self.schema.clone()));
        }
        if self.page_limit == 0 || self.page_limit > 100 {
            return Err(ConfigError::InvalidPageLimit(self.page_limit));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent);
        }
        Ok(())
    }
}

/// Schema names are interpolated into DDL, so restrict them to safe
/// identifiers. Empty is allowed and means "no schema".
fn is_valid_schema(schema: &str) -> bool {
    schema.is_empty()
        || (schema.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && schema
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig::new("sk_test_123", "sqlite::memory:")
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = config();
        assert_eq!(c.schema, "stripe");
        assert_eq!(c.pool_max, 10);
        assert_eq!(c.page_limit, 100);
        assert_eq!(c.max_concurrent, 4);
        assert!(!c.auto_expand_lists);
        assert!(c.backfill_related_entities);
        assert_eq!(c.request_timeout, Duration::from_secs(30));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_secret_key_is_rejected() {
        let c = SyncConfig::new("  ", "sqlite::memory:");
        assert!(matches!(c.validate(), Err(ConfigError::MissingSecretKey)));
    }

    #[test]
    fn schema_names_are_restricted() {
        assert!(config().schema("").validate().is_ok());
        assert!(config().schema("stripe_v2").validate().is_ok());
        assert!(config().schema("_private").validate().is_ok());
        for bad in ["Stripe", "1stripe", "str ipe", "s;drop"] {
            assert!(
                matches!(config().schema(bad).validate(), Err(ConfigError::InvalidSchema(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn page_limit_bounds_are_enforced() {
        assert!(config().page_limit(1).validate().is_ok());
        assert!(matches!(
            config().page_limit(0).validate(),
            Err(ConfigError::InvalidPageLimit(0))
        ));
        assert!(matches!(
            config().page_limit(101).validate(),
            Err(ConfigError::InvalidPageLimit(101))
        ));
    }

    #[test]
    fn max_concurrent_must_be_positive() {
        assert!(matches!(
            config().max_concurrent(0).validate(),
            Err(ConfigError::InvalidMaxConcurrent)
        ));
    }
}
