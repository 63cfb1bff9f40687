//! The sync engine: configuration, database, and provider client tied
//! together behind the public operations.

use sea_orm::DatabaseConnection;

use crate::account::AccountResolver;
use crate::config::{ConfigError, SyncConfig};
use crate::db;
use crate::delete::{self, DeleteOptions, DeleteReport};
use crate::endpoints;
use crate::entity::managed_webhook;
use crate::entity::object_kind::{BACKFILL_ORDER, ObjectKind};
use crate::error::SyncError;
use crate::stripe::StripeClient;
use crate::sync::{BackfillContext, BackfillParams, BackfillSummary, ProcessNext};
use crate::webhook;

/// One engine instance mirrors one provider account into one database.
///
/// Multiple engines (one per credential) may share a database; rows are
/// partitioned by account id throughout. The engine is cheap to clone-free
/// share behind an `Arc` and every operation takes `&self`.
///
/// # Example
///
/// ```ignore
/// use stripe_sync::{SyncConfig, SyncEngine};
///
/// let config = SyncConfig::new(secret_key, database_url)
///     .webhook_secret(webhook_secret)
///     .auto_expand_lists(true);
/// let engine = SyncEngine::connect(config).await?;
///
/// engine.process_until_done(Default::default()).await?;
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    db: DatabaseConnection,
    client: StripeClient,
    resolver: AccountResolver,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

/// Builder for wiring an engine from preexisting parts (an already-open
/// pool, a client over a custom transport).
#[derive(Default)]
pub struct SyncEngineBuilder {
    config: Option<SyncConfig>,
    db: Option<DatabaseConnection>,
    client: Option<StripeClient>,
}

impl SyncEngineBuilder {
    #[must_use]
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing database connection instead of opening one from the
    /// config's `database_url`. The caller is responsible for having run
    /// migrations (see [`db::connect_and_migrate`]).
    #[must_use]
    pub fn database(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }

    #[must_use]
    pub fn client(mut self, client: StripeClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<SyncEngine, SyncError> {
        let config = self
            .config
            .ok_or(ConfigError::MissingComponent("config"))?;
        config.validate()?;
        let db = self.db.ok_or(ConfigError::MissingComponent("database"))?;
        let client = self.client.ok_or(ConfigError::MissingComponent("client"))?;
        Ok(SyncEngine {
            config,
            db,
            client,
            resolver: AccountResolver::new(),
        })
    }
}

impl SyncEngine {
    #[must_use]
    pub fn builder() -> SyncEngineBuilder {
        SyncEngineBuilder::default()
    }

    /// Validate the config, open the database, run migrations, and build
    /// the provider client.
    pub async fn connect(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;

        let db = db::connect(&config).await?;
        db::migrate(&db, &config)
            .await
            .map_err(|e| SyncError::Migration(e.to_string()))?;

        let client = StripeClient::new(
            &config.secret_key,
            config.api_version.as_deref(),
            config.request_timeout,
        )?;

        Ok(Self {
            config,
            db,
            client,
            resolver: AccountResolver::new(),
        })
    }

    /// The underlying database connection.
    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Every object kind `process_until_done` can backfill, in dependency
    /// order.
    #[must_use]
    pub fn get_supported_sync_objects() -> &'static [ObjectKind] {
        BACKFILL_ORDER
    }

    /// Verify and apply one webhook delivery. See the crate docs for the
    /// error contract (signature failures map to HTTP 400, everything else
    /// to a retryable 5xx).
    pub async fn process_webhook(
        &self,
        payload: &str,
        signature_header: &str,
    ) -> Result<(), SyncError> {
        webhook::process_webhook(
            &self.db,
            &self.client,
            &self.resolver,
            &self.config,
            payload,
            signature_header,
        )
        .await
    }

    /// Advance one page of `kind` for the acting account.
    pub async fn process_next(&self, kind: ObjectKind) -> Result<ProcessNext, SyncError> {
        let ctx = self.backfill_context().await?;
        crate::sync::process_next(&ctx, kind, None).await
    }

    /// Backfill every selected kind to completion under one sync run.
    pub async fn process_until_done(
        &self,
        params: BackfillParams,
    ) -> Result<BackfillSummary, SyncError> {
        let ctx = self.backfill_context().await?;
        crate::sync::process_until_done(&ctx, &params).await
    }

    /// Find or create the managed webhook endpoint for `base_url`.
    pub async fn find_or_create_managed_webhook(
        &self,
        base_url: &str,
        enabled_events: Option<Vec<String>>,
    ) -> Result<managed_webhook::Model, SyncError> {
        let account_id = self.resolver.account_id(&self.client).await?;
        crate::account::ensure_account(&self.db, &account_id).await?;
        endpoints::find_or_create_managed_webhook(
            &self.db,
            &self.client,
            &account_id,
            base_url,
            enabled_events,
        )
        .await
    }

    /// Delete a managed webhook on the provider and locally; tolerates
    /// not-found on either side.
    pub async fn delete_managed_webhook(&self, id: &str) -> Result<(), SyncError> {
        endpoints::delete_managed_webhook(&self.db, &self.client, id).await
    }

    /// The acting account's managed webhooks.
    pub async fn list_managed_webhooks(
        &self,
    ) -> Result<Vec<managed_webhook::Model>, SyncError> {
        let account_id = self.resolver.account_id(&self.client).await?;
        endpoints::list_managed_webhooks(&self.db, &account_id).await
    }

    /// Remove every mirrored row, cursor, run, and managed-webhook row for
    /// `account_id`. With `use_transaction` the removal is all-or-nothing.
    pub async fn dangerously_delete_account(
        &self,
        account_id: &str,
        options: DeleteOptions,
    ) -> Result<DeleteReport, SyncError> {
        delete::dangerously_delete_account(&self.db, account_id, options).await
    }

    /// Close the underlying connection pool, consuming the engine.
    pub async fn close(self) -> Result<(), SyncError> {
        self.db.close().await?;
        Ok(())
    }

    /// Shutdown hook: optionally delete this engine's managed webhooks.
    ///
    /// In-flight operation draining is the embedding application's job
    /// (bounded by `SyncConfig::shutdown_grace`); this only handles the
    /// provider-side cleanup step.
    pub async fn shutdown(&self, delete_webhooks: bool) -> Result<(), SyncError> {
        if !delete_webhooks {
            return Ok(());
        }
        for hook in self.list_managed_webhooks().await? {
            if let Err(err) = self.delete_managed_webhook(&hook.id).await {
                tracing::warn!(endpoint_id = %hook.id, error = %err, "Failed to delete managed webhook on shutdown");
            }
        }
        Ok(())
    }

    async fn backfill_context(&self) -> Result<BackfillContext, SyncError> {
        let account_id = self.resolver.account_id(&self.client).await?;
        Ok(BackfillContext {
            db: self.db.clone(),
            client: self.client.clone(),
            account_id,
            page_limit: self.config.page_limit,
            auto_expand_lists: self.config.auto_expand_lists,
            backfill_related_entities: self.config.backfill_related_entities,
            max_concurrent: self.config.max_concurrent,
        })
    }
}
