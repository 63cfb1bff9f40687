//! Managed-webhook lifecycle: find, create, reconcile, and clean up the
//! provider-side endpoint registrations this engine owns.
//!
//! Ownership is marked with `metadata.managed_by = "stripe-sync"` on the
//! provider and mirrored in `_managed_webhooks`. Neither side is trusted
//! alone: every lookup reconciles local rows against the provider, deleting
//! orphans on whichever side lost its partner.

use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::db;
use crate::entity::managed_webhook::{self, Column, Entity as ManagedWebhook};
use crate::error::SyncError;
use crate::project::fields;
use crate::stripe::{StripeClient, WebhookEndpointParams};

/// Ownership marker stamped into endpoint metadata.
pub const MANAGED_BY: &str = "stripe-sync";

/// Description given to endpoints this engine creates.
pub const MANAGED_DESCRIPTION: &str = "Stripe Sync managed webhook";

/// Descriptions older releases stamped on their endpoints. Matched during
/// cross-orphan cleanup so upgrades don't leak endpoints.
const LEGACY_DESCRIPTIONS: &[&str] = &[
    "stripe-sync-cli development webhook",
    "Stripe Sync Development",
];

/// Whether a provider endpoint description marks a legacy managed endpoint.
fn is_legacy_description(description: &str) -> bool {
    if LEGACY_DESCRIPTIONS.contains(&description) {
        return true;
    }
    let normalized = description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    normalized.starts_with("stripe sync")
}

/// Find the managed endpoint for `(account, base_url)`, creating it if no
/// valid one exists.
///
/// Serialized per `(account, base_url)` with an advisory lock, so N
/// concurrent callers converge on exactly one provider endpoint and one
/// local row, and every caller gets the same webhook back.
pub(crate) async fn find_or_create_managed_webhook(
    db: &DatabaseConnection,
    client: &StripeClient,
    account_id: &str,
    base_url: &str,
    enabled_events: Option<Vec<String>>,
) -> Result<managed_webhook::Model, SyncError> {
    let key = db::lock_key(account_id, base_url);
    db::with_advisory_lock(db, key, || async {
        reconcile_or_create(db, client, account_id, base_url, enabled_events).await
    })
    .await
}

async fn reconcile_or_create(
    db: &DatabaseConnection,
    client: &StripeClient,
    account_id: &str,
    base_url: &str,
    enabled_events: Option<Vec<String>>,
) -> Result<managed_webhook::Model, SyncError> {
    // Check local claims for this URL against the provider.
    let local_rows = ManagedWebhook::find()
        .filter(Column::AccountId.eq(account_id))
        .filter(Column::Url.eq(base_url))
        .all(db)
        .await?;

    let mut valid: Option<managed_webhook::Model> = None;
    for row in local_rows {
        match client.retrieve_webhook_endpoint(&row.id).await? {
            None => {
                // Local row with no provider partner.
                tracing::info!(endpoint_id = %row.id, "Dropping orphaned local webhook row");
                ManagedWebhook::delete_by_id(row.id.clone()).exec(db).await?;
            }
            Some(endpoint) if endpoint.url != base_url || !endpoint.is_managed() => {
                // The endpoint drifted or predates the ownership marker.
                tracing::info!(endpoint_id = %row.id, url = %endpoint.url, "Replacing legacy webhook endpoint");
                client.delete_webhook_endpoint(&row.id).await?;
                ManagedWebhook::delete_by_id(row.id.clone()).exec(db).await?;
            }
            Some(_) => valid = Some(row),
        }
    }

    if let Some(row) = valid {
        return Ok(row);
    }

    // Provider-side endpoints we own that no local row claims: delete them
    // before creating a fresh pair.
    let claimed: HashSet<String> = ManagedWebhook::find()
        .filter(Column::AccountId.eq(account_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    for endpoint in client.list_webhook_endpoints().await? {
        let ours = endpoint.is_managed()
            || endpoint
                .description
                .as_deref()
                .is_some_and(is_legacy_description);
        if ours && !claimed.contains(&endpoint.id) {
            tracing::info!(endpoint_id = %endpoint.id, url = %endpoint.url, "Deleting cross-orphaned provider endpoint");
            client.delete_webhook_endpoint(&endpoint.id).await?;
        }
    }

    let endpoint = client
        .create_webhook_endpoint(&WebhookEndpointParams {
            url: base_url.to_string(),
            enabled_events: enabled_events.unwrap_or_else(|| vec!["*".to_string()]),
            description: Some(MANAGED_DESCRIPTION.to_string()),
            metadata: vec![("managed_by".to_string(), MANAGED_BY.to_string())],
        })
        .await?;

    tracing::info!(endpoint_id = %endpoint.id, url = %base_url, "Created managed webhook endpoint");

    let model = managed_webhook::ActiveModel {
        id: Set(endpoint.id.clone()),
        account_id: Set(account_id.to_string()),
        url: Set(base_url.to_string()),
        enabled_events: Set(Some(serde_json::json!(endpoint.enabled_events))),
        created_at: Set(fields::now()),
    };
    let row = model.insert(db).await?;
    Ok(row)
}

/// Delete a managed endpoint on both sides. Not-found on either side is
/// fine; deletion is convergent.
pub(crate) async fn delete_managed_webhook(
    db: &DatabaseConnection,
    client: &StripeClient,
    id: &str,
) -> Result<(), SyncError> {
    if !client.delete_webhook_endpoint(id).await? {
        tracing::debug!(endpoint_id = %id, "Provider endpoint already gone");
    }
    ManagedWebhook::delete_by_id(id.to_string()).exec(db).await?;
    Ok(())
}

/// The current account's managed webhook rows.
pub(crate) async fn list_managed_webhooks(
    db: &DatabaseConnection,
    account_id: &str,
) -> Result<Vec<managed_webhook::Model>, SyncError> {
    Ok(ManagedWebhook::find()
        .filter(Column::AccountId.eq(account_id))
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_descriptions_match_exactly_and_by_normalized_prefix() {
        assert!(is_legacy_description("stripe-sync-cli development webhook"));
        assert!(is_legacy_description("Stripe Sync Development"));
        assert!(is_legacy_description("Stripe   Sync managed webhook"));
        assert!(is_legacy_description("stripe sync"));

        assert!(!is_legacy_description("my own webhook"));
        assert!(!is_legacy_description("stripe-sync")); // hyphen, not whitespace
        assert!(!is_legacy_description(""));
    }
}
