//! The live ingestion path: verify, resolve the acting account, dispatch to
//! a projector, acknowledge.
//!
//! Redelivery is safe because projectors upsert; no dedup table exists.
//! Each event's writes happen inside one transaction, so an event that
//! writes multiple rows (a subscription plus its expanded items) lands
//! atomically and a failed event writes nothing.

use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::account::{self, AccountResolver};
use crate::config::{ConfigError, SyncConfig};
use crate::entity::object_kind::ObjectKind;
use crate::error::SyncError;
use crate::project::{self, ProjectOptions, fields};
use crate::stripe::{self, StripeClient};

/// What an event does to its mirror row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventAction {
    Upsert,
    Tombstone,
}

/// Map an event type onto `(object kind, action)`.
///
/// `*.created` / `*.updated` and friends upsert; `*.deleted` (and
/// `payment_method.detached`) tombstone. Event families with no mirror
/// table return `None` and are acknowledged without writing.
pub(crate) fn route_event(event_type: &str) -> Option<(ObjectKind, EventAction)> {
    use ObjectKind::*;

    // Longest prefixes first: several families nest under `customer.` and
    // `charge.`.
    let (kind, rest) = if let Some(rest) = event_type.strip_prefix("customer.subscription.") {
        (Subscription, rest)
    } else if let Some(rest) = event_type.strip_prefix("customer.tax_id.") {
        (TaxId, rest)
    } else if event_type.starts_with("customer.discount.")
        || event_type.starts_with("customer.source.")
        || event_type.starts_with("customer.bank_account.")
        || event_type.starts_with("customer.card.")
    {
        return None;
    } else if let Some(rest) = event_type.strip_prefix("customer.") {
        (Customer, rest)
    } else if let Some(rest) = event_type.strip_prefix("checkout.session.") {
        (CheckoutSession, rest)
    } else if let Some(rest) = event_type.strip_prefix("charge.dispute.") {
        (Dispute, rest)
    } else if let Some(rest) = event_type.strip_prefix("charge.refund.") {
        (Refund, rest)
    } else if let Some(rest) = event_type.strip_prefix("charge.") {
        (Charge, rest)
    } else if let Some(rest) = event_type.strip_prefix("invoice.") {
        (Invoice, rest)
    } else if let Some(rest) = event_type.strip_prefix("payment_method.") {
        (PaymentMethod, rest)
    } else if let Some(rest) = event_type.strip_prefix("payment_intent.") {
        (PaymentIntent, rest)
    } else if let Some(rest) = event_type.strip_prefix("setup_intent.") {
        (SetupIntent, rest)
    } else if let Some(rest) = event_type.strip_prefix("product.") {
        (Product, rest)
    } else if let Some(rest) = event_type.strip_prefix("price.") {
        (Price, rest)
    } else if let Some(rest) = event_type.strip_prefix("plan.") {
        (Plan, rest)
    } else if let Some(rest) = event_type.strip_prefix("subscription_schedule.") {
        (SubscriptionSchedule, rest)
    } else if let Some(rest) = event_type.strip_prefix("credit_note.") {
        (CreditNote, rest)
    } else if let Some(rest) = event_type.strip_prefix("radar.early_fraud_warning.") {
        (EarlyFraudWarning, rest)
    } else if let Some(rest) = event_type.strip_prefix("refund.") {
        (Refund, rest)
    } else {
        return None;
    };

    let action = match (kind, rest) {
        (PaymentMethod, "detached") => EventAction::Tombstone,
        (_, "deleted") => EventAction::Tombstone,
        _ => EventAction::Upsert,
    };
    Some((kind, action))
}

/// Verify and apply one webhook delivery.
///
/// # Errors
/// `SyncError::Signature` when verification fails (callers answer 400);
/// `SyncError::Projection` / `SyncError::Database` when applying the event
/// fails, in which case nothing was written and the provider's redelivery
/// will retry it.
#[tracing::instrument(skip_all)]
pub(crate) async fn process_webhook(
    db: &DatabaseConnection,
    client: &StripeClient,
    resolver: &AccountResolver,
    config: &SyncConfig,
    payload: &str,
    signature_header: &str,
) -> Result<(), SyncError> {
    let secret = config
        .webhook_secret
        .as_deref()
        .ok_or(SyncError::Config(ConfigError::MissingWebhookSecret))?;

    let event = stripe::construct_event(payload, signature_header, secret)?;

    // Platform handlers receive connected-account events with `account`
    // set; direct handlers fall back to the credential's own account.
    let account_id = match &event.account {
        Some(account) => account.clone(),
        None => resolver.account_id(client).await?,
    };

    let obj = &event.data.object;

    // `account.updated` carries the account itself; other `account.*`
    // events (application handshakes, external accounts) do not.
    if event.event_type == "account.updated" {
        let txn = db.begin().await?;
        account::upsert_account(&txn, obj).await?;
        txn.commit().await?;
        tracing::info!(event_id = %event.id, account_id = %account_id, "Refreshed account row");
        return Ok(());
    }

    let Some((kind, action)) = route_event(&event.event_type) else {
        tracing::debug!(event_type = %event.event_type, "Ignoring unhandled event type");
        return Ok(());
    };

    let options = ProjectOptions {
        auto_expand_lists: config.auto_expand_lists,
    };

    let txn = db.begin().await?;
    account::ensure_account(&txn, &account_id).await?;
    match action {
        EventAction::Upsert => project::project(&txn, &account_id, kind, obj, options).await?,
        EventAction::Tombstone => {
            let id = fields::require_id(kind, obj)?;
            project::tombstone(&txn, kind, &account_id, &id).await?;
        }
    }
    txn.commit().await?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        account_id = %account_id,
        kind = %kind,
        "Processed webhook event"
    );
    Ok(())
}
