//! Entity projectors: provider payloads in, mirror-row upserts out.
//!
//! One projector per object kind, dispatched through [`project`] so the
//! supported-kind list stays a single `match` over [`ObjectKind`]. All
//! projectors upsert on `(account_id, id)` and are idempotent; replaying a
//! payload yields the same row. When a payload references a parent that has
//! not been mirrored yet, a stub row (id + account only) is written so the
//! reference holds until the parent's own payload arrives.

pub(crate) mod fields;

mod billing;
mod catalog;
mod customers;
mod risk;
pub(crate) mod stubs;
mod subscriptions;

use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::error::SyncError;

/// Knobs that shape projection behavior.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProjectOptions {
    /// Expand single-hop sub-objects (subscription items, default payment
    /// method stubs).
    pub auto_expand_lists: bool,
}

/// Project one provider object into its mirror row.
pub(crate) async fn project(
    conn: &impl ConnectionTrait,
    account_id: &str,
    kind: ObjectKind,
    obj: &Value,
    options: ProjectOptions,
) -> Result<(), SyncError> {
    match kind {
        ObjectKind::Product => catalog::upsert_product(conn, account_id, obj).await,
        ObjectKind::Price => catalog::upsert_price(conn, account_id, obj).await,
        ObjectKind::Plan => catalog::upsert_plan(conn, account_id, obj).await,
        ObjectKind::Customer => customers::upsert_customer(conn, account_id, obj, options).await,
        ObjectKind::PaymentMethod => {
            customers::upsert_payment_method(conn, account_id, obj).await
        }
        ObjectKind::TaxId => customers::upsert_tax_id(conn, account_id, obj).await,
        ObjectKind::SetupIntent => customers::upsert_setup_intent(conn, account_id, obj).await,
        ObjectKind::Subscription => {
            subscriptions::upsert_subscription(conn, account_id, obj, options).await
        }
        ObjectKind::SubscriptionItem => {
            subscriptions::upsert_subscription_item(conn, account_id, obj).await
        }
        ObjectKind::SubscriptionSchedule => {
            subscriptions::upsert_subscription_schedule(conn, account_id, obj).await
        }
        ObjectKind::CheckoutSession => {
            subscriptions::upsert_checkout_session(conn, account_id, obj).await
        }
        ObjectKind::Invoice => billing::upsert_invoice(conn, account_id, obj).await,
        ObjectKind::Charge => billing::upsert_charge(conn, account_id, obj).await,
        ObjectKind::PaymentIntent => billing::upsert_payment_intent(conn, account_id, obj).await,
        ObjectKind::Refund => billing::upsert_refund(conn, account_id, obj).await,
        ObjectKind::CreditNote => billing::upsert_credit_note(conn, account_id, obj).await,
        ObjectKind::Dispute => risk::upsert_dispute(conn, account_id, obj).await,
        ObjectKind::EarlyFraudWarning => {
            risk::upsert_early_fraud_warning(conn, account_id, obj).await
        }
    }
}

/// Soft-delete one mirror row: set `deleted = true`, preserve everything
/// else. Upserts so a tombstone for a never-seen object still leaves a row.
pub(crate) async fn tombstone(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
    id: &str,
) -> Result<(), SyncError> {
    macro_rules! tombstone_row {
        ($module:ident) => {{
            use crate::entity::$module::{ActiveModel, Column, Entity};
            use sea_orm::Set;
            let model = ActiveModel {
                id: Set(id.to_string()),
                account_id: Set(account_id.to_string()),
                deleted: Set(true),
                last_synced_at: Set(fields::now()),
                updated_at: Set(Some(fields::now())),
                ..Default::default()
            };
            Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([Column::AccountId, Column::Id])
                        .update_columns([Column::Deleted, Column::LastSyncedAt, Column::UpdatedAt])
                        .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;
            Ok(())
        }};
    }

    match kind {
        ObjectKind::Product => tombstone_row!(product),
        ObjectKind::Price => tombstone_row!(price),
        ObjectKind::Plan => tombstone_row!(plan),
        ObjectKind::Customer => tombstone_row!(customer),
        ObjectKind::PaymentMethod => tombstone_row!(payment_method),
        ObjectKind::TaxId => tombstone_row!(tax_id),
        ObjectKind::SetupIntent => tombstone_row!(setup_intent),
        ObjectKind::Subscription => tombstone_row!(subscription),
        ObjectKind::SubscriptionItem => tombstone_row!(subscription_item),
        ObjectKind::SubscriptionSchedule => tombstone_row!(subscription_schedule),
        ObjectKind::CheckoutSession => tombstone_row!(checkout_session),
        ObjectKind::Invoice => tombstone_row!(invoice),
        ObjectKind::Charge => tombstone_row!(charge),
        ObjectKind::PaymentIntent => tombstone_row!(payment_intent),
        ObjectKind::Refund => tombstone_row!(refund),
        ObjectKind::CreditNote => tombstone_row!(credit_note),
        ObjectKind::Dispute => tombstone_row!(dispute),
        ObjectKind::EarlyFraudWarning => tombstone_row!(early_fraud_warning),
    }
}

/// Build the `(account_id, id)` on-conflict clause updating every data
/// column. Provider object payloads are authoritative, and object-creation
/// timestamps never change upstream, so a full overwrite both refreshes the
/// row and promotes stubs to real rows.
pub(crate) fn mirror_on_conflict<E: EntityTrait>() -> OnConflict {
    let keys: Vec<E::Column> = <E::PrimaryKey as Iterable>::iter()
        .map(PrimaryKeyToColumn::into_column)
        .collect();
    let updates: Vec<E::Column> = E::Column::iter()
        .filter(|column| !keys.iter().any(|key| key.as_str() == column.as_str()))
        .collect();
    OnConflict::columns(keys).update_columns(updates).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::prelude::Customer;
    use sea_orm::{EntityTrait, QueryTrait, Set};

    /// The on-conflict clause must target the composite key and refresh the
    /// sync bookkeeping columns.
    #[test]
    fn mirror_on_conflict_targets_composite_key_and_updates_data_columns() {
        let model = crate::entity::customer::ActiveModel {
            id: Set("cus_1".to_string()),
            account_id: Set("acct_1".to_string()),
            email: Set(Some("a@b.test".to_string())),
            last_synced_at: Set(fields::now()),
            ..Default::default()
        };
        let sql = Customer::insert(model)
            .on_conflict(mirror_on_conflict::<Customer>())
            .build(sea_orm::DatabaseBackend::Sqlite)
            .to_string();

        assert!(sql.contains("ON CONFLICT"), "{sql}");
        assert!(sql.contains("DO UPDATE"), "{sql}");
        assert!(sql.contains("excluded"), "{sql}");
        assert!(sql.contains("last_synced_at"), "{sql}");
        // Key columns must not appear in the update set.
        assert!(!sql.contains("\"account_id\" = \"excluded\""), "{sql}");
    }
}
