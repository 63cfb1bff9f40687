//! Stub-parent rows.
//!
//! When a payload arrives before the object it references (a webhook for an
//! invoice of an unseen customer, say), the referenced row is created with
//! id and account only. `DO NOTHING` on conflict guarantees a stub never
//! clobbers a real row; the stub itself is replaced by the parent's next
//! full upsert.

use sea_orm::sea_query::OnConflict;
use sea_orm::ConnectionTrait;
use sea_orm::EntityTrait;

use crate::entity::object_kind::ObjectKind;
use crate::error::SyncError;

use super::fields;

/// Ensure a row exists for `(account_id, id)` of `kind`, creating a stub if
/// necessary.
pub(crate) async fn ensure(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
    id: &str,
) -> Result<(), SyncError> {
    macro_rules! stub_row {
        ($module:ident) => {{
            use crate::entity::$module::{ActiveModel, Column, Entity};
            use sea_orm::Set;
            let model = ActiveModel {
                id: Set(id.to_string()),
                account_id: Set(account_id.to_string()),
                last_synced_at: Set(fields::now()),
                ..Default::default()
            };
            Entity::insert(model)
                .on_conflict(
                    OnConflict::columns([Column::AccountId, Column::Id])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;
            Ok(())
        }};
    }

    match kind {
        ObjectKind::Product => stub_row!(product),
        ObjectKind::Price => stub_row!(price),
        ObjectKind::Plan => stub_row!(plan),
        ObjectKind::Customer => stub_row!(customer),
        ObjectKind::PaymentMethod => stub_row!(payment_method),
        ObjectKind::TaxId => stub_row!(tax_id),
        ObjectKind::SetupIntent => stub_row!(setup_intent),
        ObjectKind::Subscription => stub_row!(subscription),
        ObjectKind::SubscriptionItem => stub_row!(subscription_item),
        ObjectKind::SubscriptionSchedule => stub_row!(subscription_schedule),
        ObjectKind::CheckoutSession => stub_row!(checkout_session),
        ObjectKind::Invoice => stub_row!(invoice),
        ObjectKind::Charge => stub_row!(charge),
        ObjectKind::PaymentIntent => stub_row!(payment_intent),
        ObjectKind::Refund => stub_row!(refund),
        ObjectKind::CreditNote => stub_row!(credit_note),
        ObjectKind::Dispute => stub_row!(dispute),
        ObjectKind::EarlyFraudWarning => stub_row!(early_fraud_warning),
    }
}

/// Ensure stubs for every `(field, kind)` reference present in `obj`.
pub(crate) async fn ensure_referenced(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &serde_json::Value,
    references: &[(&str, ObjectKind)],
) -> Result<(), SyncError> {
    for (field, kind) in references {
        if let Some(parent_id) = fields::ref_id(obj, field) {
            ensure(conn, *kind, account_id, &parent_id).await?;
        }
    }
    Ok(())
}
