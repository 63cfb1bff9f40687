//! Projectors for risk objects: disputes and early fraud warnings.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::entity::{dispute, early_fraud_warning};
use crate::error::SyncError;

use super::{fields, mirror_on_conflict, stubs};

pub(crate) async fn upsert_dispute(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Dispute, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("charge", ObjectKind::Charge),
            ("payment_intent", ObjectKind::PaymentIntent),
        ],
    )
    .await?;

    let model = dispute::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        charge: Set(fields::ref_id(obj, "charge")),
        payment_intent: Set(fields::ref_id(obj, "payment_intent")),
        status: Set(fields::str_field(obj, "status")),
        reason: Set(fields::str_field(obj, "reason")),
        currency: Set(fields::str_field(obj, "currency")),
        amount: Set(fields::i64_field(obj, "amount")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    dispute::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<dispute::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_early_fraud_warning(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::EarlyFraudWarning, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("charge", ObjectKind::Charge),
            ("payment_intent", ObjectKind::PaymentIntent),
        ],
    )
    .await?;

    let model = early_fraud_warning::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        charge: Set(fields::ref_id(obj, "charge")),
        payment_intent: Set(fields::ref_id(obj, "payment_intent")),
        fraud_type: Set(fields::str_field(obj, "fraud_type")),
        actionable: Set(fields::bool_field(obj, "actionable")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    early_fraud_warning::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<early_fraud_warning::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
