//! Projectors for the billing chain: invoices, charges, payment intents,
//! refunds, credit notes.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::entity::{charge, credit_note, invoice, payment_intent, refund};
use crate::error::SyncError;

use super::{fields, mirror_on_conflict, stubs};

pub(crate) async fn upsert_invoice(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Invoice, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("subscription", ObjectKind::Subscription),
        ],
    )
    .await?;

    let model = invoice::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        subscription: Set(fields::ref_id(obj, "subscription")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        total: Set(fields::i64_field(obj, "total")),
        amount_due: Set(fields::i64_field(obj, "amount_due")),
        amount_paid: Set(fields::i64_field(obj, "amount_paid")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    invoice::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<invoice::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_charge(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Charge, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("invoice", ObjectKind::Invoice),
            ("payment_intent", ObjectKind::PaymentIntent),
        ],
    )
    .await?;

    let model = charge::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        invoice: Set(fields::ref_id(obj, "invoice")),
        payment_intent: Set(fields::ref_id(obj, "payment_intent")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        amount: Set(fields::i64_field(obj, "amount")),
        paid: Set(fields::bool_field(obj, "paid")),
        refunded: Set(fields::bool_field(obj, "refunded")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    charge::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<charge::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_payment_intent(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::PaymentIntent, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("invoice", ObjectKind::Invoice),
        ],
    )
    .await?;

    let model = payment_intent::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        invoice: Set(fields::ref_id(obj, "invoice")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        amount: Set(fields::i64_field(obj, "amount")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    payment_intent::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<payment_intent::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_refund(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Refund, obj)?;
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

    let model = refund::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        charge: Set(fields::ref_id(obj, "charge")),
        payment_intent: Set(fields::ref_id(obj, "payment_intent")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        amount: Set(fields::i64_field(obj, "amount")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    refund::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<refund::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_credit_note(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::CreditNote, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("invoice", ObjectKind::Invoice),
        ],
    )
    .await?;

    let model = credit_note::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        invoice: Set(fields::ref_id(obj, "invoice")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        total: Set(fields::i64_field(obj, "total")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    credit_note::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<credit_note::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
