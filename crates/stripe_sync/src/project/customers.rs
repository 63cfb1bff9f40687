//! Projectors for customer-rooted objects: customers, payment methods,
//! tax ids, setup intents.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::entity::{customer, payment_method, setup_intent, tax_id};
use crate::error::SyncError;

use super::{ProjectOptions, fields, mirror_on_conflict, stubs};

pub(crate) async fn upsert_customer(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
    options: ProjectOptions,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Customer, obj)?;

    let model = customer::ActiveModel {
        id: Set(id.clone()),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        email: Set(fields::str_field(obj, "email")),
        name: Set(fields::str_field(obj, "name")),
        description: Set(fields::str_field(obj, "description")),
        currency: Set(fields::str_field(obj, "currency")),
        balance: Set(fields::i64_field(obj, "balance")),
        delinquent: Set(fields::bool_field(obj, "delinquent")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    customer::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<customer::Entity>())
        .exec_without_returning(conn)
        .await?;

    // Single-hop expansion: the default payment method reference becomes a
    // stub so the relation is queryable before the method's own payload
    // arrives.
    if options.auto_expand_lists {
        if let Some(settings) = obj.get("invoice_settings") {
            if let Some(pm) = fields::ref_id(settings, "default_payment_method") {
                stubs::ensure(conn, ObjectKind::PaymentMethod, account_id, &pm).await?;
            }
        }
    }

    Ok(())
}

pub(crate) async fn upsert_payment_method(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::PaymentMethod, obj)?;
    stubs::ensure_referenced(conn, account_id, obj, &[("customer", ObjectKind::Customer)]).await?;

    let model = payment_method::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        method_type: Set(fields::str_field(obj, "type")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    payment_method::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<payment_method::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_tax_id(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::TaxId, obj)?;
    stubs::ensure_referenced(conn, account_id, obj, &[("customer", ObjectKind::Customer)]).await?;

    let model = tax_id::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        id_type: Set(fields::str_field(obj, "type")),
        value: Set(fields::str_field(obj, "value")),
        country: Set(fields::str_field(obj, "country")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    tax_id::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<tax_id::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_setup_intent(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::SetupIntent, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("payment_method", ObjectKind::PaymentMethod),
        ],
    )
    .await?;

    let model = setup_intent::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        payment_method: Set(fields::ref_id(obj, "payment_method")),
        status: Set(fields::str_field(obj, "status")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    setup_intent::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<setup_intent::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
