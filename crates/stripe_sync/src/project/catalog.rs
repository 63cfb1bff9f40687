//! Projectors for the product catalog: products, prices, plans.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::entity::{plan, price, product};
use crate::error::SyncError;

use super::{fields, mirror_on_conflict, stubs};

pub(crate) async fn upsert_product(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Product, obj)?;
    let model = product::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        name: Set(fields::str_field(obj, "name")),
        description: Set(fields::str_field(obj, "description")),
        active: Set(fields::bool_field(obj, "active")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    product::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<product::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_price(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Price, obj)?;
    stubs::ensure_referenced(conn, account_id, obj, &[("product", ObjectKind::Product)]).await?;

    let model = price::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        product: Set(fields::ref_id(obj, "product")),
        currency: Set(fields::str_field(obj, "currency")),
        unit_amount: Set(fields::i64_field(obj, "unit_amount")),
        price_type: Set(fields::str_field(obj, "type")),
        active: Set(fields::bool_field(obj, "active")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    price::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<price::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_plan(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Plan, obj)?;
    stubs::ensure_referenced(conn, account_id, obj, &[("product", ObjectKind::Product)]).await?;

    let model = plan::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        product: Set(fields::ref_id(obj, "product")),
        currency: Set(fields::str_field(obj, "currency")),
        amount: Set(fields::i64_field(obj, "amount")),
        interval: Set(fields::str_field(obj, "interval")),
        active: Set(fields::bool_field(obj, "active")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    plan::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<plan::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
