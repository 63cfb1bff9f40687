//! Projectors for subscription-shaped objects: subscriptions plus their
//! expanded items, schedules, and checkout sessions.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::entity::{checkout_session, subscription, subscription_item, subscription_schedule};
use crate::error::SyncError;

use super::{ProjectOptions, fields, mirror_on_conflict, stubs};

pub(crate) async fn upsert_subscription(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
    options: ProjectOptions,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::Subscription, obj)?;
    stubs::ensure_referenced(conn, account_id, obj, &[("customer", ObjectKind::Customer)]).await?;

    let model = subscription::ActiveModel {
        id: Set(id.clone()),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        status: Set(fields::str_field(obj, "status")),
        currency: Set(fields::str_field(obj, "currency")),
        current_period_start: Set(fields::ts_field(obj, "current_period_start")),
        current_period_end: Set(fields::ts_field(obj, "current_period_end")),
        cancel_at_period_end: Set(fields::bool_field(obj, "cancel_at_period_end")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    subscription::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<subscription::Entity>())
        .exec_without_returning(conn)
        .await?;

    // Single-hop expansion of the embedded items list. The payload carries
    // the first page of items; deeper pagination is backfill's job.
    if options.auto_expand_lists {
        if let Some(items) = obj
            .get("items")
            .and_then(|items| items.get("data"))
            .and_then(Value::as_array)
        {
            for item in items {
                upsert_subscription_item(conn, account_id, item).await?;
            }
        }
    }

    Ok(())
}

pub(crate) async fn upsert_subscription_item(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::SubscriptionItem, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("subscription", ObjectKind::Subscription),
            ("price", ObjectKind::Price),
        ],
    )
    .await?;

    let model = subscription_item::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        subscription: Set(fields::ref_id(obj, "subscription")),
        price: Set(fields::ref_id(obj, "price")),
        quantity: Set(fields::i64_field(obj, "quantity")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    subscription_item::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<subscription_item::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_subscription_schedule(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::SubscriptionSchedule, obj)?;
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

    let model = subscription_schedule::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        subscription: Set(fields::ref_id(obj, "subscription")),
        status: Set(fields::str_field(obj, "status")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    subscription_schedule::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<subscription_schedule::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub(crate) async fn upsert_checkout_session(
    conn: &impl ConnectionTrait,
    account_id: &str,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = fields::require_id(ObjectKind::CheckoutSession, obj)?;
    stubs::ensure_referenced(
        conn,
        account_id,
        obj,
        &[
            ("customer", ObjectKind::Customer),
            ("subscription", ObjectKind::Subscription),
            ("payment_intent", ObjectKind::PaymentIntent),
        ],
    )
    .await?;

    let model = checkout_session::ActiveModel {
        id: Set(id),
        account_id: Set(account_id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        customer: Set(fields::ref_id(obj, "customer")),
        subscription: Set(fields::ref_id(obj, "subscription")),
        payment_intent: Set(fields::ref_id(obj, "payment_intent")),
        status: Set(fields::str_field(obj, "status")),
        mode: Set(fields::str_field(obj, "mode")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    checkout_session::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<checkout_session::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
