//! Integration tests for the webhook pipeline.
//!
//! Deliveries are built with the same signing scheme the verifier checks
//! (`stripe_sync::stripe::signature_header`), so these tests exercise the
//! full verify -> resolve -> project path against a migrated database.

use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use stripe_sync::http::{HttpMethod, MockTransport};
use stripe_sync::stripe::signature_header;
use stripe_sync::{
    Account, Customer, CustomerColumn, Invoice, InvoiceColumn, PaymentMethod, StripeClient,
    Subscription, SubscriptionItem, SyncConfig, SyncEngine, SyncError, connect_and_migrate,
};

const ACCOUNT: &str = "acct_webhook_1";
const SECRET: &str = "whsec_integration_test";

fn test_config() -> SyncConfig {
    SyncConfig::new("sk_test_123", "sqlite::memory:")
        .webhook_secret(SECRET)
        .pool_max(1)
}

async fn engine_with(transport: &MockTransport, config: SyncConfig) -> SyncEngine {
    let db = connect_and_migrate(&config).await.expect("test db");
    let client = StripeClient::with_transport(Arc::new(transport.clone()), "sk_test_123", None);
    SyncEngine::builder()
        .config(config)
        .database(db)
        .client(client)
        .build()
        .expect("engine")
}

fn push_account(transport: &MockTransport) {
    transport.push_json(
        HttpMethod::Get,
        "https://api.stripe.com/v1/account",
        &json!({"id": ACCOUNT, "object": "account"}),
    );
}

/// Build a signed delivery for an event envelope.
fn signed(event: &serde_json::Value) -> (String, String) {
    let payload = event.to_string();
    let header = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload);
    (payload, header)
}

fn event(id: &str, event_type: &str, object: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "data": {"object": object},
    })
}

/// A webhook referencing a parent that was never mirrored creates a stub
/// row for the parent; the parent's own event later replaces the stub.
#[tokio::test]
async fn webhook_for_unknown_parent_writes_stub_then_replaces_it() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config()).await;

    let (payload, header) = signed(&event(
        "evt_1",
        "invoice.created",
        json!({
            "id": "in_1",
            "object": "invoice",
            "customer": "cust_999",
            "status": "draft",
            "currency": "usd",
            "total": 1200,
        }),
    ));
    engine.process_webhook(&payload, &header).await.expect("invoice event");

    let invoice = Invoice::find()
        .filter(InvoiceColumn::AccountId.eq(ACCOUNT))
        .one(engine.database())
        .await
        .unwrap()
        .expect("invoice row");
    assert_eq!(invoice.id, "in_1");
    assert_eq!(invoice.customer.as_deref(), Some("cust_999"));

    let stub = Customer::find_by_id(("cust_999".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("stub customer row");
    assert!(stub.is_stub());
    assert!(!stub.deleted);
    assert_eq!(stub.email, None);

    // The customer's own event replaces the stub with real data.
    let (payload, header) = signed(&event(
        "evt_2",
        "customer.created",
        json!({
            "id": "cust_999",
            "object": "customer",
            "email": "late@example.com",
            "created": 1_699_000_000,
        }),
    ));
    engine.process_webhook(&payload, &header).await.expect("customer event");

    let full = Customer::find_by_id(("cust_999".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("customer row");
    assert!(!full.is_stub());
    assert_eq!(full.email.as_deref(), Some("late@example.com"));
    assert!(full.last_synced_at >= stub.last_synced_at);

    let customer_count = Customer::find().count(engine.database()).await.unwrap();
    assert_eq!(customer_count, 1);
}

/// A signature mismatch is rejected before anything touches the database.
#[tokio::test]
async fn signature_mismatch_writes_nothing() {
    let transport = MockTransport::new();
    let engine = engine_with(&transport, test_config()).await;

    let payload = event(
        "evt_bad",
        "customer.created",
        json!({"id": "cus_evil", "object": "customer"}),
    )
    .to_string();

    let err = engine.process_webhook(&payload, "bad-sig").await.unwrap_err();
    assert!(matches!(err, SyncError::Signature(_)));

    // No account resolution, no rows.
    assert!(transport.requests().is_empty());
    assert_eq!(Customer::find().count(engine.database()).await.unwrap(), 0);
    assert_eq!(Account::find().count(engine.database()).await.unwrap(), 0);
}

/// Redelivering the identical (body, signature) pair leaves the same state
/// as one delivery.
#[tokio::test]
async fn webhook_processing_is_idempotent_under_redelivery() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config()).await;

    let (payload, header) = signed(&event(
        "evt_dup",
        "customer.created",
        json!({
            "id": "cus_dup",
            "object": "customer",
            "email": "dup@example.com",
            "balance": 250,
            "created": 1_700_000_100,
        }),
    ));

    engine.process_webhook(&payload, &header).await.expect("first delivery");
    engine.process_webhook(&payload, &header).await.expect("redelivery");

    let rows = Customer::find().all(engine.database()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.email.as_deref(), Some("dup@example.com"));
    assert_eq!(row.balance, Some(250));
    assert_eq!(row.created.map(|t| t.timestamp()), Some(1_700_000_100));
    assert!(!row.deleted);
}

/// `*.deleted` events tombstone the row instead of removing it.
#[tokio::test]
async fn deleted_events_set_the_tombstone_and_preserve_the_row() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config()).await;

    let (payload, header) = signed(&event(
        "evt_c1",
        "customer.created",
        json!({"id": "cus_gone", "object": "customer", "email": "bye@example.com"}),
    ));
    engine.process_webhook(&payload, &header).await.unwrap();

    let (payload, header) = signed(&event(
        "evt_c2",
        "customer.deleted",
        json!({"id": "cus_gone", "object": "customer", "deleted": true}),
    ));
    engine.process_webhook(&payload, &header).await.unwrap();

    let row = Customer::find_by_id(("cus_gone".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("tombstoned row still present");
    assert!(row.deleted);
    assert_eq!(row.email.as_deref(), Some("bye@example.com"));

    // payment_method.detached is the same shape for payment methods.
    let (payload, header) = signed(&event(
        "evt_pm",
        "payment_method.detached",
        json!({"id": "pm_loose", "object": "payment_method"}),
    ));
    engine.process_webhook(&payload, &header).await.unwrap();

    let pm = PaymentMethod::find_by_id(("pm_loose".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("payment method row");
    assert!(pm.deleted);
}

/// `account.updated` refreshes the accounts row itself.
#[tokio::test]
async fn account_updated_fills_the_account_row() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config()).await;

    let (payload, header) = signed(&event(
        "evt_acct",
        "account.updated",
        json!({
            "id": ACCOUNT,
            "object": "account",
            "email": "owner@example.com",
            "country": "DE",
            "business_type": "company",
        }),
    ));
    engine.process_webhook(&payload, &header).await.expect("account event");

    let row = Account::find_by_id(ACCOUNT.to_string())
        .one(engine.database())
        .await
        .unwrap()
        .expect("account row");
    assert_eq!(row.email.as_deref(), Some("owner@example.com"));
    assert_eq!(row.country.as_deref(), Some("DE"));
    assert!(row.raw.is_some());
}

/// With list expansion on, a subscription event also lands its embedded
/// items (and their price stubs) in one transaction.
#[tokio::test]
async fn subscription_event_expands_items_when_enabled() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config().auto_expand_lists(true)).await;

    let (payload, header) = signed(&event(
        "evt_sub",
        "customer.subscription.created",
        json!({
            "id": "sub_1",
            "object": "subscription",
            "customer": "cus_sub",
            "status": "active",
            "currency": "eur",
            "items": {
                "object": "list",
                "data": [
                    {"id": "si_1", "object": "subscription_item", "subscription": "sub_1", "price": "price_1", "quantity": 2},
                    {"id": "si_2", "object": "subscription_item", "subscription": "sub_1", "price": "price_2", "quantity": 1},
                ],
                "has_more": false,
            },
        }),
    ));
    engine.process_webhook(&payload, &header).await.expect("subscription event");

    let sub = Subscription::find_by_id(("sub_1".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("subscription row");
    assert_eq!(sub.status.as_deref(), Some("active"));

    let items = SubscriptionItem::find().all(engine.database()).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.subscription.as_deref() == Some("sub_1")));

    let price_stub = stripe_sync::Price::find_by_id(("price_1".to_string(), ACCOUNT.to_string()))
        .one(engine.database())
        .await
        .unwrap()
        .expect("price stub");
    assert!(price_stub.raw.is_none());
}

/// Unhandled event families acknowledge without writing mirror rows.
#[tokio::test]
async fn unhandled_event_types_are_acknowledged_without_writes() {
    let transport = MockTransport::new();
    push_account(&transport);
    let engine = engine_with(&transport, test_config()).await;

    let (payload, header) = signed(&event(
        "evt_payout",
        "payout.paid",
        json!({"id": "po_1", "object": "payout"}),
    ));
    engine.process_webhook(&payload, &header).await.expect("acknowledged");

    assert_eq!(Customer::find().count(engine.database()).await.unwrap(), 0);
}

/// Platform deliveries carry `account`; rows land under that account, not
/// the credential's own.
#[tokio::test]
async fn connect_events_use_the_event_account() {
    let transport = MockTransport::new();
    // No account retrieve needed: the event names the account.
    let engine = engine_with(&transport, test_config()).await;

    let mut envelope = event(
        "evt_connect",
        "customer.created",
        json!({"id": "cus_conn", "object": "customer"}),
    );
    envelope["account"] = json!("acct_connected_7");
    let (payload, header) = signed(&envelope);
    engine.process_webhook(&payload, &header).await.expect("connect event");

    let row = Customer::find()
        .filter(CustomerColumn::Id.eq("cus_conn"))
        .one(engine.database())
        .await
        .unwrap()
        .expect("customer row");
    assert_eq!(row.account_id, "acct_connected_7");
    assert!(transport.requests().is_empty(), "no provider calls expected");
}
