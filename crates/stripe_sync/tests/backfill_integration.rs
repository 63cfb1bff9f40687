//! Integration tests for the backfill path.
//!
//! Each test wires a real engine against an in-memory SQLite database with
//! migrations applied and a scripted mock transport, then checks the
//! resulting database state: mirror rows, cursors, and run bookkeeping.

use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;

use stripe_sync::http::{HttpMethod, MockTransport};
use stripe_sync::{
    BackfillParams, Customer, CustomerColumn, ObjectKind, StripeClient, SyncConfig, SyncEngine,
    SyncError, SyncObjRun, SyncRun, SyncRunActiveModel, SyncRunColumn, SyncStatus,
    SyncStatusColumn, connect_and_migrate,
};

const ACCOUNT: &str = "acct_backfill_1";
const API: &str = "https://api.stripe.com/v1";

fn test_config() -> SyncConfig {
    SyncConfig::new("sk_test_123", "sqlite::memory:")
        .webhook_secret("whsec_test")
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
        &format!("{API}/account"),
        &json!({"id": ACCOUNT, "object": "account"}),
    );
}

fn empty_list() -> serde_json::Value {
    json!({"object": "list", "data": [], "has_more": false})
}

/// First-page list URL for a kind (no cursor).
fn first_page_url(kind: ObjectKind) -> String {
    if kind == ObjectKind::Subscription {
        format!("{API}/{}?limit=100&status=all", kind.api_path())
    } else {
        format!("{API}/{}?limit=100", kind.api_path())
    }
}

/// An empty backfill opens exactly one run, closes it, reports zero synced
/// objects for every kind, and leaves every cursor null.
#[tokio::test]
async fn empty_backfill_completes_with_null_cursors() {
    let transport = MockTransport::new();
    push_account(&transport);
    for kind in SyncEngine::get_supported_sync_objects() {
        transport.push_json(HttpMethod::Get, first_page_url(*kind), &empty_list());
    }

    let engine = engine_with(&transport, test_config()).await;
    let summary = engine
        .process_until_done(BackfillParams::default())
        .await
        .expect("backfill");

    assert_eq!(summary.len(), 17);
    for (kind, outcome) in &summary {
        assert_eq!(outcome.synced, 0, "{kind}");
        assert_eq!(outcome.errors, 0, "{kind}");
    }

    let runs = SyncRun::find().all(engine.database()).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].closed_at.is_some());
    assert!(runs[0].completed_at.is_some());

    let cursors = SyncStatus::find().all(engine.database()).await.unwrap();
    assert_eq!(cursors.len(), 17);
    assert!(cursors.iter().all(|c| c.last_synced_object_id.is_none()));

    // Every per-object run reached done.
    let obj_runs = SyncObjRun::find().all(engine.database()).await.unwrap();
    assert_eq!(obj_runs.len(), 17);
    assert!(
        obj_runs
            .iter()
            .all(|o| o.status == stripe_sync::ObjRunStatus::Done)
    );
}

/// Two pages of customers: rows land, the cursor ends on the last id, and a
/// further `process_next` reports nothing to do.
#[tokio::test]
async fn two_page_customer_backfill_sets_cursor_and_drains() {
    let transport = MockTransport::new();
    push_account(&transport);
    transport.push_json(
        HttpMethod::Get,
        format!("{API}/customers?limit=100"),
        &json!({
            "object": "list",
            "data": [
                {"id": "cus_1", "object": "customer", "email": "one@example.com", "created": 1_700_000_001},
                {"id": "cus_2", "object": "customer", "email": "two@example.com", "created": 1_700_000_002},
            ],
            "has_more": true,
        }),
    );
    transport.push_json(
        HttpMethod::Get,
        format!("{API}/customers?limit=100&starting_after=cus_2"),
        &json!({
            "object": "list",
            "data": [
                {"id": "cus_3", "object": "customer", "email": "three@example.com", "created": 1_700_000_003},
            ],
            "has_more": false,
        }),
    );
    transport.push_json(
        HttpMethod::Get,
        format!("{API}/customers?limit=100&starting_after=cus_3"),
        &empty_list(),
    );

    let engine = engine_with(&transport, test_config()).await;

    let step1 = engine.process_next(ObjectKind::Customer).await.unwrap();
    assert!(step1.has_more);
    assert_eq!(step1.processed, 2);

    let step2 = engine.process_next(ObjectKind::Customer).await.unwrap();
    assert!(!step2.has_more);
    assert_eq!(step2.processed, 1);

    let customers = Customer::find()
        .filter(CustomerColumn::AccountId.eq(ACCOUNT))
        .all(engine.database())
        .await
        .unwrap();
    let mut ids: Vec<_> = customers.iter().map(|c| c.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["cus_1", "cus_2", "cus_3"]);
    assert!(customers.iter().all(|c| c.raw.is_some()));

    let cursor = SyncStatus::find()
        .filter(SyncStatusColumn::Resource.eq("customer"))
        .filter(SyncStatusColumn::AccountId.eq(ACCOUNT))
        .one(engine.database())
        .await
        .unwrap()
        .expect("cursor row");
    assert_eq!(cursor.last_synced_object_id.as_deref(), Some("cus_3"));

    // Fully drained: the next call starts after cus_3 and finds nothing.
    let step3 = engine.process_next(ObjectKind::Customer).await.unwrap();
    assert!(!step3.has_more);
    assert_eq!(step3.processed, 0);
}

/// Restarting mid-backfill resumes from the stored cursor rather than page
/// one: a second engine over the same database continues after cus_2.
#[tokio::test]
async fn backfill_resumes_from_stored_cursor_after_restart() {
    let transport = MockTransport::new();
    push_account(&transport);
    transport.push_json(
        HttpMethod::Get,
        format!("{API}/customers?limit=100"),
        &json!({
            "object": "list",
            "data": [
                {"id": "cus_1", "object": "customer"},
                {"id": "cus_2", "object": "customer"},
            ],
            "has_more": true,
        }),
    );

    let config = test_config();
    let db = connect_and_migrate(&config).await.expect("test db");
    let client = StripeClient::with_transport(Arc::new(transport.clone()), "sk_test_123", None);
    let engine = SyncEngine::builder()
        .config(config.clone())
        .database(db.clone())
        .client(client)
        .build()
        .unwrap();

    engine.process_next(ObjectKind::Customer).await.unwrap();
    drop(engine);

    // New engine, same database: the next list call must carry the cursor.
    let transport2 = MockTransport::new();
    transport2.push_json(
        HttpMethod::Get,
        format!("{API}/account"),
        &json!({"id": ACCOUNT, "object": "account"}),
    );
    transport2.push_json(
        HttpMethod::Get,
        format!("{API}/customers?limit=100&starting_after=cus_2"),
        &json!({
            "object": "list",
            "data": [{"id": "cus_3", "object": "customer"}],
            "has_more": false,
        }),
    );
    let client2 = StripeClient::with_transport(Arc::new(transport2.clone()), "sk_test_123", None);
    let engine2 = SyncEngine::builder()
        .config(config)
        .database(db)
        .client(client2)
        .build()
        .unwrap();

    let step = engine2.process_next(ObjectKind::Customer).await.unwrap();
    assert_eq!(step.processed, 1);
    assert!(!step.has_more);

    let count = Customer::find().count(engine2.database()).await.unwrap();
    assert_eq!(count, 3);
}

/// A second `process_until_done` while a run is open fails with
/// `ConcurrentRun` and leaves the open run untouched.
#[tokio::test]
async fn concurrent_run_is_rejected() {
    let transport = MockTransport::new();
    push_account(&transport);

    let engine = engine_with(&transport, test_config()).await;

    // Simulate another worker's open run.
    let open = SyncRunActiveModel {
        account_id: Set(ACCOUNT.to_string()),
        started_at: Set(chrono::Utc::now().fixed_offset()),
        max_concurrent: Set(4),
        triggered_by: Set(Some("other-worker".to_string())),
        ..Default::default()
    };
    SyncRun::insert(open).exec(engine.database()).await.unwrap();

    let err = engine
        .process_until_done(BackfillParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ConcurrentRun { ref account_id } if account_id == ACCOUNT));

    let open_runs = SyncRun::find()
        .filter(SyncRunColumn::ClosedAt.is_null())
        .count(engine.database())
        .await
        .unwrap();
    assert_eq!(open_runs, 1);
}

/// A single-kind run pulls in never-synced referenced kinds when
/// `backfill_related_entities` is on, in dependency order.
#[tokio::test]
async fn single_kind_backfill_enqueues_unsynced_related_kinds() {
    let transport = MockTransport::new();
    push_account(&transport);
    // subscription references customer and price; price references product
    // only transitively, so exactly three kinds run.
    transport.push_json(
        HttpMethod::Get,
        first_page_url(ObjectKind::Customer),
        &empty_list(),
    );
    transport.push_json(
        HttpMethod::Get,
        first_page_url(ObjectKind::Price),
        &empty_list(),
    );
    transport.push_json(
        HttpMethod::Get,
        first_page_url(ObjectKind::Subscription),
        &empty_list(),
    );

    let engine = engine_with(&transport, test_config()).await;
    let summary = engine
        .process_until_done(BackfillParams {
            object: Some(ObjectKind::Subscription),
            ..BackfillParams::default()
        })
        .await
        .expect("backfill");

    let kinds: Vec<_> = summary.keys().copied().collect();
    assert_eq!(
        kinds,
        vec![
            ObjectKind::Price,
            ObjectKind::Customer,
            ObjectKind::Subscription
        ]
    );
}

/// An error on one kind marks that kind's object run `error` but still
/// closes the overall run; healthy kinds are unaffected.
#[tokio::test]
async fn kind_failure_is_recorded_and_run_still_closes() {
    let transport = MockTransport::new();
    push_account(&transport);
    // customers list succeeds, charges list permanently fails
    transport.push_json(
        HttpMethod::Get,
        first_page_url(ObjectKind::Customer),
        &empty_list(),
    );
    transport.push_response(
        HttpMethod::Get,
        first_page_url(ObjectKind::Charge),
        stripe_sync::http::HttpResponse {
            status: 400,
            headers: Vec::new(),
            body: br#"{"error":{"message":"boom"}}"#.to_vec(),
        },
    );

    let engine = engine_with(
        &transport,
        test_config().backfill_related_entities(false),
    )
    .await;

    let summary = engine
        .process_until_done(BackfillParams {
            object: Some(ObjectKind::Customer),
            ..BackfillParams::default()
        })
        .await
        .expect("customer-only run");
    assert_eq!(summary[&ObjectKind::Customer].errors, 0);

    let summary = engine
        .process_until_done(BackfillParams {
            object: Some(ObjectKind::Charge),
            ..BackfillParams::default()
        })
        .await
        .expect("run completes despite kind error");
    assert_eq!(summary[&ObjectKind::Charge].errors, 1);

    let runs = SyncRun::find().all(engine.database()).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.closed_at.is_some()));

    let failed = SyncObjRun::find()
        .filter(stripe_sync::SyncObjRunColumn::Resource.eq("charge"))
        .one(engine.database())
        .await
        .unwrap()
        .expect("charge obj run");
    assert_eq!(failed.status, stripe_sync::ObjRunStatus::Error);
    assert!(failed.error_message.as_deref().unwrap_or("").contains("boom"));
}
