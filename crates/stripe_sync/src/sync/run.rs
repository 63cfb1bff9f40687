//! Sync-run coordination: at most one active run per account, with
//! per-object-kind bookkeeping.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::entity::object_kind::ObjectKind;
use crate::entity::sync_obj_run::{self, ObjRunStatus};
use crate::entity::sync_run;
use crate::error::SyncError;
use crate::project::fields;

/// Open a run for `account_id`.
///
/// The `_sync_run_one_open` partial unique index rejects a second open run;
/// that unique violation is translated into [`SyncError::ConcurrentRun`].
pub(crate) async fn open_run(
    conn: &impl ConnectionTrait,
    account_id: &str,
    max_concurrent: i32,
    triggered_by: Option<String>,
) -> Result<sync_run::Model, SyncError> {
    let model = sync_run::ActiveModel {
        account_id: Set(account_id.to_string()),
        started_at: Set(fields::now()),
        max_concurrent: Set(max_concurrent),
        triggered_by: Set(triggered_by),
        ..Default::default()
    };

    match model.insert(conn).await {
        Ok(run) => {
            tracing::info!(run_id = run.id, account_id = %account_id, "Opened sync run");
            Ok(run)
        }
        Err(err) if is_unique_violation(&err) => Err(SyncError::ConcurrentRun {
            account_id: account_id.to_string(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// Close a run, stamping `completed_at` and `closed_at`.
pub(crate) async fn close_run(conn: &impl ConnectionTrait, run_id: i64) -> Result<(), DbErr> {
    sync_run::Entity::update_many()
        .col_expr(sync_run::Column::CompletedAt, Expr::value(fields::now()))
        .col_expr(sync_run::Column::ClosedAt, Expr::value(fields::now()))
        .filter(sync_run::Column::Id.eq(run_id))
        .filter(sync_run::Column::ClosedAt.is_null())
        .exec(conn)
        .await?;
    tracing::info!(run_id, "Closed sync run");
    Ok(())
}

/// The account's open run, if one exists.
pub(crate) async fn find_open_run(
    conn: &impl ConnectionTrait,
    account_id: &str,
) -> Result<Option<sync_run::Model>, DbErr> {
    sync_run::Entity::find()
        .filter(sync_run::Column::AccountId.eq(account_id))
        .filter(sync_run::Column::ClosedAt.is_null())
        .one(conn)
        .await
}

/// Upsert one `(run, kind)` bookkeeping row.
pub(crate) async fn record_object(
    conn: &impl ConnectionTrait,
    run_id: i64,
    kind: ObjectKind,
    status: ObjRunStatus,
    processed_count: i64,
    error_message: Option<String>,
) -> Result<(), DbErr> {
    let model = sync_obj_run::ActiveModel {
        run_id: Set(run_id),
        resource: Set(kind.as_str().to_string()),
        status: Set(status),
        processed_count: Set(processed_count),
        error_message: Set(error_message),
        updated_at: Set(fields::now()),
    };
    sync_obj_run::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([sync_obj_run::Column::RunId, sync_obj_run::Column::Resource])
                .update_columns([
                    sync_obj_run::Column::Status,
                    sync_obj_run::Column::ProcessedCount,
                    sync_obj_run::Column::ErrorMessage,
                    sync_obj_run::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Claim a kind for processing: `pending -> running`, exactly once.
///
/// A second worker observing the row already running gets `false` and
/// skips, which keeps at most one active page per `(account, kind)`.
pub(crate) async fn claim_object(
    conn: &impl ConnectionTrait,
    run_id: i64,
    kind: ObjectKind,
) -> Result<bool, DbErr> {
    let result = sync_obj_run::Entity::update_many()
        .col_expr(
            sync_obj_run::Column::Status,
            Expr::value(ObjRunStatus::Running),
        )
        .col_expr(sync_obj_run::Column::UpdatedAt, Expr::value(fields::now()))
        .filter(sync_obj_run::Column::RunId.eq(run_id))
        .filter(sync_obj_run::Column::Resource.eq(kind.as_str()))
        .filter(sync_obj_run::Column::Status.eq(ObjRunStatus::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::db::connect_and_migrate;

    const ACCOUNT: &str = "acct_run_test";

    async fn setup() -> sea_orm::DatabaseConnection {
        let config = SyncConfig::new("sk_test", "sqlite::memory:");
        connect_and_migrate(&config).await.expect("test db")
    }

    #[tokio::test]
    async fn second_open_run_is_rejected_until_the_first_closes() {
        let db = setup().await;

        let run = open_run(&db, ACCOUNT, 4, Some("test".to_string()))
            .await
            .expect("first run");
        assert!(run.closed_at.is_none());

        let err = open_run(&db, ACCOUNT, 4, None).await.unwrap_err();
        assert!(matches!(err, SyncError::ConcurrentRun { ref account_id } if account_id == ACCOUNT));

        // A different account is unaffected.
        open_run(&db, "acct_other", 4, None).await.expect("other account");

        close_run(&db, run.id).await.expect("close");
        assert!(find_open_run(&db, ACCOUNT).await.unwrap().is_none());

        open_run(&db, ACCOUNT, 4, None).await.expect("after close");
    }

    #[tokio::test]
    async fn object_rows_are_claimed_exactly_once() {
        let db = setup().await;
        let run = open_run(&db, ACCOUNT, 4, None).await.expect("run");

        record_object(&db, run.id, ObjectKind::Customer, ObjRunStatus::Pending, 0, None)
            .await
            .expect("record");

        assert!(claim_object(&db, run.id, ObjectKind::Customer).await.unwrap());
        assert!(!claim_object(&db, run.id, ObjectKind::Customer).await.unwrap());

        record_object(
            &db,
            run.id,
            ObjectKind::Customer,
            ObjRunStatus::Done,
            42,
            None,
        )
        .await
        .expect("terminal record");

        let row = sync_obj_run::Entity::find_by_id((run.id, "customer".to_string()))
            .one(&db)
            .await
            .unwrap()
            .expect("row");
        assert_eq!(row.status, ObjRunStatus::Done);
        assert_eq!(row.processed_count, 42);
    }
}
