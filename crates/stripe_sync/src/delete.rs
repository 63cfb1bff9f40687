//! Administrative account deletion: every mirror row, cursor, run, and
//! managed-webhook row for one account.
//!
//! This is the only code path that hard-deletes mirrored data, hence the
//! name. The provider side is untouched; managed webhook endpoints must be
//! deleted separately if desired.

use std::collections::BTreeMap;

use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::entity::object_kind::{BACKFILL_ORDER, ObjectKind};
use crate::entity::prelude::{
    Account, AccountColumn, ManagedWebhook, ManagedWebhookColumn, SyncObjRun, SyncObjRunColumn,
    SyncRun, SyncRunColumn, SyncStatus, SyncStatusColumn,
};
use crate::error::SyncError;

/// Options for [`dangerously_delete_account`].
#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    /// Count affected rows without deleting anything.
    pub dry_run: bool,
    /// Run all deletions in one transaction: either every row for the
    /// account goes, or none do.
    pub use_transaction: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            use_transaction: true,
        }
    }
}

/// Per-table row counts removed (or, under `dry_run`, that would be).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted_rows: BTreeMap<String, u64>,
}

impl DeleteReport {
    /// Total rows across all tables.
    pub fn total(&self) -> u64 {
        self.deleted_rows.values().sum()
    }
}

pub(crate) async fn dangerously_delete_account(
    db: &DatabaseConnection,
    account_id: &str,
    options: DeleteOptions,
) -> Result<DeleteReport, SyncError> {
    tracing::warn!(
        account_id = %account_id,
        dry_run = options.dry_run,
        "Deleting all mirrored state for account"
    );

    if options.use_transaction && !options.dry_run {
        let txn = db.begin().await?;
        let report = delete_all(&txn, account_id, false).await?;
        txn.commit().await?;
        Ok(report)
    } else {
        delete_all(db, account_id, options.dry_run).await
    }
}

async fn delete_all(
    conn: &impl ConnectionTrait,
    account_id: &str,
    dry_run: bool,
) -> Result<DeleteReport, SyncError> {
    let mut report = DeleteReport::default();

    // Mirror tables first; the accounts row goes last so foreign keys hold
    // throughout.
    for kind in BACKFILL_ORDER
        .iter()
        .chain([ObjectKind::SubscriptionItem].iter())
    {
        let table = kind.table_name();
        let count = mirror_rows(conn, table, account_id, dry_run).await?;
        report.deleted_rows.insert(table.to_string(), count);
    }

    // _sync_obj_run has no account column; go through the account's runs.
    let run_ids: Vec<i64> = SyncRun::find()
        .filter(SyncRunColumn::AccountId.eq(account_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|run| run.id)
        .collect();

    let obj_runs = if run_ids.is_empty() {
        0
    } else if dry_run {
        SyncObjRun::find()
            .filter(SyncObjRunColumn::RunId.is_in(run_ids.clone()))
            .count(conn)
            .await?
    } else {
        SyncObjRun::delete_many()
            .filter(SyncObjRunColumn::RunId.is_in(run_ids.clone()))
            .exec(conn)
            .await?
            .rows_affected
    };
    report.deleted_rows.insert("_sync_obj_run".to_string(), obj_runs);

    let runs = if dry_run {
        SyncRun::find()
            .filter(SyncRunColumn::AccountId.eq(account_id))
            .count(conn)
            .await?
    } else {
        SyncRun::delete_many()
            .filter(SyncRunColumn::AccountId.eq(account_id))
            .exec(conn)
            .await?
            .rows_affected
    };
    report.deleted_rows.insert("_sync_run".to_string(), runs);

    let cursors = if dry_run {
        SyncStatus::find()
            .filter(SyncStatusColumn::AccountId.eq(account_id))
            .count(conn)
            .await?
    } else {
        SyncStatus::delete_many()
            .filter(SyncStatusColumn::AccountId.eq(account_id))
            .exec(conn)
            .await?
            .rows_affected
    };
    report.deleted_rows.insert("_sync_status".to_string(), cursors);

    let webhooks = if dry_run {
        ManagedWebhook::find()
            .filter(ManagedWebhookColumn::AccountId.eq(account_id))
            .count(conn)
            .await?
    } else {
        ManagedWebhook::delete_many()
            .filter(ManagedWebhookColumn::AccountId.eq(account_id))
            .exec(conn)
            .await?
            .rows_affected
    };
    report
        .deleted_rows
        .insert("_managed_webhooks".to_string(), webhooks);

    let accounts = if dry_run {
        Account::find()
            .filter(AccountColumn::Id.eq(account_id))
            .count(conn)
            .await?
    } else {
        Account::delete_many()
            .filter(AccountColumn::Id.eq(account_id))
            .exec(conn)
            .await?
            .rows_affected
    };
    report.deleted_rows.insert("accounts".to_string(), accounts);

    Ok(report)
}

/// Count or delete one mirror table's rows for the account.
///
/// Mirror tables are addressed by name (they all share the spine), so this
/// builds the statement dynamically instead of going through each entity.
async fn mirror_rows(
    conn: &impl ConnectionTrait,
    table: &str,
    account_id: &str,
    dry_run: bool,
) -> Result<u64, DbErr> {
    let backend = conn.get_database_backend();

    if dry_run {
        let stmt = Query::select()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("cnt"))
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new("account_id")).eq(account_id))
            .to_owned();
        let row = conn.query_one(backend.build(&stmt)).await?;
        let count: i64 = match row {
            Some(row) => row.try_get("", "cnt")?,
            None => 0,
        };
        Ok(count as u64)
    } else {
        let stmt = Query::delete()
            .from_table(Alias::new(table))
            .and_where(Expr::col(Alias::new("account_id")).eq(account_id))
            .to_owned();
        let result = conn.execute(backend.build(&stmt)).await?;
        Ok(result.rows_affected())
    }
}
