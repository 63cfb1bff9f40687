//! The backfill engine: cursor-driven page processing per object kind, and
//! the run driver that takes every kind to a terminal state.
//!
//! One page is the unit of work. `process_next` claims the cursor, fetches
//! one page, projects it, and advances; everything it writes is idempotent,
//! so a crash mid-page only costs a refetch. `process_until_done` layers run
//! bookkeeping and bounded concurrency on top.

use std::collections::BTreeSet;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::Semaphore;

use crate::account;
use crate::entity::object_kind::{BACKFILL_ORDER, ObjectKind};
use crate::entity::sync_obj_run::ObjRunStatus;
use crate::error::SyncError;
use crate::project::{self, ProjectOptions};
use crate::stripe::{ListParams, StripeClient};

use super::cursor;
use super::run;
use super::types::{BackfillParams, BackfillSummary, KindOutcome, ProcessNext};

/// Everything a backfill worker needs, cloneable into spawned tasks.
#[derive(Clone)]
pub(crate) struct BackfillContext {
    pub db: DatabaseConnection,
    pub client: StripeClient,
    pub account_id: String,
    pub page_limit: u64,
    pub auto_expand_lists: bool,
    pub backfill_related_entities: bool,
    pub max_concurrent: usize,
}

impl BackfillContext {
    fn project_options(&self) -> ProjectOptions {
        ProjectOptions {
            auto_expand_lists: self.auto_expand_lists,
        }
    }
}

/// Fetch, project, and advance one page of `kind`.
///
/// Resumes from the stored cursor (`starting_after`); a null cursor starts
/// from the beginning. The cursor only advances after every object on the
/// page has been projected, so a partially applied page is refetched and
/// reapplied idempotently on the next call.
#[tracing::instrument(skip(ctx), fields(account_id = %ctx.account_id, kind = %kind))]
pub(crate) async fn process_next(
    ctx: &BackfillContext,
    kind: ObjectKind,
    created_gte: Option<i64>,
) -> Result<ProcessNext, SyncError> {
    account::ensure_account(&ctx.db, &ctx.account_id).await?;
    cursor::ensure(&ctx.db, kind, &ctx.account_id).await?;
    let current = cursor::get(&ctx.db, kind, &ctx.account_id).await?;

    let page = ctx
        .client
        .list(
            kind,
            &ListParams {
                starting_after: current.clone(),
                created_gte,
                limit: ctx.page_limit,
            },
        )
        .await?;

    let options = ctx.project_options();
    let mut processed = 0u64;
    for obj in &page.data {
        project::project(&ctx.db, &ctx.account_id, kind, obj, options).await?;
        processed += 1;
    }

    if let Some(last) = page.last_id() {
        let advanced =
            cursor::advance(&ctx.db, kind, &ctx.account_id, current.as_deref(), last).await?;
        if !advanced {
            // Another worker moved the cursor past us; our writes were
            // idempotent duplicates of its page.
            tracing::warn!(kind = %kind, "Cursor was advanced concurrently, page reapplied");
        }
    }

    tracing::debug!(kind = %kind, processed, has_more = page.has_more, "Processed page");

    Ok(ProcessNext {
        has_more: page.has_more && !page.data.is_empty(),
        processed,
    })
}

/// Drive every selected kind to a terminal state under one sync run.
///
/// Opens the run (failing with `ConcurrentRun` if one is already open for
/// the account), seeds per-kind bookkeeping rows, then advances kinds in
/// dependency order with at most `max_concurrent` in flight.
#[tracing::instrument(skip(ctx, params), fields(account_id = %ctx.account_id))]
pub(crate) async fn process_until_done(
    ctx: &BackfillContext,
    params: &BackfillParams,
) -> Result<BackfillSummary, SyncError> {
    account::ensure_account(&ctx.db, &ctx.account_id).await?;
    let kinds = select_kinds(ctx, params).await?;

    let run = run::open_run(
        &ctx.db,
        &ctx.account_id,
        ctx.max_concurrent as i32,
        params.triggered_by.clone(),
    )
    .await?;

    for kind in &kinds {
        run::record_object(&ctx.db, run.id, *kind, ObjRunStatus::Pending, 0, None).await?;
    }

    // Tasks are spawned in dependency order; the semaphore bounds how many
    // kinds advance at once.
    let semaphore = Arc::new(Semaphore::new(ctx.max_concurrent));
    let handles: Vec<_> = kinds
        .iter()
        .map(|kind| {
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let kind = *kind;
            let created_gte = params.created_gte;
            let run_id = run.id;
            tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return KindOutcome { synced: 0, errors: 1 },
                };
                drive_kind(&ctx, run_id, kind, created_gte).await
            })
        })
        .collect();

    let mut summary = BackfillSummary::new();
    for (kind, handle) in kinds.iter().zip(handles) {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                tracing::error!(kind = %kind, error = %join_err, "Backfill task panicked");
                if let Err(record_err) = run::record_object(
                    &ctx.db,
                    run.id,
                    *kind,
                    ObjRunStatus::Error,
                    0,
                    Some(format!("task panic: {}", join_err)),
                )
                .await
                {
                    tracing::warn!(error = %record_err, "Failed to record panic outcome");
                }
                KindOutcome { synced: 0, errors: 1 }
            }
        };
        summary.insert(*kind, outcome);
    }

    run::close_run(&ctx.db, run.id).await?;

    Ok(summary)
}

/// Take one kind from claimed to terminal, one page at a time.
async fn drive_kind(
    ctx: &BackfillContext,
    run_id: i64,
    kind: ObjectKind,
    created_gte: Option<i64>,
) -> KindOutcome {
    match run::claim_object(&ctx.db, run_id, kind).await {
        Ok(true) => {}
        Ok(false) => {
            // Another worker is already driving this kind.
            tracing::debug!(kind = %kind, "Kind already claimed, skipping");
            return KindOutcome { synced: 0, errors: 0 };
        }
        Err(err) => {
            tracing::error!(kind = %kind, error = %err, "Failed to claim kind");
            return KindOutcome { synced: 0, errors: 1 };
        }
    }

    let mut synced = 0u64;
    loop {
        match process_next(ctx, kind, created_gte).await {
            Ok(step) => {
                synced += step.processed;
                if let Err(err) = run::record_object(
                    &ctx.db,
                    run_id,
                    kind,
                    ObjRunStatus::Running,
                    synced as i64,
                    None,
                )
                .await
                {
                    tracing::warn!(kind = %kind, error = %err, "Failed to record progress");
                }
                if !step.has_more {
                    break;
                }
            }
            Err(err) => {
                tracing::error!(kind = %kind, error = %err, "Backfill failed for kind");
                if let Err(record_err) = run::record_object(
                    &ctx.db,
                    run_id,
                    kind,
                    ObjRunStatus::Error,
                    synced as i64,
                    Some(err.to_string()),
                )
                .await
                {
                    tracing::warn!(error = %record_err, "Failed to record error outcome");
                }
                return KindOutcome { synced, errors: 1 };
            }
        }
    }

    if let Err(err) =
        run::record_object(&ctx.db, run_id, kind, ObjRunStatus::Done, synced as i64, None).await
    {
        tracing::warn!(kind = %kind, error = %err, "Failed to record completion");
    }
    KindOutcome { synced, errors: 0 }
}

/// Resolve the kind set for a run, in dependency order.
///
/// With `backfill_related_entities`, a single-kind run pulls in referenced
/// kinds that have never been synced for this account.
async fn select_kinds(
    ctx: &BackfillContext,
    params: &BackfillParams,
) -> Result<Vec<ObjectKind>, SyncError> {
    let Some(kind) = params.object else {
        return Ok(BACKFILL_ORDER.to_vec());
    };

    let mut selected: BTreeSet<ObjectKind> = BTreeSet::new();
    selected.insert(kind);

    if ctx.backfill_related_entities {
        for related in kind.related_kinds() {
            if cursor::get(&ctx.db, *related, &ctx.account_id).await?.is_none() {
                selected.insert(*related);
            }
        }
    }

    Ok(BACKFILL_ORDER
        .iter()
        .copied()
        .filter(|candidate| selected.contains(candidate))
        .collect())
}
