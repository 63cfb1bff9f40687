//! Backfill cursors in `_sync_status`.
//!
//! A cursor only moves forward from the value the caller read: `advance`
//! carries the expected current value and refuses to write over a cursor
//! someone else moved. Combined with projector idempotence this makes page
//! processing safe to repeat after a crash mid-page.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entity::object_kind::ObjectKind;
use crate::entity::sync_status::{ActiveModel, Column, Entity as SyncStatus};
use crate::project::fields;

/// Make sure a cursor row exists; a fresh row carries a null resume point.
pub(crate) async fn ensure(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
) -> Result<(), DbErr> {
    let model = ActiveModel {
        resource: Set(kind.as_str().to_string()),
        account_id: Set(account_id.to_string()),
        last_synced_object_id: Set(None),
        updated_at: Set(fields::now()),
    };
    SyncStatus::insert(model)
        .on_conflict(
            OnConflict::columns([Column::Resource, Column::AccountId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// The current resume point. `None` means never synced (row absent or null).
pub(crate) async fn get(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
) -> Result<Option<String>, DbErr> {
    let row = SyncStatus::find()
        .filter(Column::Resource.eq(kind.as_str()))
        .filter(Column::AccountId.eq(account_id))
        .one(conn)
        .await?;
    Ok(row.and_then(|r| r.last_synced_object_id))
}

/// Advance the cursor from `from` to `to`.
///
/// Returns `false` without writing when the stored value no longer equals
/// `from`, i.e. another worker advanced it first.
pub(crate) async fn advance(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
    from: Option<&str>,
    to: &str,
) -> Result<bool, DbErr> {
    let mut update = SyncStatus::update_many()
        .col_expr(Column::LastSyncedObjectId, Expr::value(to))
        .col_expr(Column::UpdatedAt, Expr::value(fields::now()))
        .filter(Column::Resource.eq(kind.as_str()))
        .filter(Column::AccountId.eq(account_id));
    update = match from {
        Some(expected) => update.filter(Column::LastSyncedObjectId.eq(expected)),
        None => update.filter(Column::LastSyncedObjectId.is_null()),
    };

    let result = update.exec(conn).await?;
    Ok(result.rows_affected == 1)
}

/// Forget the cursor entirely (administrative reset).
pub(crate) async fn reset(
    conn: &impl ConnectionTrait,
    kind: ObjectKind,
    account_id: &str,
) -> Result<(), DbErr> {
    SyncStatus::delete_many()
        .filter(Column::Resource.eq(kind.as_str()))
        .filter(Column::AccountId.eq(account_id))
        .exec(conn)
        .await?;
    Ok(())
}
