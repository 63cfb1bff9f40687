//! SyncRun entity - one row per `process_until_done` invocation.
//!
//! At most one row per account may have `closed_at IS NULL`; the partial
//! unique index `_sync_run_one_open` enforces it and a violation surfaces
//! as `SyncError::ConcurrentRun`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "_sync_run")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: String,
    pub started_at: DateTimeWithTimeZone,
    /// When every per-object run reached a terminal status.
    pub completed_at: Option<DateTimeWithTimeZone>,
    /// When the run was closed. NULL marks the run as active.
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub max_concurrent: i32,
    pub triggered_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sync_obj_run::Entity")]
    ObjectRuns,
}

impl Related<super::sync_obj_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ObjectRuns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
