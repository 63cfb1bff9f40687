//! SyncStatus entity - one backfill cursor per `(resource, account_id)`.
//!
//! `last_synced_object_id = NULL` means the resource has never been synced
//! for that account; otherwise it is the `starting_after` resume point for
//! the next page. The composite primary key is what makes the cursor unique
//! per resource and account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "_sync_status")]
pub struct Model {
    /// Object kind string (e.g. `customer`).
    #[sea_orm(primary_key, auto_increment = false)]
    pub resource: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    /// Resume point for pagination. Doubles as a progress indicator.
    pub last_synced_object_id: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
