//! Account entity - one row per credentialed Stripe account.
//!
//! Rows are created lazily on first observation from either backfill or a
//! webhook. A row observed only through `event.account` starts as a stub
//! (id only); the remaining columns are filled once the account payload is
//! retrieved or an `account.updated` event lands.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account model - the isolation root every mirror row hangs off.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Stripe account id (`acct_...`).
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub object: Option<String>,
    pub created: Option<DateTimeWithTimeZone>,
    pub business_type: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
    /// Full provider payload. Null until the account itself has been fetched.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw: Option<Json>,
    pub deleted: bool,
    pub last_synced_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
