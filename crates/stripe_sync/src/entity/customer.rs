//! Customer entity - mirror rows for Stripe customers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One mirrored customer per `(account_id, id)`.
///
/// Like every mirror table, this projects a handful of frequently queried
/// fields into typed columns and keeps the full payload in `raw`. A row with
/// `raw = NULL` is a stub written to satisfy a child reference before the
/// customer's own payload arrived.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Stripe object id (`cus_...`).
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning Stripe account.
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    pub object: Option<String>,
    pub created: Option<DateTimeWithTimeZone>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub balance: Option<i64>,
    pub delinquent: Option<bool>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw: Option<Json>,
    /// Soft tombstone; set when the provider reports the object deleted.
    pub deleted: bool,
    pub last_synced_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when this row is a stub written only to satisfy a reference.
    pub fn is_stub(&self) -> bool {
        self.raw.is_none()
    }
}
