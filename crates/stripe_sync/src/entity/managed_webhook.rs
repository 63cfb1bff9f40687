//! ManagedWebhook entity - provider-side endpoints this engine owns.
//!
//! A row here claims ownership of the provider endpoint with the same id;
//! ownership is reconciled against the provider (metadata
//! `managed_by = "stripe-sync"`), never assumed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "_managed_webhooks")]
pub struct Model {
    /// Provider-side webhook endpoint id (`we_...`).
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub url: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub enabled_events: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
