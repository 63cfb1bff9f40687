//! Shared sync types and constants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::object_kind::ObjectKind;

/// Result of advancing one page for one object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessNext {
    /// Whether more pages remain after this one.
    pub has_more: bool,
    /// Objects projected from this page.
    pub processed: u64,
}

/// Outcome of one object kind within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindOutcome {
    pub synced: u64,
    pub errors: u64,
}

/// Per-kind outcomes of one `process_until_done` invocation.
pub type BackfillSummary = BTreeMap<ObjectKind, KindOutcome>;

/// Parameters for `process_until_done`.
#[derive(Debug, Clone, Default)]
pub struct BackfillParams {
    /// Restrict the run to one kind; `None` backfills every kind in
    /// dependency order.
    pub object: Option<ObjectKind>,
    /// Only objects created at or after this Unix timestamp.
    pub created_gte: Option<i64>,
    /// Free-form label recorded on the run row.
    pub triggered_by: Option<String>,
}
