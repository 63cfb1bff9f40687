//! stripe-sync - continuously mirrors a Stripe account's object graph into
//! a relational database.
//!
//! Two coordinated ingestion paths keep the mirror eventually consistent:
//! a restartable, cursor-driven **backfill** over the paginated list API,
//! and a **webhook pipeline** that verifies, resolves, and applies pushed
//! events. Both paths share the per-kind projectors and the per-account
//! partitioning, so they can interleave freely.
//!
//! # Example
//!
//! ```ignore
//! use stripe_sync::{BackfillParams, SyncConfig, SyncEngine};
//!
//! let config = SyncConfig::new(secret_key, "postgres:///payments")
//!     .webhook_secret(webhook_secret);
//! let engine = SyncEngine::connect(config).await?;
//!
//! // Historical backfill, resumable across restarts.
//! let summary = engine.process_until_done(BackfillParams::default()).await?;
//!
//! // Live path, called from the HTTP handler receiving deliveries.
//! engine.process_webhook(&body, &signature_header).await?;
//! ```

pub mod account;
pub mod config;
pub mod db;
pub mod delete;
pub mod endpoints;
pub mod engine;
pub mod entity;
pub mod error;
pub mod http;
pub mod migration;
pub mod stripe;
pub mod sync;

mod project;
mod webhook;

pub use account::AccountResolver;
pub use config::{ConfigError, SyncConfig};
pub use db::{connect, connect_and_migrate};
pub use delete::{DeleteOptions, DeleteReport};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use entity::prelude::*;
pub use error::SyncError;
pub use stripe::{StripeClient, StripeError};
pub use sync::{BackfillParams, BackfillSummary, KindOutcome, ProcessNext};
