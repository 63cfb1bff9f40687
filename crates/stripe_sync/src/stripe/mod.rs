//! Provider client: typed wrapper over the Stripe REST API.

pub mod client;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::{
    DEFAULT_BASE_URL, ListParams, RetryConfig, StripeClient, WebhookEndpointParams,
};
pub use error::{Result, StripeError};
pub use types::{Account, Event, EventData, Page, WebhookEndpoint};
pub use webhook::{SIGNATURE_TOLERANCE_SECS, construct_event, signature_header};
