//! Typed envelopes for the slice of the Stripe API surface the engine uses.
//!
//! Mirror payloads stay as `serde_json::Value`; only the envelopes the
//! engine dispatches on (pages, events, endpoints, the account) get typed
//! structs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
}

impl Page {
    /// Id of the last object on the page, i.e. the next `starting_after`.
    pub fn last_id(&self) -> Option<&str> {
        self.data.last().and_then(|obj| obj.get("id")).and_then(Value::as_str)
    }
}

/// The acting Stripe account, as returned by `GET /v1/account`.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    /// Full payload, kept for projection into the accounts table.
    #[serde(flatten)]
    pub rest: Value,
}

impl Account {
    /// Reassemble the complete payload including the id.
    pub fn payload(&self) -> Value {
        let mut obj = self.rest.clone();
        if let Value::Object(map) = &mut obj {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        obj
    }
}

/// A provider-side webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub enabled_events: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Signing secret. Only present in the create response.
    #[serde(default)]
    pub secret: Option<String>,
}

impl WebhookEndpoint {
    /// Whether this endpoint carries our ownership marker.
    pub fn is_managed(&self) -> bool {
        self.metadata.get("managed_by").map(String::as_str) == Some(crate::endpoints::MANAGED_BY)
    }
}

/// A verified webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Set when the event was delivered to a platform (Connect) handler on
    /// behalf of a connected account.
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
    #[serde(default)]
    pub previous_attributes: Option<Value>,
}
