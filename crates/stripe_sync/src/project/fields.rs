//! Helpers for pulling typed column values out of raw provider payloads.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value;

use crate::entity::object_kind::ObjectKind;
use crate::error::SyncError;

/// The payload's string id, or a projection error naming the kind.
pub(crate) fn require_id(kind: ObjectKind, obj: &Value) -> Result<String, SyncError> {
    obj.get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| SyncError::projection(kind, "<missing>", "payload has no string id"))
}

pub(crate) fn str_field(obj: &Value, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(String::from)
}

pub(crate) fn i64_field(obj: &Value, name: &str) -> Option<i64> {
    obj.get(name).and_then(Value::as_i64)
}

pub(crate) fn bool_field(obj: &Value, name: &str) -> Option<bool> {
    obj.get(name).and_then(Value::as_bool)
}

/// Unix-seconds field as a timezone-aware timestamp.
pub(crate) fn ts_field(obj: &Value, name: &str) -> Option<DateTimeWithTimeZone> {
    i64_field(obj, name)
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.fixed_offset())
}

/// A reference field that may be either a bare id string or an expanded
/// object carrying its own `id`.
pub(crate) fn ref_id(obj: &Value, name: &str) -> Option<String> {
    match obj.get(name)? {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

pub(crate) fn metadata(obj: &Value) -> Option<Value> {
    obj.get("metadata").cloned().filter(|v| !v.is_null())
}

/// Whether the provider marked the payload deleted.
pub(crate) fn is_deleted(obj: &Value) -> bool {
    bool_field(obj, "deleted").unwrap_or(false)
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ref_id_handles_bare_and_expanded_references() {
        let obj = json!({
            "customer": "cus_1",
            "default_payment_method": {"id": "pm_1", "object": "payment_method"},
            "invoice": null,
            "amount": 5,
        });
        assert_eq!(ref_id(&obj, "customer").as_deref(), Some("cus_1"));
        assert_eq!(ref_id(&obj, "default_payment_method").as_deref(), Some("pm_1"));
        assert_eq!(ref_id(&obj, "invoice"), None);
        assert_eq!(ref_id(&obj, "amount"), None);
        assert_eq!(ref_id(&obj, "missing"), None);
    }

    #[test]
    fn ts_field_converts_epoch_seconds() {
        let obj = json!({"created": 1_700_000_000});
        let ts = ts_field(&obj, "created").expect("timestamp");
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts_field(&obj, "missing"), None);
    }

    #[test]
    fn require_id_reports_the_kind_on_failure() {
        let err = require_id(ObjectKind::Invoice, &json!({"object": "invoice"})).unwrap_err();
        assert!(err.to_string().contains("invoice"));
        assert_eq!(
            require_id(ObjectKind::Invoice, &json!({"id": "in_1"})).unwrap(),
            "in_1"
        );
    }

    #[test]
    fn null_metadata_is_dropped() {
        assert_eq!(metadata(&json!({"metadata": null})), None);
        assert_eq!(
            metadata(&json!({"metadata": {"plan": "pro"}})),
            Some(json!({"plan": "pro"}))
        );
    }
}
