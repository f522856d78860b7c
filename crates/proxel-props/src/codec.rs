//! Attribute text encoding.
//!
//! Both directions are keyed by the [`PropKind`] of the property's default,
//! never by the incoming value. Neither direction fails: malformed JSON
//! decodes to the raw string and unserialisable values encode to their
//! plain text.

use serde_json::Value;

use crate::value::{PropKind, PropValue, canonical_json};

/// Attribute text for `value` under the coercion rule `kind`.
#[must_use]
pub fn encode(kind: PropKind, value: &PropValue) -> String {
    match kind {
        PropKind::Text => value.to_string(),
        PropKind::Flag => {
            if value.is_truthy() {
                String::new()
            } else {
                "false".to_owned()
            }
        }
        PropKind::Data => serde_json::to_string(&canonical_json(value.to_json()))
            .unwrap_or_else(|err| {
                tracing::debug!(%err, "property value is not serialisable, writing raw text");
                value.to_string()
            }),
    }
}

/// Property value for attribute text `raw` under the coercion rule `kind`.
#[must_use]
pub fn decode(kind: PropKind, raw: &str) -> PropValue {
    match kind {
        PropKind::Text => PropValue::Text(raw.to_owned()),
        PropKind::Flag => PropValue::Flag(raw != "0" && raw != "false"),
        PropKind::Data => match serde_json::from_str::<Value>(raw) {
            Ok(value) => PropValue::Data(canonical_json(value)),
            Err(_) => PropValue::Data(Value::String(raw.to_owned())),
        },
    }
}
