//! The event envelope and its shape validation.

use serde_json::{Map, Value};

use crate::types;

/// Errors produced while validating a raw update object.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The raw update is not a JSON object.
    #[error("event is not a json object")]
    NotAnObject,

    /// A required field is missing or has the wrong JSON type.
    #[error("event invalid '{0}' field")]
    InvalidField(&'static str),

    /// The `type` field names an event the parser does not handle.
    #[error("not supported event type '{0}'")]
    UnsupportedType(String),
}

/// An immutable event envelope.
///
/// Constructed only through [`Event::parse`], which guarantees every field
/// below was present and well-typed in the raw update object.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: String,
    object: Map<String, Value>,
    group_id: i64,
    event_id: String,
}

impl Event {
    /// Validate a raw update object and build the envelope.
    ///
    /// Requires `type` (string), `object` (object), `group_id` (integer)
    /// and `event_id` (string); the `type` must be one of the supported
    /// message-family types.
    pub fn parse(value: Value) -> Result<Self, EventError> {
        let Value::Object(mut data) = value else {
            return Err(EventError::NotAnObject);
        };

        let event_type = match data.get("type") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(EventError::InvalidField("type")),
        };
        if !data.get("object").map(Value::is_object).unwrap_or(false) {
            return Err(EventError::InvalidField("object"));
        }
        let group_id = match data.get("group_id").and_then(Value::as_i64) {
            Some(id) => id,
            None => return Err(EventError::InvalidField("group_id")),
        };
        let event_id = match data.get("event_id") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(EventError::InvalidField("event_id")),
        };
        if !types::is_supported(&event_type) {
            return Err(EventError::UnsupportedType(event_type));
        }

        let object = match data.remove("object") {
            Some(Value::Object(object)) => object,
            // Checked above.
            _ => return Err(EventError::InvalidField("object")),
        };

        Ok(Self {
            event_type,
            object,
            group_id,
            event_id,
        })
    }

    /// The event type string, e.g. `message_new`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The type-specific payload object.
    pub fn object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// The community the event originated from.
    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    /// The remote-assigned event identifier.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_event() -> Value {
        json!({
            "type": "message_new",
            "object": {"message": {"text": "hi"}},
            "group_id": 42,
            "event_id": "abc123",
        })
    }

    #[test]
    fn test_parse_valid_event() {
        let event = Event::parse(raw_event()).unwrap();
        assert_eq!(event.event_type(), "message_new");
        assert_eq!(event.group_id(), 42);
        assert_eq!(event.event_id(), "abc123");
        assert!(event.object().contains_key("message"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            Event::parse(json!([1, 2, 3])),
            Err(EventError::NotAnObject)
        ));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        for field in ["type", "object", "group_id", "event_id"] {
            let mut raw = raw_event();
            raw.as_object_mut().unwrap().remove(field);
            let err = Event::parse(raw).unwrap_err();
            assert!(
                matches!(err, EventError::InvalidField(f) if f == field),
                "unexpected error for missing '{field}': {err}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_wrong_field_types() {
        let mut raw = raw_event();
        raw["group_id"] = json!("42");
        assert!(matches!(
            Event::parse(raw),
            Err(EventError::InvalidField("group_id"))
        ));

        let mut raw = raw_event();
        raw["object"] = json!("not an object");
        assert!(matches!(
            Event::parse(raw),
            Err(EventError::InvalidField("object"))
        ));
    }

    #[test]
    fn test_parse_rejects_unsupported_type() {
        let mut raw = raw_event();
        raw.as_object_mut().unwrap()["type"] = json!("wall_post_new");
        let err = Event::parse(raw).unwrap_err();
        assert!(matches!(err, EventError::UnsupportedType(t) if t == "wall_post_new"));
    }
}
