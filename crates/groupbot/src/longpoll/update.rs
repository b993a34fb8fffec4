//! Decoded long-poll batches.

use groupbot_events::Event;
use serde_json::Value;

use crate::error::{Error, Result};

/// One successfully fetched batch of events.
///
/// Immutable once constructed; events keep their wire order.
#[derive(Debug, Clone)]
pub struct Update {
    ts: String,
    events: Vec<Event>,
}

impl Update {
    /// Decode a raw long-poll response body into a batch.
    pub fn parse(body: &Value) -> Result<Self> {
        let Some(object) = body.as_object() else {
            return Err(Error::protocol("long-poll body is not an object"));
        };
        let Some(updates) = object.get("updates") else {
            return Err(Error::protocol("updates field not found"));
        };
        let Some(items) = updates.as_array() else {
            return Err(Error::protocol("updates field is not an array"));
        };
        if items.is_empty() {
            return Err(Error::protocol("updates field zero length"));
        }

        let ts = object
            .get("ts")
            .and_then(cursor_string)
            .unwrap_or_default();

        let mut events = Vec::with_capacity(items.len());
        for item in items {
            let event = Event::parse(item.clone())
                .map_err(|err| Error::protocol_source("invalid event in update batch", err))?;
            events.push(event);
        }

        Ok(Self { ts, events })
    }

    /// The cursor carried by this batch.
    pub fn ts(&self) -> &str {
        &self.ts
    }

    /// The contained events, in wire order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consume the batch, keeping the wire order.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// The remote sends cursors as strings or bare numbers.
pub(crate) fn cursor_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
