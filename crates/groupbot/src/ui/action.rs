//! Button actions.

use serde::{Deserialize, Serialize};

/// What pressing a button does, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Send the label back as a text message.
    Text { label: String, payload: String },
    /// Open an external link.
    OpenLink {
        link: String,
        label: String,
        payload: String,
    },
    /// Ask the user to share a location.
    Location { payload: String },
    /// Start a payment.
    #[serde(rename = "vkpay")]
    VkPay { hash: String, payload: String },
    /// Open a mini app.
    OpenApp {
        app_id: i64,
        owner_id: i64,
        label: String,
        hash: String,
        payload: String,
    },
    /// Raise a `message_event` callback instead of sending a message.
    Callback { label: String, payload: String },
}

impl Action {
    /// A text action.
    pub fn text(label: impl Into<String>) -> Self {
        Action::Text {
            label: label.into(),
            payload: "{}".into(),
        }
    }

    /// An open-link action.
    pub fn open_link(link: impl Into<String>, label: impl Into<String>) -> Self {
        Action::OpenLink {
            link: link.into(),
            label: label.into(),
            payload: "{}".into(),
        }
    }

    /// A location-request action.
    pub fn location() -> Self {
        Action::Location {
            payload: "{}".into(),
        }
    }

    /// A payment action.
    pub fn vkpay(hash: impl Into<String>) -> Self {
        Action::VkPay {
            hash: hash.into(),
            payload: "{}".into(),
        }
    }

    /// A mini-app action.
    pub fn open_app(app_id: i64, owner_id: i64, label: impl Into<String>) -> Self {
        Action::OpenApp {
            app_id,
            owner_id,
            label: label.into(),
            hash: String::new(),
            payload: "{}".into(),
        }
    }

    /// A callback action.
    pub fn callback(label: impl Into<String>) -> Self {
        Action::Callback {
            label: label.into(),
            payload: "{}".into(),
        }
    }

    /// Attach a payload, serialized to a JSON string.
    ///
    /// Falls back to `{}` when the payload cannot be serialized.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        let encoded = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        match &mut self {
            Action::Text { payload, .. }
            | Action::OpenLink { payload, .. }
            | Action::Location { payload }
            | Action::VkPay { payload, .. }
            | Action::OpenApp { payload, .. }
            | Action::Callback { payload, .. } => *payload = encoded,
        }
        self
    }

    /// The raw payload string.
    pub fn payload(&self) -> &str {
        match self {
            Action::Text { payload, .. }
            | Action::OpenLink { payload, .. }
            | Action::Location { payload }
            | Action::VkPay { payload, .. }
            | Action::OpenApp { payload, .. }
            | Action::Callback { payload, .. } => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_action_wire_shape() {
        let action = Action::text("button 1").with_payload(&json!({"cmd": "button 1"}));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "text",
                "label": "button 1",
                "payload": "{\"cmd\":\"button 1\"}",
            })
        );
    }

    #[test]
    fn test_vkpay_tag() {
        let action = Action::vkpay("action=transfer-to-group");
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "vkpay");
    }

    #[test]
    fn test_default_payload_is_empty_object() {
        assert_eq!(Action::callback("go").payload(), "{}");
        assert_eq!(Action::location().payload(), "{}");
    }
}
