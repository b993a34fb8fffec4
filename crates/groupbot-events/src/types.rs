//! Event types accepted by the envelope parser.

/// A new incoming message.
pub const MESSAGE_NEW: &str = "message_new";
/// An outgoing message sent by the community.
pub const MESSAGE_REPLY: &str = "message_reply";
/// An existing message was edited.
pub const MESSAGE_EDIT: &str = "message_edit";
/// A user allowed messages from the community.
pub const MESSAGE_ALLOW: &str = "message_allow";
/// A user forbade messages from the community.
pub const MESSAGE_DENY: &str = "message_deny";
/// A user started typing.
pub const MESSAGE_TYPING_STATE: &str = "message_typing_state";
/// A callback button was pressed.
pub const MESSAGE_EVENT: &str = "message_event";

/// Every event type the parser accepts; anything else is rejected as
/// unsupported.
pub const SUPPORTED: &[&str] = &[
    MESSAGE_NEW,
    MESSAGE_REPLY,
    MESSAGE_EDIT,
    MESSAGE_ALLOW,
    MESSAGE_DENY,
    MESSAGE_TYPING_STATE,
    MESSAGE_EVENT,
];

/// Check whether `event_type` is one of the supported types.
pub fn is_supported(event_type: &str) -> bool {
    SUPPORTED.contains(&event_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types() {
        assert!(is_supported(MESSAGE_NEW));
        assert!(is_supported(MESSAGE_EVENT));
        assert!(!is_supported("wall_post_new"));
        assert!(!is_supported(""));
    }
}
