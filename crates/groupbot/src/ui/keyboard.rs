//! Keyboard assembly.

use serde::{Deserialize, Serialize};

use super::Action;

/// Button colors understood by the client.
pub mod color {
    pub const PRIMARY: &str = "primary";
    pub const SECONDARY: &str = "secondary";
    pub const NEGATIVE: &str = "negative";
    pub const POSITIVE: &str = "positive";
}

/// One keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Button {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Button {
    /// A colored button.
    pub fn new(action: Action, color: impl Into<String>) -> Self {
        Self {
            action,
            color: Some(color.into()),
        }
    }

    /// A button without a color (links and locations ignore colors).
    pub fn plain(action: Action) -> Self {
        Self {
            action,
            color: None,
        }
    }
}

/// A bot keyboard: rows of buttons plus display flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyboard {
    /// Hide the keyboard after one use.
    pub one_time: bool,
    pub buttons: Vec<Vec<Button>>,
    /// Attach the keyboard to the message instead of the input field.
    pub inline: bool,
}

impl Keyboard {
    /// An empty keyboard.
    pub fn new(one_time: bool, inline: bool) -> Self {
        Self {
            one_time,
            buttons: Vec::new(),
            inline,
        }
    }

    /// Add one button on its own full-width row.
    pub fn add_button(&mut self, button: Button) {
        self.buttons.push(vec![button]);
    }

    /// Add a row of buttons.
    pub fn add_row(&mut self, buttons: Vec<Button>) {
        self.buttons.push(buttons);
    }

    /// The wire JSON for the `keyboard` request parameter.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
