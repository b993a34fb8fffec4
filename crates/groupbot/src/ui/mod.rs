//! Keyboard and button builders.
//!
//! Pure data assembly: the structures here serialize to the wire JSON
//! shape the messaging API expects in the `keyboard` parameter.

mod action;
mod keyboard;

pub use action::Action;
pub use keyboard::{color, Button, Keyboard};
