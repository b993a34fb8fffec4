//! Typed event envelopes for the long-poll update stream.
//!
//! A raw update object coming off the wire is an untyped JSON value. This
//! crate validates its shape once, up front, and hands the rest of the
//! framework an immutable [`Event`] with typed accessors. Parsing is the
//! only operation; there is no I/O here.

mod envelope;
pub mod types;

pub use envelope::{Event, EventError};
