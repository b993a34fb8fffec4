//! Error taxonomy for the framework.
//!
//! Each variant carries a human message; causes are chained through
//! `source()` and the `Api`/`Protocol` variants keep the offending JSON in
//! a `misc` bag for structured logging.

use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias for framework operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error for variants wrapping foreign failures.
type Source = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the polling engine, the API wrapper and the
/// dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Long-poll session acquisition or re-acquisition failed. Fatal for
    /// the current fetch; the update loop recovers on its next iteration.
    #[error("session error: {message}")]
    Session {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Network or request-construction failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Source>,
    },

    /// Malformed response body or missing expected fields.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        misc: Map<String, Value>,
        #[source]
        source: Option<Source>,
    },

    /// The retry budget of a single fetch cycle was spent.
    #[error("the maximum number of attempts has been exceeded ({attempts})")]
    Exhausted { attempts: u32 },

    /// Envelope-level API failure: an `error` object in the response, or
    /// no `response` at all.
    #[error("api error: {message}")]
    Api {
        message: String,
        misc: Map<String, Value>,
    },

    /// A user handler failed. Logged by the worker, never propagated.
    #[error("handler for '{event_type}' events failed: {message}")]
    Handler { event_type: String, message: String },

    /// Invalid framework configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// The update loop was asked to stop before it was started.
    #[error("update loop is not started")]
    NotStarted,
}

impl Error {
    /// Create a session error, optionally chaining the underlying cause.
    pub fn session(message: impl Into<String>, source: Option<Error>) -> Self {
        Error::Session {
            message: message.into(),
            source: source.map(Box::new),
        }
    }

    /// Create a transport error wrapping a foreign failure.
    pub fn transport(message: impl Into<String>, source: impl Into<Source>) -> Self {
        Error::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a protocol error with no extra context.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol {
            message: message.into(),
            misc: Map::new(),
            source: None,
        }
    }

    /// Create a protocol error keeping the offending payload.
    pub fn protocol_with(message: impl Into<String>, misc: Map<String, Value>) -> Self {
        Error::Protocol {
            message: message.into(),
            misc,
            source: None,
        }
    }

    /// Create a protocol error chaining the underlying parse failure.
    pub fn protocol_source(message: impl Into<String>, source: impl Into<Source>) -> Self {
        Error::Protocol {
            message: message.into(),
            misc: Map::new(),
            source: Some(source.into()),
        }
    }

    /// Create an envelope-level API error keeping the raw response.
    pub fn api(message: impl Into<String>, misc: Map<String, Value>) -> Self {
        Error::Api {
            message: message.into(),
            misc,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// The diagnostic bag attached to the error, if any.
    pub fn misc(&self) -> Option<&Map<String, Value>> {
        match self {
            Error::Protocol { misc, .. } | Error::Api { misc, .. } => Some(misc),
            _ => None,
        }
    }
}
