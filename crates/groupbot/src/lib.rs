//! # groupbot
//!
//! A community bot framework over a VK-compatible Bots Long Poll API.
//!
//! ## Features
//!
//! - **Resilient polling engine**: session re-acquire on desync, bounded
//!   retries, a failure-burst circuit breaker and a token-bucket rate gate
//! - **Pull-based dispatch**: a bounded pool of concurrent async handlers
//!   with backpressure-safe hand-off and non-blocking admission
//! - **Typed events**: validated envelopes for the message event family
//! - **UI builders**: keyboards and button actions as plain data
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐ updates ┌──────────┐ events ┌────────────┐
//! │ LongPollServer │ ──────► │ Bot pump │ ─────► │ Dispatcher │
//! └────────────────┘         └──────────┘        └─────┬──────┘
//!         ▲                                           ▼
//!         │                                 [worker] [worker] ...
//!         └───────────── one cancellation signal ──────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use groupbot::prelude::*;
//!
//! let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(token)?);
//! let server = LongPollServer::new(Arc::clone(&api), group_id)?;
//!
//! let mut bot = Bot::new(api, server);
//! bot.event_handler("message_new", |event| async move {
//!     // react to the message
//!     Ok(())
//! });
//!
//! bot.init().await?;
//! bot.run().await?;
//! ```

pub mod api;
pub mod bot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod limiter;
pub mod longpoll;
pub mod params;
pub mod telemetry;
pub mod ui;

pub use groupbot_events as events;

// Re-export key types at crate root
pub use api::{ApiClient, HttpApiClient};
pub use bot::{Bot, HandlerError};
pub use config::BotConfig;
pub use error::{Error, Result};
pub use limiter::RateLimiter;
pub use longpoll::{LongPollConfig, LongPollServer, Update};
pub use params::{ParamValue, Params};

/// Prelude for common imports
pub mod prelude {
    pub use crate::api::{ApiClient, HttpApiClient};
    pub use crate::bot::{Bot, HandlerError};
    pub use crate::config::BotConfig;
    pub use crate::error::{Error, Result};
    pub use crate::limiter::RateLimiter;
    pub use crate::longpoll::{DefaultHooks, Hooks, LongPollConfig, LongPollServer, Update};
    pub use crate::params::Params;
    pub use crate::ui::{Action, Button, Keyboard};
    pub use groupbot_events::Event;
}
