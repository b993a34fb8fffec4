//! Resilient long-poll polling engine.
//!
//! This module provides:
//! - [`LongPollServer`] - session management and the update production loop
//! - [`Overheater`] - failure-burst circuit breaker
//! - [`Hooks`] - injectable loop policies with [`DefaultHooks`] production defaults
//! - [`LongPollConfig`] - wait window, buffering and rate gate configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      LongPollServer                          │
//! │  ┌────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │  Session   │  │  Overheater │  │      RateLimiter     │  │
//! │  │ (endpoint, │  │  (failure   │  │    (token bucket,    │  │
//! │  │  key, ts)  │  │   bursts)   │  │       shared)        │  │
//! │  └──────┬─────┘  └──────┬──────┘  └──────────┬───────────┘  │
//! │         │               │                    │              │
//! │         ▼               ▼                    ▼              │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                     PollTask                         │    │
//! │  │  overheat? → rate gate → fetch (≤5 tries) → emit    │    │
//! │  └──────────────────────────┬──────────────────────────┘    │
//! └─────────────────────────────┼───────────────────────────────┘
//!                               ▼
//!                      mpsc::Receiver<Update>
//! ```

mod config;
mod hooks;
mod overheat;
mod server;
mod update;

pub use config::{
    LongPollConfig, DEFAULT_UPDATE_BUFFER, DEFAULT_WAIT, MAX_UPDATE_BUFFER, MAX_WAIT, MIN_WAIT,
};
pub use hooks::{DefaultHooks, Hooks};
pub use overheat::Overheater;
pub use server::{LongPollServer, Session};
pub use update::Update;
