//! The bot facade: handler registry, validation and lifecycle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use groupbot_events::Event;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::api::ApiClient;
use crate::config::BotConfig;
use crate::dispatch::{Dispatcher, WorkerFn};
use crate::error::{Error, Result};
use crate::longpoll::LongPollServer;

/// Error type user handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered per-event-type handler.
pub type HandleFn =
    Arc<dyn Fn(Event) -> BoxFuture<'static, std::result::Result<(), HandlerError>> + Send + Sync>;

/// Ties the API client, the long-poll engine, the handler registry and
/// the dispatcher together.
///
/// # Example
///
/// ```ignore
/// let mut bot = Bot::new(api, server);
/// bot.event_handler("message_new", |event| async move {
///     // react to the message
///     Ok(())
/// });
/// bot.init().await?;
/// bot.run().await?;
/// ```
pub struct Bot {
    api: Arc<dyn ApiClient>,
    server: LongPollServer,
    handlers: HashMap<String, HandleFn>,
    config: BotConfig,
    dispatcher: Mutex<Option<Arc<Dispatcher>>>,
}

impl Bot {
    /// Create a bot around an API client and a configured long-poll
    /// server.
    pub fn new(api: Arc<dyn ApiClient>, server: LongPollServer) -> Self {
        Self {
            api,
            server,
            handlers: HashMap::new(),
            config: BotConfig::default(),
            dispatcher: Mutex::new(None),
        }
    }

    /// The API client the bot was built with.
    pub fn api(&self) -> Arc<dyn ApiClient> {
        Arc::clone(&self.api)
    }

    /// Register a handler for one event type, replacing any previous one.
    pub fn event_handler<F, Fut>(&mut self, event_type: &str, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        let handler: HandleFn = Arc::new(move |event| Box::pin(handler(event)));
        self.handlers.insert(event_type.to_string(), handler);
    }

    /// Replace the runtime configuration.
    pub fn set_config(&mut self, config: BotConfig) {
        self.config = config.normalized();
    }

    /// Validate the handler registry and initialize the long-poll session.
    ///
    /// Fails fast when a handler is registered for an event type the
    /// session is not configured to receive.
    pub async fn init(&self) -> Result<()> {
        let settings = self.server.settings();
        for event_type in self.handlers.keys() {
            if !settings.contains_key(event_type) {
                return Err(Error::config(format!(
                    "added handler for unsupported event type '{event_type}'"
                )));
            }
        }
        self.server.init().await?;
        info!("bot initialized");
        Ok(())
    }

    /// Serve incoming events until [`stop`](Self::stop) is called.
    ///
    /// Starts the worker pool and the update loop, flattens update
    /// batches into single events in batch order, and dispatches each
    /// event to one idle worker.
    pub async fn run(&self) -> Result<()> {
        let handlers = Arc::new(self.handlers.clone());
        let worker_fn: WorkerFn = Arc::new(move |event: Event| {
            let handlers = Arc::clone(&handlers);
            Box::pin(async move { handle_event(&handlers, event).await })
        });

        let dispatcher = Arc::new(Dispatcher::new(
            self.config.workers,
            self.config.worker_buffer,
            worker_fn,
        ));
        dispatcher.start_workers();
        *self.dispatcher.lock() = Some(Arc::clone(&dispatcher));

        let mut updates = self.server.start();
        let (events_tx, events_rx) = mpsc::channel(self.config.events_buffer.max(1));
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                for event in update.into_events() {
                    if events_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            // Dropping the sender closes the event stream: that is the
            // dispatcher's end-of-stream signal.
        });

        dispatcher.dispatch(events_rx).await;
        Ok(())
    }

    /// Stop serving incoming events.
    ///
    /// Fails with [`Error::NotStarted`] when the update loop was never
    /// started. In-flight events are not drained.
    pub fn stop(&self) -> Result<()> {
        self.server.stop()?;
        if let Some(dispatcher) = self.dispatcher.lock().take() {
            dispatcher.stop(|| {});
        }
        Ok(())
    }
}

/// Run the registered handler for one event.
///
/// A failing handler is logged and isolated; it can never take down the
/// worker or the rest of the stream.
async fn handle_event(handlers: &HashMap<String, HandleFn>, event: Event) {
    let event_type = event.event_type().to_string();
    let result = match handlers.get(&event_type) {
        Some(handler) => handler(event).await,
        None => Err(format!("not implemented event handler for '{event_type}' event").into()),
    };
    info!(event_type = %event_type, "handled event");
    if let Err(err) = result {
        let err = Error::Handler {
            event_type,
            message: err.to_string(),
        };
        error!("something went wrong: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::params::Params;

    struct NoopApi;

    #[async_trait]
    impl ApiClient for NoopApi {
        async fn call_method(&self, _method: &str, _params: Params) -> Result<Value> {
            Err(Error::api("method not found", Map::new()))
        }
    }

    fn test_bot() -> Bot {
        let api: Arc<dyn ApiClient> = Arc::new(NoopApi);
        let server = LongPollServer::new(Arc::clone(&api), 1).unwrap();
        Bot::new(api, server)
    }

    fn test_event(event_type: &str) -> Event {
        Event::parse(json!({
            "type": event_type,
            "object": {},
            "group_id": 1,
            "event_id": "e1",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_init_rejects_handler_for_unknown_event_type() {
        let mut bot = test_bot();
        bot.event_handler("no_such_event", |_event| async { Ok(()) });

        let err = bot.init().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("no_such_event"));
    }

    #[tokio::test]
    async fn test_handle_event_invokes_registered_handler() {
        let mut bot = test_bot();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        bot.event_handler("message_new", move |_event| {
            let count = Arc::clone(&counter);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handle_event(&bot.handlers, test_event("message_new")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_is_isolated() {
        let mut bot = test_bot();
        bot.event_handler("message_new", |_event| async {
            Err("boom".into())
        });

        // Must not panic or propagate.
        handle_event(&bot.handlers, test_event("message_new")).await;
        handle_event(&bot.handlers, test_event("message_allow")).await;
    }

    #[test]
    fn test_stop_before_run_fails_fast() {
        let bot = test_bot();
        assert!(matches!(bot.stop(), Err(Error::NotStarted)));
    }
}
