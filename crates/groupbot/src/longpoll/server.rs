//! The long-poll session and the update production loop.
//!
//! `LongPollServer` owns the session descriptor and turns the remote
//! long-poll endpoint into a stream of [`Update`] batches. One fetch cycle
//! is a bounded-retry request/response exchange; the production loop wires
//! fetch cycles together with the failure-burst detector, the rate gate
//! and the cancellation signal.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::LongPollConfig;
use super::hooks::{DefaultHooks, Hooks};
use super::overheat::Overheater;
use super::update::{cursor_string, Update};
use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use crate::params::Params;

/// Burst window of the failure detector.
const OVERHEAT_WINDOW: Duration = Duration::from_millis(50);

/// Failure budget of the detector.
const OVERHEAT_CAPACITY: u32 = 3;

/// Long-poll session descriptor: endpoint, key and cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// The endpoint to poll.
    pub server: String,
    /// The session key sent with every poll.
    pub key: String,
    /// The cursor marking how far the event stream was consumed.
    pub ts: String,
}

/// Lock-guarded shared access to the session descriptor.
///
/// The cursor is read to build a request and written from the response of
/// the previous one, and re-acquire replaces all three fields wholesale.
/// Each of those is one critical section under the handle's lock, so the
/// fetch path always sees a consistent snapshot.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    api: Arc<dyn ApiClient>,
    group_id: i64,
    state: Arc<Mutex<Session>>,
}

impl SessionHandle {
    fn new(api: Arc<dyn ApiClient>, group_id: i64) -> Self {
        Self {
            api,
            group_id,
            state: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Consistent snapshot of all session fields.
    pub(crate) fn snapshot(&self) -> Session {
        self.state.lock().clone()
    }

    /// Advance the cursor after a successful fetch.
    fn advance(&self, ts: String) {
        self.state.lock().ts = ts;
    }

    /// (Re-)acquire the session from the remote.
    pub(crate) async fn acquire(&self) -> Result<()> {
        let params = Params::new().with("group_id", self.group_id);
        let response = self
            .api
            .call_method("groups.getLongPollServer", params)
            .await
            .map_err(|err| Error::session("failed to acquire long-poll session", Some(err)))?;

        let session = decode_session(&response)?;
        info!(server = %session.server, ts = %session.ts, "long-poll session acquired");
        *self.state.lock() = session;
        Ok(())
    }
}

fn decode_session(response: &Value) -> Result<Session> {
    let Some(object) = response.as_object() else {
        return Err(Error::session(
            "long-poll session response is not an object",
            None,
        ));
    };
    let Some(server) = object.get("server").and_then(Value::as_str) else {
        return Err(Error::session(
            "long-poll session response misses the server field",
            None,
        ));
    };
    let Some(key) = object.get("key").and_then(Value::as_str) else {
        return Err(Error::session(
            "long-poll session response misses the key field",
            None,
        ));
    };
    let Some(ts) = object.get("ts").and_then(cursor_string) else {
        return Err(Error::session(
            "long-poll session response misses the ts field",
            None,
        ));
    };
    Ok(Session {
        server: server.to_string(),
        key: key.to_string(),
        ts,
    })
}

/// Client of the remote long-poll endpoint.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use groupbot::api::HttpApiClient;
/// use groupbot::longpoll::LongPollServer;
///
/// let api = Arc::new(HttpApiClient::new(token)?);
/// let mut server = LongPollServer::new(api, group_id)?;
/// server.init().await?;
///
/// let mut updates = server.start();
/// while let Some(update) = updates.recv().await {
///     // ...
/// }
/// ```
pub struct LongPollServer {
    api: Arc<dyn ApiClient>,
    session: SessionHandle,
    settings: Params,
    config: LongPollConfig,
    hooks: Arc<dyn Hooks>,
    http: reqwest::Client,
    cancel: Mutex<Option<CancellationToken>>,
}

impl LongPollServer {
    /// Create a server for the given community with default settings.
    pub fn new(api: Arc<dyn ApiClient>, group_id: i64) -> Result<Self> {
        Ok(Self {
            session: SessionHandle::new(Arc::clone(&api), group_id),
            api,
            settings: default_settings(group_id),
            config: LongPollConfig::default(),
            hooks: Arc::new(DefaultHooks::default()),
            http: crate::api::http_client()?,
            cancel: Mutex::new(None),
        })
    }

    /// The event-type settings the session will be configured with.
    pub fn settings(&self) -> &Params {
        &self.settings
    }

    /// Overwrite known settings; unknown keys are ignored.
    pub fn set_settings(&mut self, settings: Params) {
        for (key, value) in settings.iter() {
            if self.settings.contains_key(key) {
                self.settings.insert(key, value.clone());
            }
        }
    }

    /// Replace the engine configuration; out-of-range values fall back to
    /// their defaults.
    pub fn set_config(&mut self, config: LongPollConfig) {
        self.config = config.normalized();
    }

    /// Replace the loop policies.
    pub fn set_hooks(&mut self, hooks: Arc<dyn Hooks>) {
        self.hooks = hooks;
    }

    /// A snapshot of the current session descriptor.
    pub fn session(&self) -> Session {
        self.session.snapshot()
    }

    /// Apply the configured settings remotely, then acquire the session.
    pub async fn init(&self) -> Result<()> {
        self.api
            .call_method("groups.setLongPollSettings", self.settings.clone())
            .await?;
        self.session.acquire().await
    }

    /// Start the update production loop.
    ///
    /// Returns the outbound update channel. The channel closes when the
    /// loop exits: after [`stop`](Self::stop), or when the overheat policy
    /// asks the loop to terminate.
    pub fn start(&self) -> mpsc::Receiver<Update> {
        let (tx, rx) = mpsc::channel(self.config.update_buffer_size.max(1));
        let cancel = CancellationToken::new();
        *self.cancel.lock() = Some(cancel.clone());

        let task = PollTask {
            fetcher: UpdateFetcher {
                session: self.session.clone(),
                http: self.http.clone(),
                wait: self.config.wait,
            },
            limiter: Arc::clone(&self.config.limiter),
            hooks: Arc::clone(&self.hooks),
            detector: Overheater::new(OVERHEAT_WINDOW, OVERHEAT_CAPACITY),
        };
        tokio::spawn(task.run(tx, cancel));
        rx
    }

    /// Stop the update production loop.
    ///
    /// Fails with [`Error::NotStarted`] when the loop was never started;
    /// stopping an already stopped loop is a no-op.
    pub fn stop(&self) -> Result<()> {
        match self.cancel.lock().as_ref() {
            Some(cancel) => {
                cancel.cancel();
                Ok(())
            }
            None => Err(Error::NotStarted),
        }
    }
}

/// One bounded-retry request/response cycle against the session.
#[derive(Clone)]
struct UpdateFetcher {
    session: SessionHandle,
    http: reqwest::Client,
    wait: u64,
}

impl UpdateFetcher {
    /// Retry budget of a single fetch cycle.
    const MAX_ATTEMPTS: u32 = 5;

    /// Perform one fetch cycle.
    ///
    /// Transport failures and non-success statuses consume an attempt and
    /// retry. A desync body re-acquires the session and retries; a failed
    /// re-acquire is terminal. A well-formed body advances the cursor.
    async fn fetch_once(&self) -> Result<Value> {
        for attempt in 1..=Self::MAX_ATTEMPTS {
            let snapshot = self.session.snapshot();
            let params = Params::new()
                .with("key", snapshot.key.as_str())
                .with("ts", snapshot.ts.as_str())
                .with("act", "a_check")
                .with("wait", self.wait);

            let response = match self
                .http
                .post(&snapshot.server)
                .form(&params.to_form())
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    debug!(attempt, "long-poll request failed: {err}");
                    continue;
                }
            };
            if !response.status().is_success() {
                debug!(attempt, status = %response.status(), "long-poll response status is not success");
                continue;
            }
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(attempt, "error occurred while reading response body: {err}");
                    continue;
                }
            };

            let data: Value = serde_json::from_str(&body).map_err(|err| {
                let mut misc = Map::new();
                misc.insert("body".into(), Value::String(body));
                Error::Protocol {
                    message: "error occurred while unmarshalling long-poll response".into(),
                    misc,
                    source: Some(Box::new(err)),
                }
            })?;

            if data.get("fail").is_some() {
                debug!("long-poll session desynchronized, re-acquiring");
                if let Err(err) = self.session.acquire().await {
                    return Err(Error::session(
                        "error occurred while re-acquiring long-poll session",
                        Some(err),
                    ));
                }
                continue;
            }

            let Some(ts) = data.get("ts").and_then(cursor_string) else {
                return Err(Error::protocol("long-poll response misses the ts field"));
            };
            self.session.advance(ts);
            return Ok(data);
        }
        Err(Error::Exhausted {
            attempts: Self::MAX_ATTEMPTS,
        })
    }
}

/// The update production loop, spawned by [`LongPollServer::start`].
struct PollTask {
    fetcher: UpdateFetcher,
    limiter: Arc<RateLimiter>,
    hooks: Arc<dyn Hooks>,
    detector: Overheater,
}

impl PollTask {
    async fn run(self, out: mpsc::Sender<Update>, cancel: CancellationToken) {
        loop {
            if self.detector.is_overheated() && self.hooks.on_overheat(&cancel).await {
                break;
            }
            if !self.limiter.allow() {
                if cancel.is_cancelled() {
                    break;
                }
                self.hooks.on_rate_limited(&cancel, &self.limiter).await;
            }
            if cancel.is_cancelled() {
                break;
            }

            let mut result = self.spawn_fetch(cancel.clone());
            let fetched = tokio::select! {
                fetched = &mut result => fetched,
                _ = cancel.cancelled() => break,
            };
            let body = match fetched {
                Ok(Ok(body)) => body,
                Ok(Err(err)) => {
                    self.hooks.on_fetch_error(&self.detector, &err).await;
                    continue;
                }
                // The fetch task was torn down underneath us.
                Err(_) => break,
            };

            let update = match Update::parse(&body) {
                Ok(update) => update,
                Err(err) => {
                    self.hooks.on_decode_error(&self.detector, &err).await;
                    continue;
                }
            };
            tokio::select! {
                sent = out.send(update) => {
                    if sent.is_err() {
                        // Receiver is gone, nobody is listening anymore.
                        break;
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
        debug!("update loop exited");
    }

    /// Drive one fetch cycle on a dedicated task.
    ///
    /// The cycle reports its single result through a oneshot channel so
    /// the loop can race it against cancellation; cancelling drops the
    /// in-flight request.
    fn spawn_fetch(&self, cancel: CancellationToken) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = fetcher.fetch_once() => {
                    let _ = tx.send(result);
                }
                _ = cancel.cancelled() => {}
            }
        });
        rx
    }
}

/// Event types delivered only when explicitly enabled via
/// [`LongPollServer::set_settings`].
const DISABLED_EVENT_TYPES: &[&str] = &[
    "app_payload",
    "audio_new",
    "board_post_delete",
    "board_post_edit",
    "board_post_new",
    "board_post_restore",
    "group_change_photo",
    "group_change_settings",
    "group_join",
    "group_leave",
    "group_officers_edit",
    "market_comment_delete",
    "market_comment_edit",
    "market_comment_new",
    "market_comment_restore",
    "message_allow",
    "message_deny",
    "message_read",
    "message_reply",
    "message_typing_state",
    "message_edit",
    "message_event",
    "photo_comment_delete",
    "photo_comment_edit",
    "photo_comment_new",
    "photo_comment_restore",
    "photo_new",
    "poll_vote_new",
    "user_block",
    "user_unblock",
    "video_comment_delete",
    "video_comment_edit",
    "video_comment_new",
    "video_comment_restore",
    "video_new",
    "wall_post_new",
    "wall_reply_delete",
    "wall_reply_edit",
    "wall_reply_new",
    "wall_reply_restore",
    "wall_repost",
    "lead_forms_new",
    "like_add",
    "like_remove",
    "market_order_new",
    "market_order_edit",
    "vkpay_transaction",
    "donut_subscription_create",
    "donut_subscription_prolonged",
    "donut_subscription_cancelled",
    "donut_subscription_expired",
    "donut_subscription_price_changed",
    "donut_money_withdraw",
    "donut_money_withdraw_error",
];

/// The full event-type toggle map sent to `groups.setLongPollSettings`.
/// Only `message_new` is enabled out of the box.
fn default_settings(group_id: i64) -> Params {
    let mut settings = Params::new()
        .with("group_id", group_id)
        .with("enabled", 1)
        .with("api_version", crate::api::API_VERSION)
        .with("message_new", 1);
    for key in DISABLED_EVENT_TYPES {
        settings.insert(*key, 0);
    }
    settings
}
