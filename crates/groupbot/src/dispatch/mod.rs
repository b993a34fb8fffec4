//! Pull-based event dispatcher and worker pool.
//!
//! Workers pull work instead of having it pushed at them: whenever a
//! worker goes idle it publishes its own input channel into a shared pool
//! of ready workers, then parks on that channel. The dispatch loop pairs
//! each incoming event with one ready worker on a fresh short-lived task,
//! so admission never blocks on a momentarily busy pool. The price is an
//! unbounded number of pending hand-off tasks under sustained overload
//! with few workers.
//!
//! Every event admitted to the dispatcher reaches exactly one worker
//! exactly once, unless cancellation lands mid-handoff, in which case the
//! event may be dropped.

use std::sync::Arc;

use futures::future::BoxFuture;
use groupbot_events::Event;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The function a worker runs for each event it receives.
pub type WorkerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared pool of idle workers, each represented by its input sender.
type ReadyPool = mpsc::Receiver<mpsc::Sender<Event>>;

/// Dispatches events from an inbound channel onto a pool of persistent
/// worker tasks.
pub struct Dispatcher {
    ready_tx: mpsc::Sender<mpsc::Sender<Event>>,
    ready_rx: Arc<Mutex<ReadyPool>>,
    workers: usize,
    worker_buffer: usize,
    cancel: CancellationToken,
    worker_fn: WorkerFn,
}

impl Dispatcher {
    /// Create a dispatcher with `workers` worker slots, each buffering up
    /// to `worker_buffer` events.
    pub fn new(workers: usize, worker_buffer: usize, worker_fn: WorkerFn) -> Self {
        let workers = workers.max(1);
        let (ready_tx, ready_rx) = mpsc::channel(workers);
        Self {
            ready_tx,
            ready_rx: Arc::new(Mutex::new(ready_rx)),
            workers,
            worker_buffer: worker_buffer.max(1),
            cancel: CancellationToken::new(),
            worker_fn,
        }
    }

    /// Spawn the persistent worker tasks.
    pub fn start_workers(&self) {
        for id in 0..self.workers {
            let ready = self.ready_tx.clone();
            let cancel = self.cancel.clone();
            let worker_fn = Arc::clone(&self.worker_fn);
            let buffer = self.worker_buffer;
            tokio::spawn(worker_loop(id, ready, buffer, cancel, worker_fn));
        }
    }

    /// Run the dispatch loop until the event stream closes or
    /// [`stop`](Self::stop) is called.
    ///
    /// Each event is handed off on its own task; if cancellation fires
    /// while a hand-off is still waiting for a ready worker, that event is
    /// dropped.
    pub async fn dispatch(&self, mut events: mpsc::Receiver<Event>) {
        loop {
            tokio::select! {
                maybe = events.recv() => {
                    let Some(event) = maybe else { break };
                    let ready = Arc::clone(&self.ready_rx);
                    let cancel = self.cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            slot = async { ready.lock().await.recv().await } => {
                                if let Some(worker) = slot {
                                    let _ = worker.send(event).await;
                                }
                            }
                            _ = cancel.cancelled() => {}
                        }
                    });
                }
                _ = self.cancel.cancelled() => break,
            }
        }
        debug!("dispatch loop exited");
    }

    /// Cancel the pool and fire the shutdown hook.
    ///
    /// Best-effort: the hook runs asynchronously right after the signal is
    /// raised and does not wait for in-flight events to finish.
    pub fn stop<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            cancel.cancel();
            hook();
        });
    }
}

/// One persistent worker: publish into the ready pool, wait for an event
/// or cancellation, run the handler, repeat.
async fn worker_loop(
    id: usize,
    ready: mpsc::Sender<mpsc::Sender<Event>>,
    buffer: usize,
    cancel: CancellationToken,
    worker_fn: WorkerFn,
) {
    let (tx, mut rx) = mpsc::channel::<Event>(buffer);
    loop {
        if ready.send(tx.clone()).await.is_err() {
            break;
        }
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(event) => worker_fn(event).await,
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }
    debug!(worker = id, "worker exited");
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn test_event(event_id: &str) -> Event {
        Event::parse(json!({
            "type": "message_new",
            "object": {},
            "group_id": 1,
            "event_id": event_id,
        }))
        .unwrap()
    }

    /// Counts invocations and collects event ids to catch duplicates.
    fn counting_worker() -> (WorkerFn, Arc<AtomicUsize>, Arc<StdMutex<HashSet<String>>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(StdMutex::new(HashSet::new()));
        let count_ref = Arc::clone(&count);
        let seen_ref = Arc::clone(&seen);
        let worker_fn: WorkerFn = Arc::new(move |event: Event| {
            let count = Arc::clone(&count_ref);
            let seen = Arc::clone(&seen_ref);
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().insert(event.event_id().to_string());
            })
        });
        (worker_fn, count, seen)
    }

    async fn run_delivery(workers: usize, events: usize) {
        let (worker_fn, count, seen) = counting_worker();
        let dispatcher = Arc::new(Dispatcher::new(workers, 4, worker_fn));
        dispatcher.start_workers();

        let (tx, rx) = mpsc::channel(16);
        let dispatch = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(rx).await })
        };

        for i in 0..events {
            tx.send(test_event(&format!("ev-{i}"))).await.unwrap();
        }
        drop(tx);
        dispatch.await.unwrap();

        // Hand-offs may still be in flight after the loop exits.
        tokio::time::timeout(Duration::from_secs(5), async {
            while count.load(Ordering::SeqCst) < events {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("all events should be delivered");

        assert_eq!(count.load(Ordering::SeqCst), events);
        assert_eq!(seen.lock().unwrap().len(), events);
    }

    #[test_log::test(tokio::test)]
    async fn test_delivers_every_event_once_single_worker() {
        run_delivery(1, 100).await;
    }

    #[test_log::test(tokio::test)]
    async fn test_delivers_every_event_once_small_pool() {
        run_delivery(5, 100).await;
    }

    #[test_log::test(tokio::test)]
    async fn test_delivers_every_event_once_large_pool() {
        run_delivery(20, 100).await;
    }

    #[tokio::test]
    async fn test_stop_unblocks_shutdown_hook_with_events_in_flight() {
        // Workers that never finish keep the pool permanently busy.
        let worker_fn: WorkerFn = Arc::new(|_event: Event| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
        });
        let dispatcher = Arc::new(Dispatcher::new(2, 1, worker_fn));
        dispatcher.start_workers();

        let (tx, rx) = mpsc::channel(16);
        let dispatch = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(rx).await })
        };
        for i in 0..10 {
            tx.send(test_event(&format!("ev-{i}"))).await.unwrap();
        }

        let (hook_tx, hook_rx) = tokio::sync::oneshot::channel();
        dispatcher.stop(move || {
            let _ = hook_tx.send(());
        });

        tokio::time::timeout(Duration::from_secs(1), hook_rx)
            .await
            .expect("hook should fire promptly")
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), dispatch)
            .await
            .expect("dispatch loop should exit")
            .unwrap();
    }

    #[tokio::test]
    async fn test_upstream_close_ends_dispatch() {
        let (worker_fn, ..) = counting_worker();
        let dispatcher = Dispatcher::new(1, 1, worker_fn);
        dispatcher.start_workers();

        let (tx, rx) = mpsc::channel::<Event>(1);
        drop(tx);
        // Returns immediately once the inbound channel reports end-of-stream.
        tokio::time::timeout(Duration::from_secs(1), dispatcher.dispatch(rx))
            .await
            .expect("dispatch should end on upstream close");
    }
}
