//! End-to-end flow against a loopback wire server.
//!
//! The server below speaks both sides of the contract: the method API
//! (`groups.*`) and the long-poll endpoint itself. Each poll responds with
//! one fresh event and the next cursor, so the test observes cursor
//! progression, dispatch and shutdown of the whole pipeline.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::Form;
use groupbot::prelude::*;
use serde_json::json;
use tokio_test::assert_ok;

#[derive(Clone)]
struct WireState {
    poll_count: Arc<AtomicUsize>,
    seen_ts: Arc<Mutex<Vec<String>>>,
    poll_url: String,
}

async fn set_settings(_state: State<WireState>) -> String {
    json!({"response": 1}).to_string()
}

async fn get_server(State(state): State<WireState>) -> String {
    json!({"response": {"key": "key", "server": state.poll_url, "ts": "1"}}).to_string()
}

async fn poll(State(state): State<WireState>, Form(form): Form<HashMap<String, String>>) -> String {
    let n = state.poll_count.fetch_add(1, Ordering::SeqCst);
    if let Some(ts) = form.get("ts") {
        state.seen_ts.lock().unwrap().push(ts.clone());
    }
    json!({
        "ts": (n + 2).to_string(),
        "updates": [{
            "type": "message_new",
            "object": {"message": {"text": format!("m{n}"), "peer_id": 1}},
            "group_id": 1,
            "event_id": format!("ev-{n}"),
        }],
    })
    .to_string()
}

async fn start_wire_server() -> (SocketAddr, WireState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = WireState {
        poll_count: Arc::new(AtomicUsize::new(0)),
        seen_ts: Arc::new(Mutex::new(Vec::new())),
        poll_url: format!("http://{addr}/poll"),
    };
    let app = axum::Router::new()
        .route("/method/groups.setLongPollSettings", post(set_settings))
        .route("/method/groups.getLongPollServer", post(get_server))
        .route("/poll", post(poll))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

#[tokio::test]
async fn test_events_flow_from_wire_to_handlers() {
    let (addr, state) = start_wire_server().await;

    let api: Arc<dyn ApiClient> = Arc::new(
        HttpApiClient::new("token")
            .unwrap()
            .with_base_url(format!("http://{addr}/method/")),
    );
    let mut server = LongPollServer::new(Arc::clone(&api), 1).unwrap();
    server.set_config(
        LongPollConfig::new()
            .with_wait(1)
            .with_limiter(Arc::new(RateLimiter::new(1000.0, 100))),
    );

    let mut bot = Bot::new(api, server);
    bot.set_config(BotConfig::new().with_workers(4));

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    bot.event_handler("message_new", move |event: Event| {
        let count = Arc::clone(&counter);
        async move {
            assert_eq!(event.group_id(), 1);
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    bot.init().await.unwrap();

    let bot = Arc::new(bot);
    let runner = {
        let bot = Arc::clone(&bot);
        tokio::spawn(async move { bot.run().await })
    };

    tokio::time::timeout(Duration::from_secs(10), async {
        while handled.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handlers should observe events");

    assert_ok!(bot.stop());
    let run_result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("run should return after stop")
        .unwrap();
    assert_ok!(run_result);

    // The first poll carries the acquired cursor; every later one carries
    // the cursor from the previous response.
    let seen = state.seen_ts.lock().unwrap();
    assert!(seen.len() >= 3);
    for (i, ts) in seen.iter().enumerate() {
        assert_eq!(ts, &(i + 1).to_string());
    }
}

#[tokio::test]
async fn test_stop_without_run_is_an_explicit_error() {
    let api: Arc<dyn ApiClient> = Arc::new(
        HttpApiClient::new("token")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/method/"),
    );
    let server = LongPollServer::new(Arc::clone(&api), 1).unwrap();
    let bot = Bot::new(api, server);

    let err = bot.stop().unwrap_err();
    assert_eq!(err.to_string(), "update loop is not started");
}
