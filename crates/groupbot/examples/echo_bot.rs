//! A minimal bot with two switchable inline keyboards.
//!
//! Reads `GROUP_TOKEN` and `GROUP_ID` from the environment (or a `.env`
//! file), replies to every incoming message with a keyboard, and flips to
//! the other keyboard on callback button presses.

use std::sync::Arc;

use anyhow::Context;
use groupbot::prelude::*;
use groupbot::ui::color;
use serde_json::json;

fn first_keyboard() -> Keyboard {
    let mut keyboard = Keyboard::new(false, true);
    keyboard.add_button(Button::new(
        Action::text("button 1").with_payload(&json!({"cmd": "button 1"})),
        color::SECONDARY,
    ));
    keyboard.add_button(Button::new(
        Action::text("button 2").with_payload(&json!({"cmd": "button 2"})),
        color::SECONDARY,
    ));
    keyboard.add_button(Button::new(
        Action::callback("second keyboard").with_payload(&json!({"menu": "second"})),
        color::POSITIVE,
    ));
    keyboard
}

fn second_keyboard() -> Keyboard {
    let mut keyboard = Keyboard::new(false, true);
    keyboard.add_button(Button::new(
        Action::text("button 3").with_payload(&json!({"cmd": "button 3"})),
        color::SECONDARY,
    ));
    keyboard.add_button(Button::new(
        Action::callback("first keyboard").with_payload(&json!({"menu": "first"})),
        color::POSITIVE,
    ));
    keyboard
}

async fn send_keyboard(
    api: &Arc<dyn ApiClient>,
    peer_id: i64,
    text: &str,
    keyboard: &Keyboard,
) -> std::result::Result<(), HandlerError> {
    api.call_method(
        "messages.send",
        Params::new()
            .with("peer_id", peer_id)
            .with("random_id", 0)
            .with("message", text)
            .with("keyboard", keyboard.to_json()?),
    )
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    groupbot::telemetry::init();

    let token = std::env::var("GROUP_TOKEN").context("GROUP_TOKEN is not set")?;
    let group_id: i64 = std::env::var("GROUP_ID")
        .context("GROUP_ID is not set")?
        .parse()
        .context("GROUP_ID must be an integer")?;

    let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(token)?);
    let mut server = LongPollServer::new(Arc::clone(&api), group_id)?;
    server.set_settings(Params::new().with("message_event", 1));

    let mut bot = Bot::new(Arc::clone(&api), server);
    bot.set_config(BotConfig::new().with_workers(8));

    let sender = Arc::clone(&api);
    bot.event_handler("message_new", move |event: Event| {
        let api = Arc::clone(&sender);
        async move {
            let peer_id = event
                .object()
                .get("message")
                .and_then(|m| m.get("peer_id"))
                .and_then(|v| v.as_i64())
                .ok_or("message without peer_id")?;
            send_keyboard(&api, peer_id, "pick a button", &first_keyboard()).await
        }
    });

    let sender = Arc::clone(&api);
    bot.event_handler("message_event", move |event: Event| {
        let api = Arc::clone(&sender);
        async move {
            let peer_id = event
                .object()
                .get("peer_id")
                .and_then(|v| v.as_i64())
                .ok_or("callback without peer_id")?;
            let menu = event
                .object()
                .get("payload")
                .and_then(|p| p.get("menu"))
                .and_then(|v| v.as_str())
                .unwrap_or("first");
            let keyboard = if menu == "second" {
                second_keyboard()
            } else {
                first_keyboard()
            };
            send_keyboard(&api, peer_id, "switched", &keyboard).await
        }
    });

    bot.init().await?;

    let bot = Arc::new(bot);
    let runner = {
        let bot = Arc::clone(&bot);
        tokio::spawn(async move { bot.run().await })
    };

    tokio::signal::ctrl_c().await?;
    bot.stop()?;
    runner.await??;
    Ok(())
}
