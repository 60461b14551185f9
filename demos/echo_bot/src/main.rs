//! Echo Bot Demo
//!
//! A minimal demonstration of the Courier framework: a dispatcher with a few
//! filters, fed by a stand-in transport that replays hard-coded updates.
//!
//! The bot client here only logs the calls it would make; plug in a real
//! `BotApi` implementation to talk to an actual platform.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use courier::prelude::*;
use courier::runtime::{UpdateWorker, load_config, logging};
use serde_json::json;
use tracing::info;

// ============================================================================
// A bot client that logs instead of sending
// ============================================================================

struct LoggingBotApi;

#[async_trait]
impl BotApi for LoggingBotApi {
    async fn call(&self, call: PlatformCall) -> ApiResult<SentMessage> {
        info!(method = call.method(), chat_id = call.chat_id(), "outbound call");
        if let PlatformCall::SendMessage { text, .. } = &call {
            info!(%text, "would send");
        }
        Ok(SentMessage::new(call.chat_id(), 1))
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    logging::init_from_config(&config.logging);

    let mut dispatcher = Dispatcher::new(Arc::new(LoggingBotApi));

    // Log every incoming message; never consumes the update.
    dispatcher.register(MessageFilter::any(|_update, message| async move {
        info!(
            chat_id = message.chat.id,
            text = message.text.as_deref().unwrap_or("<non-text>"),
            "incoming message"
        );
        Ok(HandlerOutcome::None)
    }));

    // /ping -> Pong!
    dispatcher.register(CommandFilter::new("ping", None, |_update, _args| async {
        Ok(HandlerOutcome::text("Pong!"))
    }));

    // /echo <text> -> <text>
    dispatcher.register(CommandFilter::new("echo", None, |_update, args| async move {
        Ok(match args {
            Some(text) => HandlerOutcome::text(text),
            None => HandlerOutcome::text("usage: /echo <text>"),
        })
    }));

    let worker = UpdateWorker::spawn(dispatcher, &config.worker);

    // Stand-in transport: replay a couple of updates.
    for (id, text) in [(1, "/ping"), (2, "/echo hello world"), (3, "just chatting")] {
        let update: Update = serde_json::from_value(json!({
            "update_id": id,
            "message": {
                "message_id": id,
                "chat": {"id": 42, "type": "private"},
                "text": text
            }
        }))?;
        worker.enqueue(update).await?;
    }

    worker.shutdown().await;
    Ok(())
}
