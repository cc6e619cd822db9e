//! Server-Sent Events support

use crate::runtime::ChatEvent;
use crate::state_machine::ChatSession;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream, prefixed with an init frame
/// carrying the full session snapshot.
pub fn sse_stream(
    snapshot: ChatSession,
    dark_mode: Option<bool>,
    broadcast_rx: tokio::sync::broadcast::Receiver<ChatEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init_data = json!({
        "type": "init",
        "session": snapshot,
        "darkMode": dark_mode,
    });
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(init_data.to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(chat_event_to_axum(&event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn chat_event_to_axum(event: &ChatEvent) -> Event {
    let event_type = match event {
        ChatEvent::Message { .. } => "message",
        ChatEvent::Typing { .. } => "typing",
        ChatEvent::OptionsCleared => "optionsCleared",
        ChatEvent::Cleared => "cleared",
        ChatEvent::Navigate { .. } => "navigate",
        ChatEvent::Error { .. } => "error",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event_type).data(data)
}
