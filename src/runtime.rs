//! Runtime for the chat engine
//!
//! Owns the session, drives the pure transition function from an event
//! channel, executes effects, and fans state changes out to SSE clients.

mod pacer;

pub use pacer::Pacer;

use crate::state_machine::{
    transition, ChatContext, ChatMessage, ChatSession, Effect, Event, Phase,
};
use crate::store::{DebouncedSaver, SessionGateway};
use crate::tree::{ConversationTree, RETURN_NODE_ID, START_NODE_ID};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const BROADCAST_CAPACITY: usize = 256;

/// Events sent to SSE clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    /// One new chat entry.
    Message { message: ChatMessage },
    /// Typing indicator toggle.
    Typing { active: bool },
    /// A choice was made; previously rendered option lists are dead.
    OptionsCleared,
    /// The conversation was reset; drop everything rendered so far.
    Cleared,
    /// Client-side navigation request.
    Navigate { path: String, delay_ms: u64 },
    /// User-facing rejection of the last input.
    Error { message: String },
}

/// Handle to the running chat engine.
#[derive(Clone)]
pub struct ChatHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<ChatEvent>,
    snapshot_rx: watch::Receiver<ChatSession>,
}

impl ChatHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Latest full session, for the SSE init frame.
    pub fn snapshot(&self) -> ChatSession {
        self.snapshot_rx.borrow().clone()
    }

    pub async fn send(&self, event: Event) -> bool {
        self.event_tx.send(event).await.is_ok()
    }
}

/// Spawn the engine. Restores the saved session when one exists,
/// otherwise starts fresh at the entry node matching the welcomed flag.
pub fn start(
    tree: Arc<ConversationTree>,
    ctx: ChatContext,
    gateway: SessionGateway,
) -> ChatHandle {
    let session = initial_session(&tree, &gateway);

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(session.clone());

    let handle = ChatHandle {
        event_tx: event_tx.clone(),
        broadcast_tx: broadcast_tx.clone(),
        snapshot_rx,
    };

    let runtime = ChatRuntime {
        tree,
        ctx,
        session,
        saver: DebouncedSaver::spawn(gateway.clone()),
        gateway,
        pacer: Pacer::new(),
        event_tx,
        event_rx,
        broadcast_tx,
        snapshot_tx,
    };
    tokio::spawn(runtime.run());

    handle
}

fn initial_session(tree: &ConversationTree, gateway: &SessionGateway) -> ChatSession {
    match gateway.load_session() {
        Ok(Some(mut session)) => {
            session.phase = Phase::for_resume(
                tree.get(&session.current_node_id),
                &session.current_node_id,
            );
            info!(
                node = %session.current_node_id,
                messages = session.messages.len(),
                "restored saved chat session"
            );
            session
        }
        Ok(None) => fresh_session(gateway),
        Err(err) => {
            warn!(error = %err, "failed to read saved session, starting fresh");
            fresh_session(gateway)
        }
    }
}

fn fresh_session(gateway: &SessionGateway) -> ChatSession {
    let welcomed = gateway.is_welcomed().unwrap_or(false);
    let entry = if welcomed { RETURN_NODE_ID } else { START_NODE_ID };
    ChatSession::fresh(entry)
}

struct ChatRuntime {
    tree: Arc<ConversationTree>,
    ctx: ChatContext,
    session: ChatSession,
    gateway: SessionGateway,
    saver: DebouncedSaver,
    pacer: Pacer,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
    snapshot_tx: watch::Sender<ChatSession>,
}

impl ChatRuntime {
    async fn run(mut self) {
        // No saved progress means nothing has greeted the visitor yet.
        if self.session.messages.is_empty() && self.session.phase == Phase::Idle {
            self.apply(Event::Started);
        }

        while let Some(event) = self.event_rx.recv().await {
            self.apply(event);
        }
        self.pacer.cancel_all();
        info!("chat runtime stopped");
    }

    fn apply(&mut self, event: Event) {
        match transition(&self.session, &self.tree, &self.ctx, event) {
            Ok(result) => {
                self.broadcast_changes(&result.session);
                self.session = result.session;
                if let Phase::Halted { missing } = &self.session.phase {
                    error!(node = %missing, "conversation tree names a missing node");
                }
                let _ = self.snapshot_tx.send(self.session.clone());
                for effect in result.effects {
                    self.execute(effect);
                }
            }
            Err(err) => {
                let _ = self.broadcast_tx.send(ChatEvent::Error {
                    message: err.to_string(),
                });
            }
        }
    }

    /// Diff old vs new session into client events. Messages are append-only
    /// outside of reset, so the diff is a suffix walk.
    fn broadcast_changes(&self, after: &ChatSession) {
        let before = &self.session;

        if after.messages.len() < before.messages.len() {
            let _ = self.broadcast_tx.send(ChatEvent::Cleared);
            for message in &after.messages {
                let _ = self.broadcast_tx.send(ChatEvent::Message {
                    message: message.clone(),
                });
            }
            return;
        }

        let cleared = before
            .messages
            .iter()
            .zip(&after.messages)
            .any(|(b, a)| b.options.is_some() && a.options.is_none());
        if cleared {
            let _ = self.broadcast_tx.send(ChatEvent::OptionsCleared);
        }

        for message in &after.messages[before.messages.len()..] {
            let _ = self.broadcast_tx.send(ChatEvent::Message {
                message: message.clone(),
            });
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::CancelTimers => self.pacer.cancel_all(),
            Effect::SchedulePacer { delay, seq } => {
                self.pacer.schedule(delay, seq, self.event_tx.clone());
            }
            Effect::SetTyping(active) => {
                let _ = self.broadcast_tx.send(ChatEvent::Typing { active });
            }
            Effect::SaveSession => self.saver.request_save(self.session.clone()),
            Effect::ClearSaved => {
                if let Err(err) = self.gateway.clear_session() {
                    warn!(error = %err, "failed to clear saved session");
                }
            }
            Effect::MarkWelcomed => {
                if let Err(err) = self.gateway.mark_welcomed() {
                    warn!(error = %err, "failed to persist welcomed flag");
                }
            }
            Effect::ClearWelcomed => {
                if let Err(err) = self.gateway.clear_welcomed() {
                    warn!(error = %err, "failed to clear welcomed flag");
                }
            }
            Effect::Navigate { path, delay } => {
                let _ = self.broadcast_tx.send(ChatEvent::Navigate {
                    path,
                    delay_ms: delay.as_millis() as u64,
                });
            }
        }
    }
}
