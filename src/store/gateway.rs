//! Consent-gated session persistence

use super::{Store, StoreResult, KEY_CHAT_STATE, KEY_DARK_MODE, KEY_WELCOMED};
use crate::consent;
use crate::state_machine::ChatSession;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Only the newest messages are persisted.
pub const SAVED_MESSAGE_CAP: usize = 100;
/// Quiet window before a requested save actually hits the store.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Store access for chat state and UI preferences. Session reads and all
/// writes are gated on functional consent, checked per call; clears are
/// not, so revoking consent can always wipe what was stored.
#[derive(Clone)]
pub struct SessionGateway {
    store: Store,
}

impl SessionGateway {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persist the session. Skipped without functional consent and for
    /// sessions that have no messages yet.
    pub fn save_session(&self, session: &ChatSession) -> StoreResult<()> {
        if session.messages.is_empty() || !consent::functional_allowed(&self.store) {
            return Ok(());
        }

        let mut capped = session.clone();
        if capped.messages.len() > SAVED_MESSAGE_CAP {
            let skip = capped.messages.len() - SAVED_MESSAGE_CAP;
            capped.messages.drain(..skip);
        }

        match serde_json::to_string(&capped) {
            Ok(raw) => self.store.put(KEY_CHAT_STATE, &raw),
            Err(err) => {
                warn!(error = %err, "failed to serialize chat session");
                Ok(())
            }
        }
    }

    /// Restore the saved session. Absent without functional consent; a
    /// corrupt record is deleted and treated as absent.
    pub fn load_session(&self) -> StoreResult<Option<ChatSession>> {
        if !consent::functional_allowed(&self.store) {
            return Ok(None);
        }
        let Some(raw) = self.store.get(KEY_CHAT_STATE)? else {
            return Ok(None);
        };
        match serde_json::from_str::<ChatSession>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(error = %err, "discarding corrupt saved chat session");
                self.store.delete(KEY_CHAT_STATE)?;
                Ok(None)
            }
        }
    }

    pub fn clear_session(&self) -> StoreResult<()> {
        self.store.delete(KEY_CHAT_STATE)
    }

    pub fn mark_welcomed(&self) -> StoreResult<()> {
        if !consent::functional_allowed(&self.store) {
            return Ok(());
        }
        self.store.put(KEY_WELCOMED, "true")
    }

    pub fn is_welcomed(&self) -> StoreResult<bool> {
        Ok(self.store.get(KEY_WELCOMED)?.as_deref() == Some("true"))
    }

    pub fn clear_welcomed(&self) -> StoreResult<()> {
        self.store.delete(KEY_WELCOMED)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> StoreResult<()> {
        if !consent::functional_allowed(&self.store) {
            return Ok(());
        }
        self.store
            .put(KEY_DARK_MODE, if enabled { "true" } else { "false" })
    }

    pub fn dark_mode(&self) -> StoreResult<Option<bool>> {
        Ok(self
            .store
            .get(KEY_DARK_MODE)?
            .map(|v| v == "true"))
    }
}

/// Trailing-edge debounce over save requests. Bursts collapse into one
/// write of the newest snapshot; the final snapshot is flushed when the
/// sender side closes.
pub struct DebouncedSaver {
    tx: mpsc::UnboundedSender<ChatSession>,
}

impl DebouncedSaver {
    pub fn spawn(gateway: SessionGateway) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ChatSession>();
        tokio::spawn(async move {
            'drain: while let Some(mut latest) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(session) => latest = session,
                            None => {
                                flush(&gateway, &latest);
                                break 'drain;
                            }
                        },
                        () = tokio::time::sleep(SAVE_DEBOUNCE) => {
                            flush(&gateway, &latest);
                            break;
                        }
                    }
                }
            }
        });
        Self { tx }
    }

    /// Queue the latest snapshot. A closed worker means shutdown; the
    /// request is dropped silently.
    pub fn request_save(&self, session: ChatSession) {
        let _ = self.tx.send(session);
    }
}

fn flush(gateway: &SessionGateway, session: &ChatSession) {
    if let Err(err) = gateway.save_session(session) {
        warn!(error = %err, "failed to persist chat session");
    }
}
