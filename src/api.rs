//! HTTP API for the chat widget
//!
//! Thin presentation shell: handlers translate requests into engine
//! events and read the snapshot; all conversation logic lives in the
//! state machine.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::ChatHandle;
use crate::store::{SessionGateway, Store};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatHandle,
    pub gateway: SessionGateway,
    pub store: Store,
}

impl AppState {
    pub fn new(chat: ChatHandle, store: Store) -> Self {
        Self {
            chat,
            gateway: SessionGateway::new(store.clone()),
            store,
        }
    }
}
