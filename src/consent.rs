//! Cookie-consent record
//!
//! Persistence of chat history and UI preferences is allowed only under
//! the `functional` category. The record itself always saves under
//! `necessary`. Consent is read from the store on every gated write so a
//! revocation takes effect immediately.

use crate::store::{Store, StoreResult};
use serde::{Deserialize, Serialize};

/// Store key for the consent record.
pub const CONSENT_KEY: &str = "hce_consent_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentState {
    /// Always true; covers storing this very record.
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
    /// Chat history and saved UI preferences.
    pub functional: bool,
}

impl Default for ConsentState {
    fn default() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            functional: false,
        }
    }
}

/// Whether the visitor has recorded any decision yet.
pub fn has_decided(store: &Store) -> StoreResult<bool> {
    Ok(store.get(CONSENT_KEY)?.is_some())
}

/// Current consent, or the all-denied default when absent or unreadable.
pub fn load(store: &Store) -> ConsentState {
    match store.get(CONSENT_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        _ => ConsentState::default(),
    }
}

/// Persist a decision. `necessary` is forced on regardless of input.
pub fn save(store: &Store, mut state: ConsentState) -> StoreResult<()> {
    state.necessary = true;
    let raw = serde_json::to_string(&state).unwrap_or_else(|_| "{}".to_string());
    store.put(CONSENT_KEY, &raw)
}

/// Gate check for chat-history and preference writes.
pub fn functional_allowed(store: &Store) -> bool {
    load(store).functional
}
