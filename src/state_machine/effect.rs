//! Effects produced by state transitions

use std::time::Duration;

/// Effects to be executed by the runtime after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cancel every pending pacing timer from the previous node.
    CancelTimers,
    /// Schedule a pacing tick; the tick event carries `seq` back.
    SchedulePacer { delay: Duration, seq: u64 },
    /// Toggle the typing indicator on connected clients.
    SetTyping(bool),
    /// Request a (debounced, consent-gated) save of the session.
    SaveSession,
    /// Drop the persisted session record.
    ClearSaved,
    /// Persist the "has been welcomed" flag.
    MarkWelcomed,
    /// Drop the "has been welcomed" flag.
    ClearWelcomed,
    /// Ask the client to navigate to an internal route after a short delay.
    Navigate { path: String, delay: Duration },
}
