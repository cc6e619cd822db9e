//! Events that can occur in a chat session

/// Events that trigger state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Kick off a brand-new session at its preset entry node.
    Started,
    /// Widget opened; resume any interrupted message delivery.
    Opened,
    /// Widget closed; stop in-flight timers, keep state.
    Closed,
    /// User clicked an option button.
    OptionSelected { label: String, target: String },
    /// User submitted free text.
    TextSubmitted { text: String },
    /// User attached a file (metadata only; content stays client-side).
    FileSubmitted {
        name: String,
        size_bytes: u64,
        mime_type: String,
    },
    /// A scheduled pacing timer fired. Stale sequence numbers are ignored.
    PacerElapsed { seq: u64 },
    /// Wipe the session and start over.
    Reset,
}
