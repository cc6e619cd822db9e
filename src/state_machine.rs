//! Core conversation state machine
//!
//! Elm-style: a pure transition over the session produces a new session
//! plus effects; the runtime executes the effects (timers, persistence,
//! broadcast) and feeds resulting events back in.

mod effect;
mod event;
mod link;
mod state;
mod template;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{
    ChatContext, ChatLink, ChatMessage, ChatSession, Phase, Sender, SessionContext,
    DEFAULT_WHATSAPP_NUMBER,
};
pub use transition::{
    transition, TransitionError, TransitionResult, MESSAGE_DELAY, NAV_DELAY, TYPING_DELAY,
};
