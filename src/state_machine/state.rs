//! Chat session state types

use crate::tree::{ChoiceOption, Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatContext {
    /// Destination number for WhatsApp deep links.
    pub whatsapp_number: String,
}

/// Default contact number, overridable via `ESTER_WHATSAPP`.
pub const DEFAULT_WHATSAPP_NUMBER: &str = "5561993619554";

impl ChatContext {
    pub fn new(whatsapp_number: impl Into<String>) -> Self {
        Self {
            whatsapp_number: whatsapp_number.into(),
        }
    }
}

impl Default for ChatContext {
    fn default() -> Self {
        Self::new(DEFAULT_WHATSAPP_NUMBER)
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Bot,
    User,
}

/// Outbound link rendered inside a bot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLink {
    pub text: String,
    pub url: String,
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One rendered chat entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Snapshot of node options at render time, re-ranked by click count.
    /// Cleared on every message once a choice has been made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<ChatLink>,
    /// Display-formatted timestamp (HH:MM).
    pub ts: String,
}

impl ChatMessage {
    fn new(sender: Sender) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: None,
            options: None,
            link: None,
            ts: display_timestamp(),
        }
    }

    pub fn bot_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(Sender::Bot)
        }
    }

    pub fn bot_options(options: Vec<ChoiceOption>) -> Self {
        Self {
            options: Some(options),
            ..Self::new(Sender::Bot)
        }
    }

    pub fn bot_link(link: ChatLink) -> Self {
        Self {
            link: Some(link),
            ..Self::new(Sender::Bot)
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(Sender::User)
        }
    }
}

fn display_timestamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

/// Per-session context carried alongside collected data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// target-node-id -> selection count, used to re-rank option lists.
    #[serde(default)]
    pub click_counts: BTreeMap<String, u32>,
}

/// Where the machine currently sits. Not persisted; recomputed on restore
/// from the current node's kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing pending (terminal node reached, or nothing started yet).
    #[default]
    Idle,
    /// Typing indicator shown, waiting before the first message.
    Typing { node: String, seq: u64 },
    /// Messages being revealed one at a time; `next` is the upcoming index.
    Delivering { node: String, next: usize, seq: u64 },
    /// All messages out; short pause before the node's closing decision.
    Concluding { node: String, seq: u64 },
    /// Options rendered, waiting for a click.
    AwaitingOption,
    /// Text (and possibly file) input affordance shown.
    AwaitingInput { file_upload: bool },
    /// A declared successor did not resolve; progression stops here.
    Halted { missing: String },
}

impl Phase {
    /// Phase to adopt when restoring a saved session at the given node.
    pub fn for_resume(node: Option<&Node>, node_id: &str) -> Self {
        match node.map(|n| &n.kind) {
            Some(NodeKind::OptionsQuestion { .. }) => Phase::AwaitingOption,
            Some(NodeKind::InputQuestion {
                requests_file_upload,
                ..
            }) => Phase::AwaitingInput {
                file_upload: *requests_file_upload,
            },
            Some(_) => Phase::Idle,
            None => Phase::Halted {
                missing: node_id.to_string(),
            },
        }
    }

    /// Whether a pacing timer is (or should be) outstanding.
    pub fn is_paced(&self) -> bool {
        matches!(
            self,
            Phase::Typing { .. } | Phase::Delivering { .. } | Phase::Concluding { .. }
        )
    }
}

/// The session: everything one visitor's conversation has accumulated.
///
/// Serialized form matches the persisted record layout:
/// `{messages, currentNodeId, collectedData, history, context}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub current_node_id: String,
    #[serde(default)]
    pub collected_data: BTreeMap<String, String>,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub context: SessionContext,

    /// Machine position; derived, never persisted.
    #[serde(skip)]
    pub phase: Phase,
    /// Monotonic pacing-timer sequence; stale ticks are dropped against it.
    #[serde(skip)]
    pub pacer_seq: u64,
}

impl ChatSession {
    pub fn fresh(entry_node: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            current_node_id: entry_node.into(),
            collected_data: BTreeMap::new(),
            history: Vec::new(),
            context: SessionContext::default(),
            phase: Phase::Idle,
            pacer_seq: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_serializes_with_persisted_record_field_names() {
        let mut session = ChatSession::fresh("start");
        session.messages.push(ChatMessage::bot_text("oi"));
        session
            .collected_data
            .insert("userName".to_string(), "Ana".to_string());
        session.context.click_counts.insert("menu".to_string(), 2);

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["currentNodeId"], "start");
        assert_eq!(json["collectedData"]["userName"], "Ana");
        assert_eq!(json["context"]["clickCounts"]["menu"], 2);
        assert!(json["messages"].is_array());
        assert!(json.get("phase").is_none());
    }

    #[test]
    fn restore_defaults_missing_sections() {
        let raw = r#"{ "messages": [], "currentNodeId": "main_menu" }"#;
        let session: ChatSession = serde_json::from_str(raw).unwrap();
        assert!(session.history.is_empty());
        assert!(session.context.click_counts.is_empty());
        assert_eq!(session.phase, Phase::Idle);
    }
}
