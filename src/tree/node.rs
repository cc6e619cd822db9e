//! Node types for the conversation tree

use serde::{Deserialize, Serialize};

/// One selectable option on an `optionsQuestion` node.
///
/// `value` is the canonical code stored into collected data when the option
/// is chosen; options without one fall back to their trimmed label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    #[serde(rename = "targetNodeId")]
    pub target: String,
    #[serde(rename = "iconName", default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// One decision point in the tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    #[serde(rename = "botMessages", default)]
    pub bot_messages: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Closed set of node behaviors, exhaustively matched by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeKind {
    /// Present re-ranked options and wait for a click.
    OptionsQuestion {
        options: Vec<ChoiceOption>,
        #[serde(default)]
        next_state_key: Option<String>,
    },
    /// Wait for free text (optionally a file) from the user.
    InputQuestion {
        #[serde(default)]
        requests_file_upload: bool,
        next_state_key: String,
        next_node_id: String,
    },
    /// Emit messages, then advance.
    Message {
        #[serde(default)]
        next_node_id: Option<String>,
    },
    /// Emit messages, then render one outbound WhatsApp link.
    MessageWithLink {
        next_node_id: String,
        link_text: String,
        #[serde(default)]
        whatsapp_template: Option<String>,
        #[serde(default)]
        icon_name: Option<String>,
    },
    /// Emit messages, then trigger client-side navigation.
    InternalRedirect {
        link: String,
        next_node_id: String,
    },
    /// Emit messages, then render a link to an external page.
    ExternalRedirect {
        link: String,
        link_text: String,
        #[serde(default)]
        next_node_id: Option<String>,
        #[serde(default)]
        icon_name: Option<String>,
    },
    /// Invoke the pricing estimator against collected data, no messages.
    Calculation { next_node_id: String },
}

impl Node {
    /// All node ids this node can transition to.
    pub fn successors(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::OptionsQuestion { options, .. } => {
                options.iter().map(|o| o.target.as_str()).collect()
            }
            NodeKind::InputQuestion { next_node_id, .. }
            | NodeKind::MessageWithLink { next_node_id, .. }
            | NodeKind::InternalRedirect { next_node_id, .. }
            | NodeKind::Calculation { next_node_id } => vec![next_node_id.as_str()],
            NodeKind::Message { next_node_id }
            | NodeKind::ExternalRedirect { next_node_id, .. } => {
                next_node_id.iter().map(String::as_str).collect()
            }
        }
    }
}
