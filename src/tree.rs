//! Conversation tree document
//!
//! The decision tree driving the chatbot. Loaded once per process (remote
//! fetch with a bundled fallback), validated, then immutable for the
//! lifetime of every session.

mod loader;
mod node;

pub use loader::{load_tree, parse_tree, BUNDLED_TREE};
pub use node::{ChoiceOption, Node, NodeKind};

use std::collections::HashMap;
use thiserror::Error;

/// Node entered on a first-time visit.
pub const START_NODE_ID: &str = "start";
/// Node entered when the visitor has already been welcomed.
pub const RETURN_NODE_ID: &str = "main_menu_return";

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("failed to fetch conversation tree: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("failed to parse conversation tree: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("node `{node}` points at missing node `{target}`")]
    MissingTarget { node: String, target: String },
    #[error("entry node `{0}` is not present in the tree")]
    MissingEntry(String),
}

/// Immutable mapping of node id to node.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(transparent)]
pub struct ConversationTree {
    nodes: HashMap<String, Node>,
}

impl ConversationTree {
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Every declared successor must resolve and both entry nodes must
    /// exist. Terminal nodes (no successor) are fine.
    pub fn validate(&self) -> Result<(), TreeError> {
        for entry in [START_NODE_ID, RETURN_NODE_ID] {
            if !self.nodes.contains_key(entry) {
                return Err(TreeError::MissingEntry(entry.to_string()));
            }
        }

        for (id, node) in &self.nodes {
            for target in node.successors() {
                if !self.nodes.contains_key(target) {
                    return Err(TreeError::MissingTarget {
                        node: id.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
