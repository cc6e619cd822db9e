//! Tree loading: remote fetch with a single bundled fallback

use super::{ConversationTree, TreeError};

/// Fallback copy shipped with the binary. Same structure as the remote
/// document.
pub const BUNDLED_TREE: &str = include_str!("../../assets/chatbot-tree.json");

/// Parse and validate a tree document.
pub fn parse_tree(raw: &str) -> Result<ConversationTree, TreeError> {
    let tree: ConversationTree = serde_json::from_str(raw)?;
    tree.validate()?;
    Ok(tree)
}

/// Load the conversation tree.
///
/// With a URL configured, tries one fetch and falls back to the bundled
/// copy on any failure — no retry loop. Without a URL the bundled copy is
/// used directly. If the bundled copy itself fails to parse the chatbot
/// cannot initialize and the error is terminal.
pub async fn load_tree(url: Option<&str>) -> Result<ConversationTree, TreeError> {
    if let Some(url) = url {
        match fetch_tree(url).await {
            Ok(tree) => {
                tracing::info!(url, nodes = tree.len(), "loaded remote conversation tree");
                return Ok(tree);
            }
            Err(error) => {
                tracing::warn!(url, %error, "tree fetch failed, using bundled copy");
            }
        }
    }
    parse_tree(BUNDLED_TREE)
}

async fn fetch_tree(url: &str) -> Result<ConversationTree, TreeError> {
    let body = reqwest::get(url).await?.error_for_status()?.text().await?;
    parse_tree(&body)
}
