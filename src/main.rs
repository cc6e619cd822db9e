//! Ester - conversational assistant for HCE Esquadrias
//!
//! A Rust backend driving the site's chat widget: decision-tree
//! navigation, paced message delivery, consent-gated persistence, and a
//! pricing estimator, exposed over HTTP + SSE.

mod api;
mod consent;
mod pricing;
mod runtime;
mod state_machine;
mod store;
mod tree;

use api::{create_router, AppState};
use state_machine::{ChatContext, DEFAULT_WHATSAPP_NUMBER};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use store::{SessionGateway, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ester_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("ESTER_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.ester-chat/ester.db")
    });

    let port: u16 = std::env::var("ESTER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let tree_url = std::env::var("ESTER_TREE_URL").ok();
    let whatsapp = std::env::var("ESTER_WHATSAPP")
        .unwrap_or_else(|_| DEFAULT_WHATSAPP_NUMBER.to_string());

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening store");
    let store = Store::open(&db_path)?;

    // Remote tree when configured, bundled fallback otherwise.
    let tree = Arc::new(tree::load_tree(tree_url.as_deref()).await?);
    tracing::info!(nodes = tree.len(), "Conversation tree loaded");

    let chat = runtime::start(
        tree,
        ChatContext::new(whatsapp),
        SessionGateway::new(store.clone()),
    );

    let app = create_router(AppState::new(chat, store));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Ester chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
