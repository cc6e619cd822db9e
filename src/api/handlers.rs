//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ConsentResponse, DarkModeRequest, DarkModeResponse, ErrorResponse, EstimateRequest,
    EstimateResponse, FileRequest, MessageRequest, OptionRequest, QueuedResponse, SuccessResponse,
};
use super::AppState;
use crate::consent::{self, ConsentState};
use crate::pricing::{self, format_brl, Quality, Service};
use crate::state_machine::Event;
use crate::store::StoreError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Live event stream
        .route("/api/chat/stream", get(stream_chat))
        // Widget lifecycle
        .route("/api/chat/open", post(open_chat))
        .route("/api/chat/close", post(close_chat))
        .route("/api/chat/reset", post(reset_chat))
        // User input
        .route("/api/chat/option", post(select_option))
        .route("/api/chat/message", post(send_message))
        .route("/api/chat/file", post(send_file))
        // Standalone estimator
        .route("/api/estimate", post(estimate))
        // Consent record
        .route("/api/consent", get(get_consent).put(put_consent))
        // UI preferences
        .route(
            "/api/preferences/dark-mode",
            put(put_dark_mode).get(get_dark_mode),
        )
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Errors surfaced by handlers.
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    EngineGone,
    InvalidEstimate(&'static str),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
            ApiError::EngineGone => (
                StatusCode::SERVICE_UNAVAILABLE,
                "chat engine is not running".to_string(),
            ),
            ApiError::InvalidEstimate(what) => {
                (StatusCode::UNPROCESSABLE_ENTITY, what.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

// ============================================================
// Event stream
// ============================================================

async fn stream_chat(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.chat.snapshot();
    let dark_mode = state.gateway.dark_mode()?;
    let rx = state.chat.subscribe();
    Ok(sse_stream(snapshot, dark_mode, rx).into_response())
}

// ============================================================
// Widget lifecycle and input
// ============================================================

async fn dispatch(state: &AppState, event: Event) -> Result<Json<QueuedResponse>, ApiError> {
    if state.chat.send(event).await {
        Ok(Json(QueuedResponse { queued: true }))
    } else {
        Err(ApiError::EngineGone)
    }
}

async fn open_chat(State(state): State<AppState>) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(&state, Event::Opened).await
}

async fn close_chat(State(state): State<AppState>) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(&state, Event::Closed).await
}

async fn reset_chat(State(state): State<AppState>) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(&state, Event::Reset).await
}

async fn select_option(
    State(state): State<AppState>,
    Json(req): Json<OptionRequest>,
) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(
        &state,
        Event::OptionSelected {
            label: req.label,
            target: req.target,
        },
    )
    .await
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(&state, Event::TextSubmitted { text: req.text }).await
}

async fn send_file(
    State(state): State<AppState>,
    Json(req): Json<FileRequest>,
) -> Result<Json<QueuedResponse>, ApiError> {
    dispatch(
        &state,
        Event::FileSubmitted {
            name: req.name,
            size_bytes: req.size_bytes,
            mime_type: req.mime_type,
        },
    )
    .await
}

// ============================================================
// Standalone estimator
// ============================================================

async fn estimate(
    Json(req): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let service = Service::from_slug(&req.service)
        .ok_or(ApiError::InvalidEstimate("unknown service"))?;
    let quality = Quality::from_slug(&req.quality)
        .ok_or(ApiError::InvalidEstimate("unknown quality"))?;
    let estimate = pricing::estimate(service, req.area, quality)
        .ok_or(ApiError::InvalidEstimate("area must be a positive number"))?;

    Ok(Json(EstimateResponse {
        total: estimate.total,
        material_cost: estimate.material_cost,
        labor_cost: estimate.labor_cost,
        estimated_days: estimate.estimated_days,
        formatted_total: format_brl(estimate.total),
    }))
}

// ============================================================
// Consent and preferences
// ============================================================

async fn get_consent(State(state): State<AppState>) -> Result<Json<ConsentResponse>, ApiError> {
    Ok(Json(ConsentResponse {
        decided: consent::has_decided(&state.store)?,
        state: consent::load(&state.store),
    }))
}

async fn put_consent(
    State(state): State<AppState>,
    Json(req): Json<ConsentState>,
) -> Result<Json<SuccessResponse>, ApiError> {
    consent::save(&state.store, req)?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn get_dark_mode(
    State(state): State<AppState>,
) -> Result<Json<DarkModeResponse>, ApiError> {
    Ok(Json(DarkModeResponse {
        enabled: state.gateway.dark_mode()?,
    }))
}

async fn put_dark_mode(
    State(state): State<AppState>,
    Json(req): Json<DarkModeRequest>,
) -> Result<Json<DarkModeResponse>, ApiError> {
    state.gateway.set_dark_mode(req.enabled)?;
    // Echo what actually stuck; writes are dropped without consent.
    Ok(Json(DarkModeResponse {
        enabled: state.gateway.dark_mode()?,
    }))
}

async fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;
    use crate::state_machine::ChatContext;
    use crate::store::{SessionGateway, Store};
    use crate::tree::{parse_tree, BUNDLED_TREE};
    use std::sync::Arc;

    fn state() -> AppState {
        let store = Store::open_in_memory().unwrap();
        let tree = Arc::new(parse_tree(BUNDLED_TREE).unwrap());
        let chat = runtime::start(
            tree,
            ChatContext::default(),
            SessionGateway::new(store.clone()),
        );
        AppState::new(chat, store)
    }

    #[tokio::test]
    async fn estimate_returns_reference_quote() {
        let response = estimate(Json(EstimateRequest {
            service: "windows_doors".to_string(),
            area: 20.0,
            quality: "standard".to_string(),
        }))
        .await
        .unwrap();

        assert!((response.0.total - 9625.0).abs() < f64::EPSILON);
        assert_eq!(response.0.estimated_days, 2);
        assert_eq!(response.0.formatted_total, "R$ 9.625,00");
    }

    #[tokio::test]
    async fn estimate_rejects_unknown_service_and_bad_area() {
        let err = estimate(Json(EstimateRequest {
            service: "pools".to_string(),
            area: 20.0,
            quality: "standard".to_string(),
        }))
        .await;
        assert!(matches!(err, Err(ApiError::InvalidEstimate(_))));

        let err = estimate(Json(EstimateRequest {
            service: "facades".to_string(),
            area: -1.0,
            quality: "luxury".to_string(),
        }))
        .await;
        assert!(matches!(err, Err(ApiError::InvalidEstimate(_))));
    }

    #[tokio::test]
    async fn consent_roundtrip_marks_decided() {
        let state = state();
        let before = get_consent(State(state.clone())).await.unwrap();
        assert!(!before.0.decided);
        assert!(!before.0.state.functional);

        put_consent(
            State(state.clone()),
            Json(ConsentState {
                functional: true,
                ..ConsentState::default()
            }),
        )
        .await
        .unwrap();

        let after = get_consent(State(state)).await.unwrap();
        assert!(after.0.decided);
        assert!(after.0.state.functional);
    }

    #[tokio::test]
    async fn dark_mode_write_is_dropped_without_consent() {
        let state = state();
        let response = put_dark_mode(State(state.clone()), Json(DarkModeRequest { enabled: true }))
            .await
            .unwrap();
        assert_eq!(response.0.enabled, None);

        put_consent(
            State(state.clone()),
            Json(ConsentState {
                functional: true,
                ..ConsentState::default()
            }),
        )
        .await
        .unwrap();
        let response = put_dark_mode(State(state), Json(DarkModeRequest { enabled: true }))
            .await
            .unwrap();
        assert_eq!(response.0.enabled, Some(true));
    }

    #[tokio::test]
    async fn chat_actions_queue_events() {
        let state = state();
        let response = open_chat(State(state.clone())).await.unwrap();
        assert!(response.0.queued);

        let response = select_option(
            State(state),
            Json(OptionRequest {
                label: "Orçamento rápido".to_string(),
                target: "quote_service".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(response.0.queued);
    }
}
