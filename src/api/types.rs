//! API request and response types

use crate::consent::ConsentState;
use serde::{Deserialize, Serialize};

/// Request to click an option button.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRequest {
    pub label: String,
    pub target: String,
}

/// Request to submit free text.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Request to attach a file. Metadata only; content never leaves the
/// client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Standalone estimate request.
#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub service: String,
    pub area: f64,
    pub quality: String,
}

/// Standalone estimate response, raw numbers plus display strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub total: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub estimated_days: u32,
    pub formatted_total: String,
}

/// Consent record plus whether any decision was ever made.
#[derive(Debug, Serialize)]
pub struct ConsentResponse {
    pub decided: bool,
    #[serde(flatten)]
    pub state: ConsentState,
}

/// Dark-mode preference write.
#[derive(Debug, Deserialize)]
pub struct DarkModeRequest {
    pub enabled: bool,
}

/// Dark-mode preference read; `None` means never stored.
#[derive(Debug, Serialize)]
pub struct DarkModeResponse {
    pub enabled: Option<bool>,
}

/// Response for engine actions.
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Response for storage actions.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
