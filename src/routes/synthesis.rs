use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::llm::ExtractionResult;
use crate::models::{AiAnalysis, Decision};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub file_name: Option<String>,
    pub raw_text: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub decision: Option<Decision>,
}

pub async fn extract_inputs(
    State(state): State<AppState>,
    Json(payload): Json<ExtractRequest>,
) -> AppResult<Json<ExtractionResult>> {
    let (file_name, raw_text) = match (payload.file_name, payload.raw_text) {
        (Some(file_name), Some(raw_text))
            if !file_name.trim().is_empty() && !raw_text.trim().is_empty() =>
        {
            (file_name, raw_text)
        }
        _ => return Err(AppError::bad_request("fileName and rawText are required")),
    };

    info!(%file_name, text_len = raw_text.len(), "extract requested");
    match state.model.extract(&file_name, &raw_text).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            error!(%file_name, error = %err, "extract failed");
            Err(AppError::internal("Failed to extract inputs").with_message(err.to_string()))
        }
    }
}

pub async fn analyze_decision(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> AppResult<Json<AiAnalysis>> {
    let decision = payload
        .decision
        .ok_or_else(|| AppError::bad_request("decision is required"))?;

    info!(decision_id = %decision.id, inputs = decision.inputs.len(), "analysis requested");
    match state.model.analyze(&decision).await {
        Ok(analysis) => Ok(Json(analysis)),
        Err(err) => {
            error!(decision_id = %decision.id, error = %err, "analysis failed");
            Err(AppError::internal("Failed to analyze decision").with_message(err.to_string()))
        }
    }
}
