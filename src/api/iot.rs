use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::state::AppState;
use crate::services::resolver::{ScanError, ScanOutcome};

/// Body sent by a gate reader
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default, alias = "rfid_uid")]
    pub card_uid: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub outcome: ScanOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
    pub server_date: String,
    pub server_time: String,
    pub utc_offset: String,
    pub late_threshold: String,
}

/// HTTP status for each scan outcome. Rejections are 4xx, never 5xx.
pub fn outcome_status(outcome: &ScanOutcome) -> StatusCode {
    match outcome {
        ScanOutcome::ClockedIn { .. } | ScanOutcome::ClockedOut { .. } => StatusCode::OK,
        ScanOutcome::InvalidRequest { .. } | ScanOutcome::CardNotPaired { .. } => {
            StatusCode::BAD_REQUEST
        }
        ScanOutcome::CardInactive { .. } => StatusCode::FORBIDDEN,
        ScanOutcome::CardNotFound { .. } => StatusCode::NOT_FOUND,
        ScanOutcome::AlreadyCompleted { .. } => StatusCode::CONFLICT,
    }
}

fn respond(outcome: ScanOutcome) -> Response {
    let status = outcome_status(&outcome);
    let body = ScanResponse {
        success: outcome.is_success(),
        message: outcome.message(),
        outcome,
    };

    (status, Json(body)).into_response()
}

fn server_error(error: &ScanError) -> Response {
    tracing::error!(error = ?error, "Scan failed");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "code": "SERVER_ERROR",
            "message": "Internal server error",
        })),
    )
        .into_response()
}

/// Receives a card scan and answers with the attendance transition it caused
async fn scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Malformed scan request");
            return respond(ScanOutcome::InvalidRequest {
                reason: "Request body must be JSON with a card_uid".to_string(),
            });
        }
    };

    let card_uid = request.card_uid.unwrap_or_default();
    match state
        .resolver
        .scan(&card_uid, request.device_id.as_deref())
        .await
    {
        Ok(outcome) => respond(outcome),
        Err(e) => server_error(&e),
    }
}

/// Connectivity check for readers and dashboards
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (today, now) = state.clock().today_and_time();
    let policy = state.policy();

    Json(StatusResponse {
        success: true,
        message: "IoT endpoint active".to_string(),
        server_date: today.format("%Y-%m-%d").to_string(),
        server_time: now.format("%H:%M:%S").to_string(),
        utc_offset: policy.utc_offset.to_string(),
        late_threshold: policy.late_threshold.format("%H:%M:%S").to_string(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/iot/scan", post(scan))
        .route("/api/iot/status", get(status))
}
