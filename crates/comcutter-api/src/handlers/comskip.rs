//! Submission and status handlers.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use comcutter_queue::SubmitError;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Body of `POST /comskip`.
#[derive(Debug, Deserialize)]
pub struct ComskipRequest {
    pub api: Option<String>,
    pub file: Option<String>,
}

/// Outcome of a submission.
#[derive(Debug, Serialize)]
pub struct ComskipResponse {
    pub success: bool,
    pub msg: String,
    /// The path exactly as the caller sent it
    pub file: String,
}

/// Queue a library file for commercial removal.
///
/// The body is read as JSON whatever the content type says.
pub async fn submit_comskip(
    State(state): State<AppState>,
    ip: ClientIp,
    body: Bytes,
) -> ApiResult<Json<ComskipResponse>> {
    let request: ComskipRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!("[{}] invalid request body: {}", ip, e);
        ApiError::bad_request("invalid request body")
    })?;

    match request.api.as_deref() {
        None => {
            warn!("[{}] unauthorized: no api key", ip);
            return Err(ApiError::Unauthorized);
        }
        Some(key) if !state.authorized(Some(key)) => {
            warn!("[{}] unauthorized: incorrect api key", ip);
            return Err(ApiError::Unauthorized);
        }
        Some(_) => {}
    }

    let file = match request.file {
        Some(file) if !file.is_empty() => file,
        _ => {
            debug!("[{}] file not specified", ip);
            return Err(ApiError::bad_request("file not specified"));
        }
    };

    let (success, msg) = match state.dispatcher.submit(&ip.to_string(), &file).await {
        Ok(_) => (true, "processing".to_string()),
        Err(SubmitError::Queue(e)) => return Err(e.into()),
        Err(e) => (false, e.message()),
    };

    Ok(Json(ComskipResponse { success, msg, file }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub api: Option<String>,
}

/// Snapshot of the pool.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Paths accepted and not yet finished, sorted
    pub in_flight: Vec<String>,
    pub queued: usize,
    pub workers: usize,
}

/// Report in-flight and queued work.
pub async fn get_status(
    State(state): State<AppState>,
    ip: ClientIp,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<StatusResponse>> {
    if !state.authorized(query.api.as_deref()) {
        warn!("[{}] unauthorized status request", ip);
        return Err(ApiError::Unauthorized);
    }

    let in_flight = state
        .dispatcher
        .in_flight()
        .paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    Ok(Json(StatusResponse {
        in_flight,
        queued: state.dispatcher.queued(),
        workers: state.workers,
    }))
}
