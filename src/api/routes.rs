//! API route definitions.

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::detect::{ScoreResult, SensorMatrix};
use crate::faults::{FaultSignature, Outcome};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/faults", get(list_faults))
        .route("/faults/resolve", post(resolve_fault))
        .route("/faults/match", get(match_fault))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "features": state.analyzer.feature_count()
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    sensor_data: Value,
    #[serde(default)]
    affected_sensor: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    #[serde(flatten)]
    result: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<Outcome>,
}

async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let raw = SensorMatrix::from_json(&req.sensor_data)?;

    let Some(sensor) = req.affected_sensor else {
        let analysis = state.analyzer.analyze(&raw)?;
        return Ok(Json(PredictResponse {
            result: analysis.result,
            fault: None,
        }));
    };

    let (analysis, fault) = tokio::task::spawn_blocking(move || {
        state
            .analyzer
            .analyze_and_resolve(&raw, &sensor, &state.faults)
    })
    .await??;

    Ok(Json(PredictResponse {
        result: analysis.result,
        fault,
    }))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    #[serde(flatten)]
    signature: FaultSignature,
    #[serde(default)]
    solution: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

async fn resolve_fault(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || match (req.solution, req.remarks) {
        (None, None) => state.faults.resolve_fault(&req.signature),
        (solution, remarks) => {
            let defaults = state.faults.defaults();
            state.faults.resolve_fault_with(
                &req.signature,
                solution.as_deref().unwrap_or(&defaults.solution),
                remarks.as_deref().unwrap_or(&defaults.remarks),
            )
        }
    })
    .await??;

    Ok(Json(json!({ "data": outcome })))
}

#[derive(Debug, Deserialize)]
struct MatchQuery {
    mean_error: f64,
    max_error: f64,
    affected_sensor: String,
}

async fn match_fault(
    State(state): State<AppState>,
    Query(q): Query<MatchQuery>,
) -> Result<Json<Value>, ApiError> {
    let signature = FaultSignature {
        fault_type: String::new(),
        mean_error: q.mean_error,
        max_error: q.max_error,
        affected_sensor: q.affected_sensor,
        severity: String::new(),
    };
    let known = tokio::task::spawn_blocking(move || state.faults.find_similar(&signature)).await??;
    Ok(Json(json!({ "data": known })))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_faults(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = q.limit.unwrap_or(state.list_limit);
    let faults = tokio::task::spawn_blocking(move || state.faults.list_recent(limit)).await??;
    Ok(Json(json!({ "data": faults, "meta": { "total": faults.len() } })))
}
