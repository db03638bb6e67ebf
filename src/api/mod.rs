//! API layer -- axum routes and handlers.

mod error;
mod routes;
pub mod state;

pub use self::error::ApiError;

use self::state::AppState;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "HydroVigil Backend Running" }))
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
