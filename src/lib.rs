//! HydroVigil -- sensor anomaly scoring and fault deduplication for water monitoring.
//!
//! This crate scores normalized multivariate sensor windows into NORMAL / SUSPICIOUS /
//! ATTACK tiers and keeps a small SQLite fault log in which recurring faults are
//! recognized and answered with their recorded remediation.

pub mod api;
pub mod config;
pub mod detect;
pub mod faults;
pub mod model;
pub mod pipeline;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::model::ModelBundle;

/// Load the model bundle as configured: strictly, or with the embedded fallback.
pub fn load_model(config: &Config) -> Result<ModelBundle> {
    let path = &config.model.bundle_path;
    if config.model.require_bundle {
        return ModelBundle::load(path)
            .with_context(|| format!("model bundle required at {}", path.display()));
    }
    Ok(ModelBundle::load_or_default(path))
}

/// Build the shared analyzer and fault logger from configuration.
pub fn build_state(config: &Config) -> Result<api::state::AppState> {
    tracing::info!(db_path = %config.storage.db_path, "Initializing database");
    let pool = storage::open_pool(&config.storage.db_path)?;
    let bundle = load_model(config)?;

    Ok(api::state::AppState {
        analyzer: Arc::new(pipeline::Analyzer::new(Arc::new(bundle))),
        faults: faults::FaultLogger::with_defaults(pool, config.faults.defaults()),
        list_limit: config.faults.list_limit,
    })
}

/// Start the HydroVigil API server.
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    let app = api::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    tracing::info!(%addr, "HydroVigil listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
