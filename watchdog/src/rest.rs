use crate::cycle::OfflineChecker;
use crate::metrics;
use crate::model::CycleReport;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    checker: Arc<OfflineChecker>,
}

pub fn create_router(checker: Arc<OfflineChecker>) -> Router {
    let state = AppState { checker };

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/checks", post(run_check))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_handler() -> Result<String, AppError> {
    Ok(metrics::gather_metrics()?)
}

/// Runs a cycle right away, outside the regular cadence.
async fn run_check(State(state): State<AppState>) -> Json<CycleReport> {
    info!("On-demand offline check requested");
    Json(state.checker.run_cycle_now().await)
}

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", self.0),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
