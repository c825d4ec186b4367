//! Prometheus scrape endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

/// Render metrics in the Prometheus text format
///
/// # Errors
///
/// Returns 503 when no recorder was installed.
#[allow(clippy::unused_async)]
pub async fn render_metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let handle = state
        .metrics()
        .ok_or_else(|| AppError::unavailable("Metrics recorder is not installed"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
