//! Route table.

use crate::handlers::{create_order, health_check, readiness_check, render_metrics, verify_payment};
use crate::middleware::request_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the service router
///
/// | method | path |
/// |--------|------|
/// | GET | `/health` |
/// | GET | `/health/ready` |
/// | GET | `/metrics` |
/// | POST | `/api/razorpay/create-order` |
/// | POST | `/api/razorpay/verify-payment` |
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let payments = Router::new()
        .route("/create-order", post(create_order))
        .route("/verify-payment", post(verify_payment));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/metrics", get(render_metrics))
        .nest("/api/razorpay", payments)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
