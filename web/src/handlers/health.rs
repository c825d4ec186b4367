//! Liveness and readiness endpoints.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use storefront_runtime::{HealthCheck, HealthStatus};

/// Liveness: the process is serving requests
///
/// ```text
/// GET /health -> 200 "ok"
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: payment configuration
///
/// Missing credentials report `degraded` with 200, so the service stays in
/// rotation and the affected routes answer 500 on their own.
///
/// ```text
/// GET /health/ready -> 200 {"component":"payments","status":"Healthy",...}
/// ```
#[allow(clippy::unused_async)]
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let gateway_ready = state.gateway().is_configured();
    let verification_ready = state.verification_secret().is_some();

    let check = match (gateway_ready, verification_ready) {
        (true, true) => HealthCheck::healthy("payments"),
        (false, _) => HealthCheck::degraded("payments", "Payment gateway credentials are missing"),
        (true, false) => HealthCheck::degraded("payments", "Payment verification secret is missing"),
    }
    .with_metadata("gateway_configured", gateway_ready.to_string())
    .with_metadata("verification_configured", verification_ready.to_string());

    let status = match check.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPaymentGateway;
    use std::sync::Arc;

    #[tokio::test]
    async fn liveness_is_plain_ok() {
        assert_eq!(health_check().await, (StatusCode::OK, "ok"));
    }

    #[tokio::test]
    async fn readiness_reflects_the_secret() {
        let state = AppState::new(Arc::new(MockPaymentGateway::new()));

        let (status, Json(check)) = readiness_check(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check.status, HealthStatus::Degraded);

        let (_, Json(check)) = readiness_check(State(state.with_verification_secret("k"))).await;
        assert_eq!(check.status, HealthStatus::Healthy);
    }
}
