//! Prometheus metrics for the store runtime and the payment service.
//!
//! Call [`install_recorder`] once per process; the returned handle renders the
//! text exposition format for a `/metrics` route.
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_runtime::telemetry;
//!
//! # fn example() -> Result<(), telemetry::TelemetryError> {
//! let handle = telemetry::install_recorder()?;
//! let body = handle.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Register metric descriptions and install the global Prometheus recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::Install`] if a recorder is already installed in
/// this process.
pub fn install_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)
        .map_err(|e| TelemetryError::Build(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;

    describe_metrics();
    tracing::info!("Prometheus recorder installed");

    Ok(handle)
}

/// Build a recorder that is not installed globally.
///
/// Handy for tests and for callers that wire the recorder themselves.
#[must_use]
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn describe_metrics() {
    // Store
    describe_counter!("store.commands.total", "Actions accepted by a store");
    describe_counter!(
        "store.effects.executed",
        "Effects started by the store runtime, labelled by effect type"
    );
    describe_counter!(
        "store.effects.cancelled",
        "Running effects aborted through a cancellation id"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside a reducer per action"
    );
    describe_counter!("store.shutdown.initiated", "Graceful store shutdowns started");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Cart sync
    describe_counter!(
        "cart.sync.failures",
        "Remote cart or wishlist writes that failed after the local update"
    );
    describe_counter!(
        "cart.subscriptions.ended",
        "Cart or wishlist subscriptions that stopped delivering remote changes"
    );
    describe_counter!("cart.coupons.applied", "Coupons accepted and applied to a cart");
    describe_counter!("cart.coupons.rejected", "Coupon codes rejected, labelled by reason");

    // Payments
    describe_counter!("payments.orders.created", "Gateway orders created");
    describe_counter!("payments.orders.failed", "Gateway order creations that failed");
    describe_counter!(
        "payments.verifications",
        "Payment signature verifications, labelled by outcome"
    );
    describe_histogram!(
        "payments.gateway.duration_seconds",
        "Latency of payment gateway calls"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_renders_without_global_recorder() {
        let handle = detached_handle();
        assert!(!handle.render().contains("store_commands_total"));
    }
}
