//! HTTP handlers.

pub mod health;
pub mod metrics;
pub mod payments;

pub use health::{health_check, readiness_check};
pub use metrics::render_metrics;
pub use payments::{create_order, verify_payment};
