//! # Storefront Web
//!
//! HTTP payment proxy for the storefront checkout. Two thin routes sit in
//! front of the Razorpay API so the key secret never reaches the browser:
//!
//! - `create-order` turns a major-unit amount into a gateway order
//! - `verify-payment` checks the HMAC the gateway returns after checkout
//!
//! Health, readiness and Prometheus metrics are served alongside.
//!
//! # Example
//!
//! ```ignore
//! use storefront_web::{AppState, Config, build_router};
//!
//! let config = Config::from_env();
//! let state = AppState::from_config(&config)?;
//! let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod signature;
pub mod state;

pub use config::{Config, RazorpayConfig, ServerConfig};
pub use error::AppError;
#[cfg(feature = "test-utils")]
pub use gateway::MockPaymentGateway;
pub use gateway::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway, RazorpayClient};
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use router::build_router;
pub use state::AppState;
