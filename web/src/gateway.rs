//! Payment gateway client.
//!
//! [`PaymentGateway`] is the seam the handlers talk to. [`RazorpayClient`]
//! creates orders through the Razorpay REST API; [`MockPaymentGateway`]
//! records requests and returns canned orders.

use crate::config::RazorpayConfig;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use storefront_cart::Money;
use thiserror::Error;

/// Gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed future returned by [`PaymentGateway`] methods
pub type GatewayFuture<T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send>>;

/// Payment gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Key id or secret missing
    #[error("Payment gateway credentials are not configured")]
    NotConfigured,

    /// Transport failure
    #[error("Payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an error status
    #[error("Payment gateway rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Gateway's description, or the raw body
        message: String,
    },

    /// Gateway answered 2xx with an unexpected body
    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),
}

/// Order to create, amount in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in minor units
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
    /// Merchant receipt id
    pub receipt: String,
}

impl OrderRequest {
    /// Order for `amount` with a fresh receipt id
    #[must_use]
    pub fn new(amount: Money, currency: impl Into<String>) -> Self {
        Self {
            amount: amount.minor(),
            currency: currency.into(),
            receipt: format!("rcpt_{}", uuid::Uuid::new_v4().simple()),
        }
    }
}

/// Order as returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id
    pub id: String,
    /// Amount in minor units
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
    /// Gateway status, e.g. `created`
    #[serde(default)]
    pub status: String,
}

/// Payment gateway operations used by the proxy
pub trait PaymentGateway: Send + Sync {
    /// Create an order
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the gateway is unreachable, not configured,
    /// or rejects the order.
    fn create_order(&self, request: OrderRequest) -> GatewayFuture<GatewayOrder>;

    /// Whether the gateway has what it needs to accept orders
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    description: String,
}

/// Razorpay REST client
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    credentials: Option<(String, String)>,
    orders_url: String,
}

impl RazorpayClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &RazorpayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let credentials = config.key_id.clone().zip(config.key_secret.clone());

        Ok(Self {
            http,
            credentials,
            orders_url: format!("{}/v1/orders", config.api_base),
        })
    }
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("orders_url", &self.orders_url)
            .field("configured", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl PaymentGateway for RazorpayClient {
    fn create_order(&self, request: OrderRequest) -> GatewayFuture<GatewayOrder> {
        let http = self.http.clone();
        let credentials = self.credentials.clone();
        let url = self.orders_url.clone();

        Box::pin(async move {
            let (key_id, key_secret) = credentials.ok_or(GatewayError::NotConfigured)?;
            let started = Instant::now();

            let response = http
                .post(&url)
                .basic_auth(key_id, Some(key_secret))
                .json(&request)
                .send()
                .await;
            metrics::histogram!("payments.gateway.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            let response = response?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map_or(body, |envelope| envelope.error.description);
                return Err(GatewayError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
        })
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockPaymentGateway;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::{GatewayError, GatewayFuture, GatewayOrder, OrderRequest, PaymentGateway};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Gateway that records requests and answers with `order_mock_*` ids
    #[derive(Clone, Debug, Default)]
    pub struct MockPaymentGateway {
        requests: Arc<Mutex<Vec<OrderRequest>>>,
        failure: Arc<Mutex<Option<String>>>,
    }

    impl MockPaymentGateway {
        /// Gateway that accepts every order
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every order with `message`; `None` restores service
        pub fn fail_with(&self, message: Option<&str>) {
            *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
        }

        /// Requests received so far
        #[must_use]
        pub fn requests(&self) -> Vec<OrderRequest> {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    impl PaymentGateway for MockPaymentGateway {
        fn create_order(&self, request: OrderRequest) -> GatewayFuture<GatewayOrder> {
            let failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone();
            let count = {
                let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
                requests.push(request.clone());
                requests.len()
            };

            Box::pin(async move {
                if let Some(message) = failure {
                    return Err(GatewayError::Rejected { status: 502, message });
                }
                Ok(GatewayOrder {
                    id: format!("order_mock_{count}"),
                    amount: request.amount,
                    currency: request.currency,
                    status: "created".to_string(),
                })
            })
        }
    }
}
