//! Shared handler state.

use crate::config::Config;
use crate::gateway::{GatewayResult, PaymentGateway, RazorpayClient};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State shared by every handler; cloned per request
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn PaymentGateway>,
    verification_secret: Option<Arc<str>>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State around `gateway`, with no verification secret or metrics
    #[must_use]
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            gateway,
            verification_secret: None,
            metrics: None,
        }
    }

    /// Razorpay-backed state from configuration
    ///
    /// # Errors
    ///
    /// Returns a gateway error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        let gateway = RazorpayClient::new(&config.razorpay)?;
        let state = Self::new(Arc::new(gateway));

        Ok(match &config.razorpay.key_secret {
            Some(secret) => state.with_verification_secret(secret.as_str()),
            None => state,
        })
    }

    /// Key for payment signature checks
    #[must_use]
    pub fn with_verification_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.verification_secret = Some(secret.into());
        self
    }

    /// Prometheus handle rendered at `/metrics`
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Payment gateway
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    /// Signature key, if configured
    #[must_use]
    pub fn verification_secret(&self) -> Option<&str> {
        self.verification_secret.as_deref()
    }

    /// Metrics handle, if installed
    #[must_use]
    pub const fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{RazorpayConfig, ServerConfig};

    fn config(secret: Option<&str>) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                shutdown_timeout: 1,
            },
            razorpay: RazorpayConfig {
                key_id: secret.map(|_| "rzp_test".to_string()),
                key_secret: secret.map(str::to_string),
                ..RazorpayConfig::default()
            },
        }
    }

    #[test]
    fn from_config_wires_the_secret() {
        let state = AppState::from_config(&config(Some("shh"))).unwrap();
        assert_eq!(state.verification_secret(), Some("shh"));
        assert!(state.gateway().is_configured());

        let state = AppState::from_config(&config(None)).unwrap();
        assert!(state.verification_secret().is_none());
        assert!(!state.gateway().is_configured());
        assert!(state.metrics().is_none());
    }
}
