//! Configuration for the payment proxy.
//!
//! Loaded from environment variables with defaults; the binary calls
//! `dotenvy::dotenv()` first so a local `.env` file works too.

use std::env;
use std::fmt;
use std::time::Duration;

/// Default Razorpay REST endpoint
pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// Payment gateway credentials
    pub razorpay: RazorpayConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown grace period
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

/// Razorpay credentials and endpoint
///
/// Both keys are optional so the service can start without them; order
/// creation then fails with a gateway error and verification with a 500.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id
    pub key_id: Option<String>,
    /// Secret key, also the HMAC key for payment signatures
    pub key_secret: Option<String>,
    /// API root, without a trailing slash
    pub api_base: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl RazorpayConfig {
    /// Whether both keys are present
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.key_id.is_some() && self.key_secret.is_some()
    }

    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: 15,
        }
    }
}

// The secret never reaches logs
impl fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &self.key_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// | variable | default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `SHUTDOWN_TIMEOUT` | `30` |
    /// | `RAZORPAY_KEY_ID` | unset |
    /// | `RAZORPAY_KEY_SECRET` | unset |
    /// | `RAZORPAY_API_BASE` | `https://api.razorpay.com` |
    /// | `RAZORPAY_TIMEOUT` | `15` |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            razorpay: RazorpayConfig {
                key_id: non_empty("RAZORPAY_KEY_ID"),
                key_secret: non_empty("RAZORPAY_KEY_SECRET"),
                api_base: non_empty("RAZORPAY_API_BASE")
                    .map_or_else(|| DEFAULT_API_BASE.to_string(), |base| base.trim_end_matches('/').to_string()),
                timeout: env::var("RAZORPAY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            },
        }
    }
}
