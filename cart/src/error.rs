//! Error types for the cart and wishlist stores.

use crate::coupon::CouponRejection;
use storefront_runtime::StoreError;
use thiserror::Error;

/// Failures surfaced by the cart and wishlist stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Command needs a signed-in user
    #[error("Sign in to add items")]
    AuthRequired,

    /// A remote mirror write failed; local state was kept
    #[error("Failed to sync {path}: {message}")]
    RemoteWriteFailed {
        /// Record path
        path: String,
        /// Transport or server message
        message: String,
    },

    /// The live subscription died; remote changes are no longer applied
    #[error("Stopped syncing {path}: {message}")]
    SubscriptionLost {
        /// Subscribed path
        path: String,
        /// Failure message
        message: String,
    },

    /// Coupon rejected
    #[error("{0}")]
    CouponInvalid(CouponRejection),

    /// Coupon lookup failed in transport
    #[error("Coupon lookup failed: {0}")]
    CouponLookup(String),

    /// Quantity must be at least 1
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The store runtime refused the command
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the record store
#[derive(Error, Debug)]
pub enum RecordStoreError {
    /// Transport failure
    #[error("Record store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response
    #[error("Record store returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Payload did not match the expected shape
    #[error("Malformed record at {path}: {message}")]
    Decode {
        /// Record path
        path: String,
        /// Decoder message
        message: String,
    },

    /// Server cancelled the subscription (rules denied the read)
    #[error("Subscription to {0} was cancelled by the server")]
    SubscriptionCancelled(String),

    /// Server closed the event stream
    #[error("Subscription to {0} was closed by the server")]
    SubscriptionClosed(String),

    /// Auth token expired or was revoked mid-subscription
    #[error("Auth revoked for subscription to {0}")]
    AuthRevoked(String),

    /// Store unavailable (used by the in-memory store for fault injection)
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for record store calls
pub type Result<T> = std::result::Result<T, RecordStoreError>;
