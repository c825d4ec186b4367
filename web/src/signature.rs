//! Payment signature verification.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 keyed by
//! the merchant secret and sends the lowercase hex digest. Comparison is
//! constant time.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Verification failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// The provided signature does not match
    #[error("Invalid payment signature")]
    Mismatch,

    /// The secret cannot key the MAC
    #[error("Payment verification key is invalid")]
    InvalidKey,
}

/// Hex HMAC-SHA256 of `order_id|payment_id`
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] if the MAC rejects the key.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `signature` against the expected digest
///
/// # Errors
///
/// Returns [`SignatureError::Mismatch`] when the signature is wrong and
/// [`SignatureError::InvalidKey`] if the secret cannot key the MAC.
pub fn verify(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let expected = sign(secret, order_id, payment_id)?;
    if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
