//! Payment proxy endpoints.
//!
//! - `POST /api/razorpay/create-order`: create a gateway order for an amount
//!   in major units
//! - `POST /api/razorpay/verify-payment`: check the gateway's signature over
//!   `order_id|payment_id`

use crate::error::AppError;
use crate::gateway::OrderRequest;
use crate::signature::{self, SignatureError};
use crate::state::AppState;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use storefront_cart::Money;

/// Currency used when the request names none
pub const DEFAULT_CURRENCY: &str = "INR";

/// Body of `create-order`
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Amount in major units, must be positive
    #[serde(default)]
    pub amount: Option<f64>,
    /// ISO currency code, defaults to INR
    #[serde(default)]
    pub currency: Option<String>,
}

/// Successful `create-order` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Always true
    pub success: bool,
    /// Gateway order id
    pub order_id: String,
    /// Amount in minor units, as the gateway recorded it
    pub amount: u64,
    /// Currency, as the gateway recorded it
    pub currency: String,
}

/// Body of `verify-payment`, as posted by the checkout widget
#[derive(Debug, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    /// Gateway order id
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    /// Gateway payment id
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    /// Hex HMAC-SHA256 signature
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

/// Successful `verify-payment` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always true
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
    /// Verified payment id
    pub payment_id: String,
}

fn minor_amount(amount: Option<f64>) -> Option<Money> {
    amount
        .filter(|major| *major > 0.0)
        .and_then(Money::from_major)
        .filter(|money| *money > Money::ZERO)
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

/// Create a gateway order
///
/// The gateway receives `round(amount * 100)` minor units.
///
/// # Errors
///
/// - 400 when the body is malformed or the amount is missing or not positive
/// - 500 when the gateway fails or is not configured
#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let Json(request) = payload?;

    let amount = minor_amount(request.amount).ok_or_else(|| {
        tracing::debug!(amount = ?request.amount, "Rejecting order amount");
        AppError::bad_request("Invalid amount")
    })?;
    let currency = present(request.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let order = state
        .gateway()
        .create_order(OrderRequest::new(amount, currency))
        .await
        .map_err(|error| {
            metrics::counter!("payments.orders.failed").increment(1);
            AppError::from(error)
        })?;

    metrics::counter!("payments.orders.created").increment(1);
    tracing::info!(order_id = %order.id, amount = order.amount, currency = %order.currency, "Order created");

    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
    }))
}

/// Verify a payment signature
///
/// # Errors
///
/// - 400 when a field is missing or the signature does not match
/// - 500 when no verification secret is configured
#[tracing::instrument(skip_all)]
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let Json(request) = payload?;

    let (Some(order_id), Some(payment_id), Some(signature)) = (
        present(request.razorpay_order_id),
        present(request.razorpay_payment_id),
        present(request.razorpay_signature),
    ) else {
        return Err(AppError::bad_request("Missing required payment fields"));
    };

    let secret = state
        .verification_secret()
        .ok_or_else(|| AppError::internal("Payment verification is not configured"))?;

    match signature::verify(secret, &order_id, &payment_id, &signature) {
        Ok(()) => {
            metrics::counter!("payments.verifications", "result" => "valid").increment(1);
            tracing::info!(order_id = %order_id, payment_id = %payment_id, "Payment verified");
            Ok(Json(VerifyPaymentResponse {
                success: true,
                message: "Payment verified successfully".to_string(),
                payment_id,
            }))
        },
        Err(SignatureError::Mismatch) => {
            metrics::counter!("payments.verifications", "result" => "invalid").increment(1);
            tracing::warn!(order_id = %order_id, payment_id = %payment_id, "Payment signature mismatch");
            Err(AppError::bad_request("Invalid payment signature"))
        },
        Err(error @ SignatureError::InvalidKey) => {
            Err(AppError::internal("Payment verification failed").with_source(error))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_convert_to_minor_units() {
        assert_eq!(minor_amount(Some(499.5)), Some(Money::from_minor(49_950)));
        assert_eq!(minor_amount(Some(0.02)), Some(Money::from_minor(2)));
        assert_eq!(minor_amount(Some(0.0)), None);
        assert_eq!(minor_amount(Some(-10.0)), None);
        assert_eq!(minor_amount(Some(0.001)), None);
        assert_eq!(minor_amount(Some(f64::NAN)), None);
        assert_eq!(minor_amount(None), None);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some("pay_1".into())), Some("pay_1".into()));
    }
}
