//! Facades over the runtime [`Store`] for the cart and wishlist.
//!
//! Commands return once the local state has changed; remote mirroring carries
//! on in the background.

use crate::actions::{CartAction, WishlistAction};
use crate::coupon::{AppliedCoupon, CouponRejection, is_valid_code, normalize_code};
use crate::error::CartError;
use crate::providers::{CouponLookup, RecordStore};
use crate::reducer::{CartEnvironment, CartReducer};
use crate::types::{CartLine, CartState, Money, Product, ProductId, Session, Totals, UserId};
use crate::wishlist::{WishlistEnvironment, WishlistReducer, WishlistState};
use std::time::Duration;
use storefront_runtime::{EffectHandle, HealthCheck, Store};

/// How long `apply_coupon` waits for the lookup
pub const COUPON_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime store specialised for the cart
pub type CartRuntime<R, C> = Store<CartState, CartAction, CartEnvironment<R, C>, CartReducer<R, C>>;

/// Runtime store specialised for the wishlist
pub type WishlistRuntime<R> = Store<WishlistState, WishlistAction, WishlistEnvironment<R>, WishlistReducer<R>>;

/// Result of `apply_coupon` once the lookup for `code` has been reduced
///
/// Only the lookup outcome and the coupon fields decide it; an unrelated
/// `last_error` from a write that failed meanwhile does not.
fn coupon_outcome(state: &CartState, code: &str, outcome: CartAction) -> Result<Money, CartError> {
    if let CartAction::CouponLookupFailed { error, .. } = outcome {
        return Err(CartError::CouponLookup(error));
    }
    match &state.coupon {
        Some(applied) if applied.code() == code => Ok(applied.discount()),
        _ => Err(CartError::CouponInvalid(
            state.coupon_notice.unwrap_or(CouponRejection::NotFound),
        )),
    }
}

/// Cart for one client session
pub struct CartStore<R, C>
where
    R: RecordStore + 'static,
    C: CouponLookup + 'static,
{
    store: CartRuntime<R, C>,
}

impl<R, C> Clone for CartStore<R, C>
where
    R: RecordStore + 'static,
    C: CouponLookup + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<R, C> CartStore<R, C>
where
    R: RecordStore + 'static,
    C: CouponLookup + 'static,
{
    /// Anonymous, empty cart
    #[must_use]
    pub fn new(environment: CartEnvironment<R, C>) -> Self {
        Self {
            store: Store::new(CartState::default(), CartReducer::new(), environment),
        }
    }

    /// Underlying runtime store
    #[must_use]
    pub const fn runtime(&self) -> &CartRuntime<R, C> {
        &self.store
    }

    /// Send any cart action
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn dispatch(&self, action: CartAction) -> Result<EffectHandle, CartError> {
        Ok(self.store.send(action).await?)
    }

    /// Bind to `user` and start mirroring their remote cart
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn sign_in(&self, user: UserId) -> Result<(), CartError> {
        self.dispatch(CartAction::SignedIn { user }).await.map(drop)
    }

    /// Drop the binding, the subscription and the local cart
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn sign_out(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::SignedOut).await.map(drop)
    }

    /// Add `product`; `false` when nobody is signed in
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn add_item(&self, product: Product) -> Result<bool, CartError> {
        self.dispatch(CartAction::AddItem { product }).await?;
        Ok(self
            .store
            .state(|s| s.session.user().is_some() && s.last_error != Some(CartError::AuthRequired))
            .await)
    }

    /// Set quantity and variant of a line
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for quantity 0, or
    /// [`CartError::Store`] if the store is shutting down.
    pub async fn update_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        selected_size: impl Into<String>,
        selected_color: impl Into<String>,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.dispatch(CartAction::UpdateLine {
            product_id,
            quantity,
            selected_size: selected_size.into(),
            selected_color: selected_color.into(),
        })
        .await
        .map(drop)
    }

    /// Quantity + 1
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn increment_quantity(&self, product_id: ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::IncrementQuantity { product_id }).await.map(drop)
    }

    /// Quantity - 1, stopping at 1
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn decrement_quantity(&self, product_id: ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::DecrementQuantity { product_id }).await.map(drop)
    }

    /// Remove a line; no-op when absent
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn remove_line(&self, product_id: ProductId) -> Result<(), CartError> {
        self.dispatch(CartAction::RemoveLine { product_id }).await.map(drop)
    }

    /// Empty the cart locally and remotely (after checkout)
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn clear(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::Clear).await.map(drop)
    }

    /// Look up and apply `code`, returning the discount
    ///
    /// # Errors
    ///
    /// - [`CartError::CouponInvalid`] with the rejection reason
    /// - [`CartError::CouponLookup`] on transport failure
    /// - [`CartError::AuthRequired`] when nobody is signed in
    /// - [`CartError::Store`] on shutdown or lookup timeout
    pub async fn apply_coupon(&self, code: &str) -> Result<Money, CartError> {
        let normalized = normalize_code(code);
        let action = CartAction::ApplyCoupon {
            code: code.to_string(),
        };
        let bound = self.store.state(|s| s.session.user().is_some()).await;

        if !bound {
            self.store.send(action).await?;
            return Err(CartError::AuthRequired);
        }
        if !is_valid_code(&normalized) {
            self.store.send(action).await?;
            return Err(CartError::CouponInvalid(CouponRejection::NotFound));
        }

        let expected = normalized.clone();
        let outcome = self
            .store
            .send_and_wait_for(
                action,
                move |action| {
                    matches!(
                        action,
                        CartAction::CouponResolved { code, .. }
                            | CartAction::CouponLookupFailed { code, .. }
                            if *code == expected
                    )
                },
                COUPON_LOOKUP_TIMEOUT,
            )
            .await?;

        self.store.state(|s| coupon_outcome(s, &normalized, outcome)).await
    }

    /// Drop the applied coupon
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn remove_coupon(&self) -> Result<(), CartError> {
        self.dispatch(CartAction::RemoveCoupon).await.map(drop)
    }

    /// Sum of line totals
    pub async fn subtotal(&self) -> Money {
        self.store.state(CartState::subtotal).await
    }

    /// Subtotal, discount and total
    pub async fn totals(&self) -> Totals {
        self.store.state(CartState::totals).await
    }

    /// Lines in order
    pub async fn lines(&self) -> Vec<CartLine> {
        self.store.state(|s| s.snapshot.lines().to_vec()).await
    }

    /// Whether remote changes are currently being applied
    pub async fn is_subscribed(&self) -> bool {
        self.store.state(|s| s.subscribed).await
    }

    /// Current binding
    pub async fn session(&self) -> Session {
        self.store.state(|s| s.session.clone()).await
    }

    /// Applied coupon
    pub async fn coupon(&self) -> Option<AppliedCoupon> {
        self.store.state(|s| s.coupon.clone()).await
    }

    /// Why the last coupon was rejected or dropped
    pub async fn coupon_notice(&self) -> Option<CouponRejection> {
        self.store.state(|s| s.coupon_notice).await
    }

    /// Last failure
    pub async fn last_error(&self) -> Option<CartError> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Runtime health
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        self.store.health()
    }

    /// Stop the subscription and wait for pending writes
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if writes are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), CartError> {
        Ok(self.store.shutdown(timeout).await?)
    }
}

/// Wishlist for one client session
pub struct WishlistStore<R>
where
    R: RecordStore + 'static,
{
    store: WishlistRuntime<R>,
}

impl<R> Clone for WishlistStore<R>
where
    R: RecordStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<R> WishlistStore<R>
where
    R: RecordStore + 'static,
{
    /// Anonymous, empty wishlist
    #[must_use]
    pub fn new(environment: WishlistEnvironment<R>) -> Self {
        Self {
            store: Store::new(WishlistState::default(), WishlistReducer::new(), environment),
        }
    }

    /// Underlying runtime store
    #[must_use]
    pub const fn runtime(&self) -> &WishlistRuntime<R> {
        &self.store
    }

    /// Send any wishlist action
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn dispatch(&self, action: WishlistAction) -> Result<EffectHandle, CartError> {
        Ok(self.store.send(action).await?)
    }

    /// Bind to `user`
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn sign_in(&self, user: UserId) -> Result<(), CartError> {
        self.dispatch(WishlistAction::SignedIn { user }).await.map(drop)
    }

    /// Drop the binding and clear local entries
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn sign_out(&self) -> Result<(), CartError> {
        self.dispatch(WishlistAction::SignedOut).await.map(drop)
    }

    /// Save or unsave `product`; `false` when nobody is signed in
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn toggle(&self, product: Product) -> Result<bool, CartError> {
        self.dispatch(WishlistAction::Toggle { product }).await?;
        Ok(self
            .store
            .state(|s| s.session.user().is_some() && s.last_error != Some(CartError::AuthRequired))
            .await)
    }

    /// Unsave `product_id`
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if the store is shutting down.
    pub async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        self.dispatch(WishlistAction::Remove { product_id }).await.map(drop)
    }

    /// Saved products
    pub async fn entries(&self) -> Vec<Product> {
        self.store.state(|s| s.entries.clone()).await
    }

    /// Whether `product_id` is saved
    pub async fn contains(&self, product_id: &ProductId) -> bool {
        self.store.state(|s| s.contains(product_id)).await
    }

    /// Stop the subscription and wait for pending writes
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Store`] if writes are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), CartError> {
        Ok(self.store.shutdown(timeout).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::{CouponRecord, DiscountKind};
    use std::sync::Arc;

    fn save10() -> CouponRecord {
        CouponRecord {
            code: "SAVE10".into(),
            discount: DiscountKind::Percentage { basis_points: 1_000 },
            min_subtotal: Some(Money::from_minor(50_000)),
            expires_at: None,
        }
    }

    fn resolved() -> CartAction {
        CartAction::CouponResolved {
            code: "SAVE10".into(),
            coupon: Some(save10()),
        }
    }

    fn write_failed() -> Option<CartError> {
        Some(CartError::RemoteWriteFailed {
            path: "customers/u1/cart/products/p".into(),
            message: "offline".into(),
        })
    }

    #[test]
    fn rejection_wins_over_a_later_write_failure() {
        let state = CartState {
            coupon_notice: Some(CouponRejection::BelowMinimum),
            last_error: write_failed(),
            ..CartState::default()
        };

        assert_eq!(
            coupon_outcome(&state, "SAVE10", resolved()),
            Err(CartError::CouponInvalid(CouponRejection::BelowMinimum))
        );
    }

    #[test]
    fn applied_coupon_wins_over_a_later_write_failure() {
        let state = CartState {
            coupon: Some(AppliedCoupon::new(Arc::new(save10()), Money::from_minor(6_000))),
            last_error: write_failed(),
            ..CartState::default()
        };

        assert_eq!(coupon_outcome(&state, "SAVE10", resolved()), Ok(Money::from_minor(6_000)));
    }

    #[test]
    fn lookup_failure_is_taken_from_the_action() {
        let state = CartState {
            last_error: write_failed(),
            ..CartState::default()
        };
        let failed = CartAction::CouponLookupFailed {
            code: "SAVE10".into(),
            error: "timeout".into(),
        };

        assert_eq!(
            coupon_outcome(&state, "SAVE10", failed),
            Err(CartError::CouponLookup("timeout".into()))
        );
    }
}
