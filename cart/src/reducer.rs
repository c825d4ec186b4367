//! Cart reducer.
//!
//! Local state changes first; the remote mirror is updated by effects and never
//! rolls the local change back. The user's cart subscription is the eventual
//! reconciler: every remote value replaces the snapshot wholesale.

use crate::actions::CartAction;
use crate::coupon::{AppliedCoupon, CouponRejection, evaluate, is_valid_code, normalize_code};
use crate::error::CartError;
use crate::providers::{CouponLookup, RecordStore};
use crate::records::{ProductRecord, decode_cart, line_patch, paths};
use crate::sync;
use crate::types::{CartLine, CartState, Session, UserId};
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;
use storefront_core::effect::{Effect, EffectId};
use storefront_core::environment::Clock;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Cancellation id of the user's cart subscription
pub const CART_SUBSCRIPTION: EffectId = EffectId::from_static("cart-subscription");

/// Cancellation id of the in-flight coupon lookup
pub const COUPON_LOOKUP: EffectId = EffectId::from_static("coupon-lookup");

/// Collaborators for the cart reducer
pub struct CartEnvironment<R, C> {
    /// Remote mirror
    pub records: Arc<R>,
    /// Coupon source
    pub coupons: Arc<C>,
    /// Clock for coupon expiry
    pub clock: Arc<dyn Clock>,
}

impl<R, C> CartEnvironment<R, C> {
    /// Creates a new `CartEnvironment`
    #[must_use]
    pub fn new(records: Arc<R>, coupons: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records,
            coupons,
            clock,
        }
    }
}

impl<R, C> Clone for CartEnvironment<R, C> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            coupons: Arc::clone(&self.coupons),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Reducer for a single cart session
pub struct CartReducer<R, C> {
    _collaborators: PhantomData<fn() -> (R, C)>,
}

impl<R, C> CartReducer<R, C> {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _collaborators: PhantomData,
        }
    }
}

impl<R, C> Default for CartReducer<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C> Clone for CartReducer<R, C> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R, C> std::fmt::Debug for CartReducer<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CartReducer")
    }
}

impl<R, C> CartReducer<R, C>
where
    R: RecordStore + 'static,
    C: CouponLookup + 'static,
{
    /// Reset everything owned by the current session
    fn reset(state: &mut CartState, session: Session) {
        state.session = session;
        state.snapshot.clear();
        state.coupon = None;
        state.pending_coupon = None;
        state.coupon_notice = None;
        state.last_error = None;
    }

    /// Recompute the applied coupon after a subtotal change
    fn reprice(state: &mut CartState, env: &CartEnvironment<R, C>) {
        let subtotal = state.subtotal();
        let Some(applied) = state.coupon.as_mut() else {
            return;
        };

        if let Err(reason) = applied.reprice(subtotal, env.clock.now()) {
            tracing::info!(code = applied.code(), %reason, "Coupon no longer applies");
            metrics::counter!("cart.coupons.rejected", "reason" => reason.as_label()).increment(1);
            state.coupon = None;
            state.coupon_notice = Some(reason);
        }
    }

    /// Mirror a changed line, if bound to a user
    fn mirror_line(
        state: &CartState,
        env: &CartEnvironment<R, C>,
        line: &CartLine,
        patch: serde_json::Value,
    ) -> SmallVec<[Effect<CartAction>; 4]> {
        match state.session.user() {
            Some(user) => smallvec![sync::write(
                &env.records,
                paths::cart_line(user, &line.product_id),
                patch
            )],
            None => SmallVec::new(),
        }
    }

    fn subscribe(env: &CartEnvironment<R, C>, user: UserId) -> Effect<CartAction> {
        let path = paths::cart(&user);
        sync::subscribe(env.records.as_ref(), CART_SUBSCRIPTION, user, path, |user, value| {
            CartAction::ReplaceSnapshot {
                user: user.clone(),
                lines: decode_cart(user, value),
            }
        })
    }

    fn lookup_coupon(env: &CartEnvironment<R, C>, code: String) -> Effect<CartAction> {
        let coupons = Arc::clone(&env.coupons);
        Effect::Future(Box::pin(async move {
            let result = coupons.find(&code).await;
            Some(match result {
                Ok(coupon) => CartAction::CouponResolved { code, coupon },
                Err(error) => CartAction::CouponLookupFailed {
                    code,
                    error: error.to_string(),
                },
            })
        }))
        .cancellable(COUPON_LOOKUP)
    }

    fn reject_coupon(state: &mut CartState, reason: CouponRejection) {
        metrics::counter!("cart.coupons.rejected", "reason" => reason.as_label()).increment(1);
        state.coupon = None;
        state.coupon_notice = Some(reason);
        state.last_error = Some(CartError::CouponInvalid(reason));
    }
}

impl<R, C> Reducer for CartReducer<R, C>
where
    R: RecordStore + 'static,
    C: CouponLookup + 'static,
{
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment<R, C>;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Session ==========
            CartAction::SignedIn { user } => {
                if state.session.is_bound_to(&user) {
                    if state.subscribed {
                        return SmallVec::new();
                    }
                    tracing::info!(user = %user, "Re-opening cart subscription");
                    state.subscribed = true;
                    return smallvec![Self::subscribe(env, user)];
                }

                tracing::info!(user = %user, "Binding cart to user");
                Self::reset(state, Session::Authenticated(user.clone()));
                state.subscribed = true;

                smallvec![Effect::Cancel(COUPON_LOOKUP), Self::subscribe(env, user)]
            },

            CartAction::SignedOut => {
                if let Some(user) = state.session.user() {
                    tracing::info!(user = %user, "Unbinding cart");
                }
                Self::reset(state, Session::Anonymous);
                state.subscribed = false;

                smallvec![Effect::Cancel(CART_SUBSCRIPTION), Effect::Cancel(COUPON_LOOKUP)]
            },

            // ========== Commands ==========
            CartAction::AddItem { product } => {
                let Some(user) = state.session.user().cloned() else {
                    tracing::debug!(product_id = %product.id, "Add rejected: not signed in");
                    state.last_error = Some(CartError::AuthRequired);
                    return SmallVec::new();
                };

                let line = CartLine::from_product(&product);
                let record = ProductRecord::from_line(&line).to_value();
                if !state.snapshot.insert_if_absent(line) {
                    tracing::trace!(product_id = %product.id, "Already in cart");
                    return SmallVec::new();
                }
                state.last_error = None;
                Self::reprice(state, env);

                smallvec![sync::write(&env.records, paths::cart_line(&user, &product.id), record)]
            },

            CartAction::UpdateLine {
                product_id,
                quantity,
                selected_size,
                selected_color,
            } => {
                if quantity == 0 {
                    tracing::warn!(product_id = %product_id, "Ignoring update to quantity 0");
                    state.last_error = Some(CartError::InvalidQuantity);
                    return SmallVec::new();
                }

                let Some(line) = state.snapshot.get_mut(&product_id) else {
                    tracing::debug!(product_id = %product_id, "Update for a line not in the cart");
                    return SmallVec::new();
                };
                line.quantity = quantity;
                line.selected_size = selected_size;
                line.selected_color = selected_color;
                let line = line.clone();

                state.last_error = None;
                Self::reprice(state, env);
                Self::mirror_line(state, env, &line, line_patch(&line))
            },

            CartAction::IncrementQuantity { product_id } => {
                let Some(line) = state.snapshot.get_mut(&product_id) else {
                    return SmallVec::new();
                };
                line.quantity = line.quantity.saturating_add(1);
                let line = line.clone();

                Self::reprice(state, env);
                Self::mirror_line(state, env, &line, json!({ "quantity": line.quantity }))
            },

            CartAction::DecrementQuantity { product_id } => {
                let Some(line) = state.snapshot.get_mut(&product_id) else {
                    return SmallVec::new();
                };
                if line.quantity <= 1 {
                    return SmallVec::new();
                }
                line.quantity -= 1;
                let line = line.clone();

                Self::reprice(state, env);
                Self::mirror_line(state, env, &line, json!({ "quantity": line.quantity }))
            },

            CartAction::RemoveLine { product_id } => {
                if state.snapshot.remove(&product_id).is_none() {
                    return SmallVec::new();
                }
                Self::reprice(state, env);

                match state.session.user() {
                    Some(user) => smallvec![sync::delete(
                        &env.records,
                        paths::cart_line(user, &product_id)
                    )],
                    None => SmallVec::new(),
                }
            },

            CartAction::Clear => {
                let session = state.session.clone();
                Self::reset(state, session);

                match state.session.user() {
                    Some(user) => smallvec![
                        Effect::Cancel(COUPON_LOOKUP),
                        sync::delete(&env.records, paths::cart(user))
                    ],
                    None => SmallVec::new(),
                }
            },

            CartAction::ApplyCoupon { code } => {
                if state.session.user().is_none() {
                    state.last_error = Some(CartError::AuthRequired);
                    return SmallVec::new();
                }

                let code = normalize_code(&code);
                if !is_valid_code(&code) {
                    tracing::debug!(code = %code, "Rejecting unusable coupon code");
                    state.pending_coupon = None;
                    Self::reject_coupon(state, CouponRejection::NotFound);
                    return SmallVec::new();
                }

                tracing::debug!(code = %code, "Looking up coupon");
                state.pending_coupon = Some(code.clone());
                state.coupon_notice = None;
                smallvec![Self::lookup_coupon(env, code)]
            },

            CartAction::RemoveCoupon => {
                state.coupon = None;
                state.pending_coupon = None;
                state.coupon_notice = None;
                smallvec![Effect::Cancel(COUPON_LOOKUP)]
            },

            // ========== Effect results ==========
            CartAction::ReplaceSnapshot { user, lines } => {
                if !state.session.is_bound_to(&user) {
                    tracing::debug!(user = %user, "Discarding snapshot for an unbound user");
                    return SmallVec::new();
                }

                state.snapshot.replace(lines);
                Self::reprice(state, env);
                SmallVec::new()
            },

            CartAction::SyncFailed { path, error } => {
                tracing::warn!(path = %path, error = %error, "Remote sync failed, keeping local state");
                metrics::counter!("cart.sync.failures").increment(1);
                state.last_error = Some(CartError::RemoteWriteFailed {
                    path,
                    message: error,
                });
                SmallVec::new()
            },

            CartAction::SubscriptionEnded { user, path, error } => {
                if !state.session.is_bound_to(&user) {
                    return SmallVec::new();
                }
                tracing::warn!(user = %user, path = %path, error = %error, "Cart subscription ended");
                metrics::counter!("cart.subscriptions.ended").increment(1);
                state.subscribed = false;
                state.last_error = Some(CartError::SubscriptionLost {
                    path,
                    message: error,
                });
                SmallVec::new()
            },

            CartAction::CouponResolved { code, coupon } => {
                if state.pending_coupon.as_deref() != Some(code.as_str()) {
                    tracing::debug!(code = %code, "Discarding superseded coupon lookup");
                    return SmallVec::new();
                }
                state.pending_coupon = None;

                let evaluation = evaluate(state.subtotal(), coupon.as_ref(), env.clock.now());
                match (evaluation.reason, coupon) {
                    (None, Some(coupon)) => {
                        tracing::info!(code = %code, discount = %evaluation.discount, "Coupon applied");
                        metrics::counter!("cart.coupons.applied").increment(1);
                        state.coupon = Some(AppliedCoupon::new(Arc::new(coupon), evaluation.discount));
                        state.coupon_notice = None;
                        state.last_error = None;
                    },
                    (reason, _) => {
                        let reason = reason.unwrap_or(CouponRejection::NotFound);
                        tracing::info!(code = %code, %reason, "Coupon rejected");
                        Self::reject_coupon(state, reason);
                    },
                }
                SmallVec::new()
            },

            CartAction::CouponLookupFailed { code, error } => {
                if state.pending_coupon.as_deref() != Some(code.as_str()) {
                    return SmallVec::new();
                }
                tracing::warn!(code = %code, error = %error, "Coupon lookup failed");
                state.pending_coupon = None;
                state.coupon = None;
                state.last_error = Some(CartError::CouponLookup(error));
                SmallVec::new()
            },
        }
    }
}
