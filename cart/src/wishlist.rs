//! Wishlist reducer: the cart's lifecycle applied to saved products.

use crate::actions::WishlistAction;
use crate::error::CartError;
use crate::providers::RecordStore;
use crate::records::{ProductRecord, decode_wishlist, paths};
use crate::sync;
use crate::types::{Product, ProductId, Session};
use std::marker::PhantomData;
use std::sync::Arc;
use storefront_core::effect::{Effect, EffectId};
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Cancellation id of the user's wishlist subscription
pub const WISHLIST_SUBSCRIPTION: EffectId = EffectId::from_static("wishlist-subscription");

/// Wishlist reducer state
#[derive(Clone, Debug, Default)]
pub struct WishlistState {
    /// Current binding
    pub session: Session,
    /// Saved products, at most one per id
    pub entries: Vec<Product>,
    /// Whether the remote subscription for the bound user is live
    pub subscribed: bool,
    /// Last failure
    pub last_error: Option<CartError>,
}

impl WishlistState {
    /// Whether `product_id` is saved
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|entry| &entry.id == product_id)
    }

    fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.id != product_id);
        self.entries.len() != before
    }

    fn replace(&mut self, entries: Vec<Product>) {
        self.entries.clear();
        for entry in entries {
            self.remove(&entry.id);
            self.entries.push(entry);
        }
    }
}

/// Collaborators for the wishlist reducer
pub struct WishlistEnvironment<R> {
    /// Remote mirror
    pub records: Arc<R>,
}

impl<R> WishlistEnvironment<R> {
    /// Creates a new `WishlistEnvironment`
    #[must_use]
    pub const fn new(records: Arc<R>) -> Self {
        Self { records }
    }
}

impl<R> Clone for WishlistEnvironment<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

/// Reducer for a single wishlist session
pub struct WishlistReducer<R> {
    _records: PhantomData<fn() -> R>,
}

impl<R> WishlistReducer<R> {
    /// Creates a new `WishlistReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _records: PhantomData,
        }
    }
}

impl<R> Default for WishlistReducer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for WishlistReducer<R> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<R: RecordStore + 'static> Reducer for WishlistReducer<R> {
    type State = WishlistState;
    type Action = WishlistAction;
    type Environment = WishlistEnvironment<R>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            WishlistAction::SignedIn { user } => {
                if state.session.is_bound_to(&user) {
                    if state.subscribed {
                        return SmallVec::new();
                    }
                    tracing::info!(user = %user, "Re-opening wishlist subscription");
                } else {
                    state.session = Session::Authenticated(user.clone());
                    state.entries.clear();
                    state.last_error = None;
                }
                state.subscribed = true;

                let path = paths::wishlist(&user);
                smallvec![sync::subscribe(
                    env.records.as_ref(),
                    WISHLIST_SUBSCRIPTION,
                    user,
                    path,
                    |user, value| WishlistAction::ReplaceSnapshot {
                        user: user.clone(),
                        entries: decode_wishlist(user, value),
                    }
                )]
            },

            WishlistAction::SignedOut => {
                state.session = Session::Anonymous;
                state.subscribed = false;
                state.entries.clear();
                state.last_error = None;
                smallvec![Effect::Cancel(WISHLIST_SUBSCRIPTION)]
            },

            WishlistAction::Toggle { product } => {
                let Some(user) = state.session.user().cloned() else {
                    state.last_error = Some(CartError::AuthRequired);
                    return SmallVec::new();
                };
                state.last_error = None;
                let path = paths::wishlist_entry(&user, &product.id);

                if state.remove(&product.id) {
                    tracing::debug!(product_id = %product.id, "Removed from wishlist");
                    smallvec![sync::delete(&env.records, path)]
                } else {
                    tracing::debug!(product_id = %product.id, "Saved to wishlist");
                    let record = ProductRecord::from_product(&product).to_value();
                    state.entries.push(product);
                    smallvec![sync::write(&env.records, path, record)]
                }
            },

            WishlistAction::Remove { product_id } => {
                if !state.remove(&product_id) {
                    return SmallVec::new();
                }
                match state.session.user() {
                    Some(user) => smallvec![sync::delete(
                        &env.records,
                        paths::wishlist_entry(user, &product_id)
                    )],
                    None => SmallVec::new(),
                }
            },

            WishlistAction::ReplaceSnapshot { user, entries } => {
                if state.session.is_bound_to(&user) {
                    state.replace(entries);
                } else {
                    tracing::debug!(user = %user, "Discarding wishlist for an unbound user");
                }
                SmallVec::new()
            },

            WishlistAction::SubscriptionEnded { user, path, error } => {
                if state.session.is_bound_to(&user) {
                    tracing::warn!(user = %user, path = %path, error = %error, "Wishlist subscription ended");
                    metrics::counter!("cart.subscriptions.ended").increment(1);
                    state.subscribed = false;
                    state.last_error = Some(CartError::SubscriptionLost {
                        path,
                        message: error,
                    });
                }
                SmallVec::new()
            },

            WishlistAction::SyncFailed { path, error } => {
                tracing::warn!(path = %path, error = %error, "Wishlist sync failed, keeping local state");
                metrics::counter!("cart.sync.failures").increment(1);
                state.last_error = Some(CartError::RemoteWriteFailed {
                    path,
                    message: error,
                });
                SmallVec::new()
            },
        }
    }
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use crate::mocks::InMemoryRecordStore;
    use crate::types::{Money, UserId};
    use storefront_testing::{ReducerTest, assertions};

    fn env() -> WishlistEnvironment<InMemoryRecordStore> {
        WishlistEnvironment::new(Arc::new(InMemoryRecordStore::new()))
    }

    fn lamp() -> Product {
        Product {
            id: ProductId::new("lamp"),
            name: "Lamp".into(),
            list_price: Money::from_minor(2_500),
            sale_price: None,
            thumbnail: String::new(),
            slug: "lamp".into(),
        }
    }

    fn signed_in() -> WishlistState {
        WishlistState {
            session: Session::Authenticated(UserId::new("u1")),
            ..WishlistState::default()
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        ReducerTest::new(WishlistReducer::<InMemoryRecordStore>::new())
            .with_env(env())
            .given_state(signed_in())
            .when_action(WishlistAction::Toggle { product: lamp() })
            .then_state(|state| assert!(state.contains(&ProductId::new("lamp"))))
            .then_effects(assertions::assert_has_future_effect)
            .run();

        ReducerTest::new(WishlistReducer::<InMemoryRecordStore>::new())
            .with_env(env())
            .given_state(signed_in())
            .when_action(WishlistAction::Toggle { product: lamp() })
            .when_action(WishlistAction::Toggle { product: lamp() })
            .then_state(|state| assert!(state.entries.is_empty()))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn signing_in_again_reopens_an_ended_subscription() {
        ReducerTest::new(WishlistReducer::<InMemoryRecordStore>::new())
            .with_env(env())
            .given_state(WishlistState {
                subscribed: true,
                ..signed_in()
            })
            .when_action(WishlistAction::Toggle { product: lamp() })
            .when_action(WishlistAction::SubscriptionEnded {
                user: UserId::new("u1"),
                path: "customers/u1/wishlist/products".into(),
                error: "Subscription was cancelled by the server".into(),
            })
            .when_action(WishlistAction::SignedIn { user: UserId::new("u1") })
            .then_state(|state| {
                assert!(state.subscribed);
                assert!(state.contains(&ProductId::new("lamp")));
            })
            .then_effects(|effects| assertions::assert_subscribes(effects, &WISHLIST_SUBSCRIPTION))
            .run();
    }

    #[test]
    fn anonymous_toggle_requires_auth() {
        ReducerTest::new(WishlistReducer::<InMemoryRecordStore>::new())
            .with_env(env())
            .given_state(WishlistState::default())
            .when_action(WishlistAction::Toggle { product: lamp() })
            .then_state(|state| {
                assert!(state.entries.is_empty());
                assert_eq!(state.last_error, Some(CartError::AuthRequired));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn sign_out_clears_and_cancels() {
        ReducerTest::new(WishlistReducer::<InMemoryRecordStore>::new())
            .with_env(env())
            .given_state(signed_in())
            .when_action(WishlistAction::Toggle { product: lamp() })
            .when_action(WishlistAction::SignedOut)
            .then_state(|state| {
                assert!(state.entries.is_empty());
                assert_eq!(state.session, Session::Anonymous);
            })
            .then_effects(|effects| assertions::assert_cancels(effects, &WISHLIST_SUBSCRIPTION))
            .run();
    }
}
