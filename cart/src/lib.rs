//! # Storefront Cart
//!
//! Per-user cart and wishlist stores mirrored to a path-addressed realtime
//! record store, plus the coupon evaluator.
//!
//! ## Lifecycle
//!
//! A store starts **anonymous**: the snapshot is empty and adds are rejected with
//! [`CartError::AuthRequired`]. `SignedIn { user }` binds it to
//! `customers/{uid}/cart/products` and subscribes; every remote value replaces
//! the snapshot. `SignedOut` cancels the subscription and empties the cart.
//!
//! Local changes apply first and are mirrored in the background. A failed remote
//! write is logged and counted but never rolled back.
//!
//! ## Example
//!
//! ```ignore
//! use storefront_cart::{CartEnvironment, CartStore, RecordCouponLookup, RealtimeDbClient};
//!
//! let records = Arc::new(RealtimeDbClient::new(RealtimeDbConfig::from_env())?);
//! let coupons = Arc::new(RecordCouponLookup::new(Arc::clone(&records)));
//! let cart = CartStore::new(CartEnvironment::new(records, coupons, Arc::new(SystemClock)));
//!
//! cart.sign_in(UserId::new(uid)).await?;
//! cart.add_item(product).await?;
//! let totals = cart.totals().await;
//! ```

pub mod actions;
pub mod coupon;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod providers;
pub mod records;
pub mod reducer;
pub mod store;
pub mod stores;
pub mod sync;
pub mod types;
pub mod wishlist;

pub use actions::{CartAction, WishlistAction};
pub use coupon::{
    AppliedCoupon, CouponEvaluation, CouponRecord, CouponRejection, DiscountKind, evaluate,
    is_valid_code, normalize_code,
};
pub use error::{CartError, RecordStoreError};
pub use providers::{CouponLookup, RecordCouponLookup, RecordStore, RecordStream};
pub use reducer::{CART_SUBSCRIPTION, COUPON_LOOKUP, CartEnvironment, CartReducer};
pub use store::{CartStore, WishlistStore};
pub use stores::{RealtimeDbClient, RealtimeDbConfig};
pub use types::{CartLine, CartSnapshot, CartState, Money, Product, ProductId, Session, Totals, UserId};
pub use wishlist::{WISHLIST_SUBSCRIPTION, WishlistEnvironment, WishlistReducer, WishlistState};
