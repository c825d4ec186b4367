//! Actions accepted by the cart and wishlist reducers.

use crate::coupon::CouponRecord;
use crate::types::{CartLine, Product, ProductId, UserId};

/// Every input to the cart reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    // ========== Session ==========
    /// Auth observer saw a sign-in
    SignedIn {
        /// Signed-in user
        user: UserId,
    },
    /// Auth observer saw a sign-out
    SignedOut,

    // ========== Commands ==========
    /// Add `product` with quantity 1 if absent
    AddItem {
        /// Product to add
        product: Product,
    },
    /// Replace the mutable fields of a line
    UpdateLine {
        /// Line to update
        product_id: ProductId,
        /// New quantity (at least 1)
        quantity: u32,
        /// New size, empty when unspecified
        selected_size: String,
        /// New color, empty when unspecified
        selected_color: String,
    },
    /// Quantity + 1
    IncrementQuantity {
        /// Line to update
        product_id: ProductId,
    },
    /// Quantity - 1, never below 1
    DecrementQuantity {
        /// Line to update
        product_id: ProductId,
    },
    /// Remove a line (idempotent)
    RemoveLine {
        /// Line to remove
        product_id: ProductId,
    },
    /// Empty the cart locally and remotely
    Clear,
    /// Look up and apply a coupon code
    ApplyCoupon {
        /// Code as typed by the customer
        code: String,
    },
    /// Drop the applied coupon
    RemoveCoupon,

    // ========== Effect results ==========
    /// Remote cart value changed
    ReplaceSnapshot {
        /// Identity the subscription was opened for
        user: UserId,
        /// Decoded lines
        lines: Vec<CartLine>,
    },
    /// A remote write or delete failed
    SyncFailed {
        /// Record path
        path: String,
        /// Failure message
        error: String,
    },
    /// The cart subscription stopped delivering values
    SubscriptionEnded {
        /// Identity the subscription was opened for
        user: UserId,
        /// Subscribed path
        path: String,
        /// Failure message
        error: String,
    },
    /// Coupon lookup finished
    CouponResolved {
        /// Normalized code that was looked up
        code: String,
        /// Coupon, `None` when not found
        coupon: Option<CouponRecord>,
    },
    /// Coupon lookup failed in transport
    CouponLookupFailed {
        /// Normalized code that was looked up
        code: String,
        /// Failure message
        error: String,
    },
}

/// Every input to the wishlist reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WishlistAction {
    /// Auth observer saw a sign-in
    SignedIn {
        /// Signed-in user
        user: UserId,
    },
    /// Auth observer saw a sign-out
    SignedOut,
    /// Add if absent, remove if present
    Toggle {
        /// Product to toggle
        product: Product,
    },
    /// Remove an entry (idempotent)
    Remove {
        /// Entry to remove
        product_id: ProductId,
    },
    /// Remote wishlist value changed
    ReplaceSnapshot {
        /// Identity the subscription was opened for
        user: UserId,
        /// Decoded entries
        entries: Vec<Product>,
    },
    /// A remote write or delete failed
    SyncFailed {
        /// Record path
        path: String,
        /// Failure message
        error: String,
    },
    /// The wishlist subscription stopped delivering values
    SubscriptionEnded {
        /// Identity the subscription was opened for
        user: UserId,
        /// Subscribed path
        path: String,
        /// Failure message
        error: String,
    },
}
