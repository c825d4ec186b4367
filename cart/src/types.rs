//! Domain types for the cart and wishlist.

use crate::coupon::AppliedCoupon;
use crate::coupon::CouponRejection;
use crate::error::CartError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Product identifier as used in record paths
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated user id (the `{uid}` path segment)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Money in minor units (paise)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Create from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Create from a major-unit decimal, rounding to the nearest minor unit
    ///
    /// Returns `None` for negative or non-finite amounts.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )] // range checked above
    pub fn from_major(major: f64) -> Option<Self> {
        if !major.is_finite() || major < 0.0 {
            return None;
        }
        let minor = (major * 100.0).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Self(minor as u64))
    }

    /// Amount in minor units
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Amount in major units
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // display/wire only
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiply by a quantity, saturating
    #[must_use]
    #[allow(clippy::cast_lossless)] // u64::from is not const
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Subtract, flooring at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Catalog product as seen by the cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// List price
    pub list_price: Money,
    /// Sale price, when discounted
    pub sale_price: Option<Money>,
    /// Thumbnail URL
    pub thumbnail: String,
    /// URL slug
    pub slug: String,
}

impl Product {
    /// Sale price if present, else list price
    #[must_use]
    pub fn unit_price(&self) -> Money {
        self.sale_price.unwrap_or(self.list_price)
    }
}

/// One product in the cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product id (unique within a snapshot)
    pub product_id: ProductId,
    /// Display name
    pub name: String,
    /// List price
    pub list_price: Money,
    /// Sale price, when discounted
    pub sale_price: Option<Money>,
    /// Price charged per unit
    pub unit_price: Money,
    /// Always at least 1
    pub quantity: u32,
    /// Empty when unspecified
    pub selected_size: String,
    /// Empty when unspecified
    pub selected_color: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// URL slug
    pub slug: String,
}

impl CartLine {
    /// New line for `product` with quantity 1 and no variant chosen
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            list_price: product.list_price,
            sale_price: product.sale_price,
            unit_price: product.unit_price(),
            quantity: 1,
            selected_size: String::new(),
            selected_color: String::new(),
            thumbnail: product.thumbnail.clone(),
            slug: product.slug.clone(),
        }
    }

    /// `unit_price * quantity`
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Ordered cart lines for one session, at most one per product
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Build from lines; a later line replaces an earlier one for the same product
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = Self::default();
        snapshot.replace(lines);
        snapshot
    }

    /// Lines in order
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct products
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line for `product_id`
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    /// Mutable line for `product_id`
    pub fn get_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.product_id == product_id)
    }

    /// Quantity of `product_id`, if in the cart
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.get(product_id).map(|line| line.quantity)
    }

    /// Append `line` unless its product is already present; returns whether it was added
    pub fn insert_if_absent(&mut self, line: CartLine) -> bool {
        if self.get(&line.product_id).is_some() {
            return false;
        }
        self.lines.push(line);
        true
    }

    /// Remove the line for `product_id`
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| &line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Replace all lines
    pub fn replace(&mut self, lines: impl IntoIterator<Item = CartLine>) {
        self.lines.clear();
        for line in lines {
            match self.get_mut(&line.product_id) {
                Some(existing) => *existing = line,
                None => self.lines.push(line),
            }
        }
    }

    /// Drop every line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals, computed on each call
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

/// Who the store is bound to
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    /// No identity: snapshot forced empty, writes rejected
    #[default]
    Anonymous,
    /// Mirrored to this user's records
    Authenticated(UserId),
}

impl Session {
    /// Bound user, if any
    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Whether `user` is the bound identity
    #[must_use]
    pub fn is_bound_to(&self, user: &UserId) -> bool {
        self.user() == Some(user)
    }
}

/// Subtotal, discount and payable total
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Sum of line totals
    pub subtotal: Money,
    /// Applied coupon discount
    pub discount: Money,
    /// `subtotal - discount`
    pub total: Money,
}

/// Cart reducer state
#[derive(Clone, Debug, Default)]
pub struct CartState {
    /// Current binding
    pub session: Session,
    /// Lines for the bound session
    pub snapshot: CartSnapshot,
    /// Whether the remote subscription for the bound user is live
    pub subscribed: bool,
    /// Applied coupon with its last computed discount
    pub coupon: Option<AppliedCoupon>,
    /// Normalized code whose lookup is in flight
    pub pending_coupon: Option<String>,
    /// Why the last coupon was rejected or dropped
    pub coupon_notice: Option<CouponRejection>,
    /// Last failure from a command or a remote write
    pub last_error: Option<CartError>,
}

impl CartState {
    /// State bound to `user` with an empty snapshot
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self {
            session: Session::Authenticated(user),
            ..Self::default()
        }
    }

    /// Current subtotal
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.snapshot.subtotal()
    }

    /// Subtotal, discount and total
    #[must_use]
    pub fn totals(&self) -> Totals {
        let subtotal = self.subtotal();
        let discount = self.coupon.as_ref().map_or(Money::ZERO, AppliedCoupon::discount);
        Totals {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }
}
