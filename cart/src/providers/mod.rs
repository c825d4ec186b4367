//! Collaborators the cart and wishlist reducers depend on.
//!
//! Reducers only ever see these traits through their environment; the runtime
//! executes the futures they return as effects.

mod coupons;
mod record_store;

pub use coupons::{CouponLookup, RecordCouponLookup};
pub use record_store::{RecordStore, RecordStream};
