//! In-memory collaborators for tests and local development.

mod coupons;
mod record_store;

pub use coupons::StaticCoupons;
pub use record_store::InMemoryRecordStore;
