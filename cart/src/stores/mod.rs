//! Production record store bindings.

pub mod realtime_db;

pub use realtime_db::{RealtimeDbClient, RealtimeDbConfig};
