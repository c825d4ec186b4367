//! Record store trait.

use crate::error::Result;
use futures::stream::BoxStream;
use serde_json::Value;

/// Stream of full values at a subscribed path.
///
/// The first item is the current value; every later item follows a change at
/// or below the path. An `Err` item ends the subscription.
pub type RecordStream = BoxStream<'static, Result<Value>>;

/// Path-addressed JSON document store.
///
/// Paths are slash-separated (`customers/{uid}/cart/products/{id}`). A missing
/// path reads as `Value::Null`.
pub trait RecordStore: Send + Sync {
    /// Read the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses it.
    fn read(&self, path: &str) -> impl std::future::Future<Output = Result<Value>> + Send;

    /// Merge `value` into `path`.
    ///
    /// Object values update only the keys they name; anything else replaces the
    /// value at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses it.
    fn write(
        &self,
        path: &str,
        value: Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete `path` and everything below it. Deleting a missing path succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses it.
    fn delete(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Watch `path`. Dropping the stream releases the listener.
    fn subscribe(&self, path: &str) -> RecordStream;
}
