//! Effects that mirror local changes to the record store.
//!
//! Writes and deletes are fire-and-forget from the reducer's point of view: a
//! success produces no action, a failure produces the caller's `SyncFailed`.
//! A subscription ends with the caller's `SubscriptionEnded` on its first error.

use crate::actions::{CartAction, WishlistAction};
use crate::providers::RecordStore;
use crate::types::UserId;
use futures::{StreamExt, future};
use serde_json::Value;
use std::sync::Arc;
use storefront_core::effect::{Effect, EffectId};
use storefront_core::{async_effect, subscription};

/// Actions that can carry a remote failure
pub trait SyncFailure: Sized + Send + 'static {
    /// Build the failed write or delete action
    fn sync_failed(path: String, error: String) -> Self;

    /// Build the action that reports a dead subscription
    fn subscription_ended(user: UserId, path: String, error: String) -> Self;
}

impl SyncFailure for CartAction {
    fn sync_failed(path: String, error: String) -> Self {
        Self::SyncFailed { path, error }
    }

    fn subscription_ended(user: UserId, path: String, error: String) -> Self {
        Self::SubscriptionEnded { user, path, error }
    }
}

impl SyncFailure for WishlistAction {
    fn sync_failed(path: String, error: String) -> Self {
        Self::SyncFailed { path, error }
    }

    fn subscription_ended(user: UserId, path: String, error: String) -> Self {
        Self::SubscriptionEnded { user, path, error }
    }
}

/// Merge `value` into `path`
pub fn write<R, A>(records: &Arc<R>, path: String, value: Value) -> Effect<A>
where
    R: RecordStore + 'static,
    A: SyncFailure,
{
    let records = Arc::clone(records);
    async_effect! {
        let result = records.write(&path, value).await;
        match result {
            Ok(()) => {
                tracing::trace!(path = %path, "Remote write applied");
                None
            },
            Err(error) => Some(A::sync_failed(path, error.to_string())),
        }
    }
}

/// Delete `path`
pub fn delete<R, A>(records: &Arc<R>, path: String) -> Effect<A>
where
    R: RecordStore + 'static,
    A: SyncFailure,
{
    let records = Arc::clone(records);
    async_effect! {
        let result = records.delete(&path).await;
        match result {
            Ok(()) => {
                tracing::trace!(path = %path, "Remote delete applied");
                None
            },
            Err(error) => Some(A::sync_failed(path, error.to_string())),
        }
    }
}

/// Subscribe to `path` for `user` under `id`.
///
/// Each value becomes `on_value(user, value)`. The first stream error becomes
/// `SubscriptionEnded` and nothing after it is delivered.
pub fn subscribe<R, A, F>(records: &R, id: EffectId, user: UserId, path: String, on_value: F) -> Effect<A>
where
    R: RecordStore,
    A: SyncFailure,
    F: Fn(&UserId, &Value) -> A + Send + 'static,
{
    let stream = records.subscribe(&path).scan(false, move |ended, item| {
        if *ended {
            return future::ready(None);
        }
        let action = match item {
            Ok(value) => on_value(&user, &value),
            Err(error) => {
                tracing::warn!(path = %path, %error, "Subscription ended");
                *ended = true;
                A::subscription_ended(user.clone(), path.clone(), error.to_string())
            },
        };
        future::ready(Some(action))
    });

    subscription! {
        id: id,
        stream: stream
    }
}
