//! Shorthand macros for building effects inside reducers.

/// Create an `Effect::Future` from an async block body
///
/// # Example
///
/// ```rust,ignore
/// use storefront_core::async_effect;
///
/// async_effect! {
///     match records.delete(&path).await {
///         Ok(()) => None,
///         Err(error) => Some(CartAction::SyncFailed { path, error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Stream` registered under a cancellation id
///
/// # Example
///
/// ```rust,ignore
/// use storefront_core::subscription;
///
/// subscription! {
///     id: CART_SUBSCRIPTION,
///     stream: snapshots.map(|lines| CartAction::ReplaceSnapshot { user: user.clone(), lines })
/// }
/// ```
#[macro_export]
macro_rules! subscription {
    (
        id: $id:expr,
        stream: $stream:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::effect::Effect::Stream(
                ::std::boxed::Box::pin($stream),
            )),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::{Effect, EffectId};

    #[derive(Clone, Debug)]
    enum TestAction {
        Written,
        Snapshot,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Written)
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_subscription_macro() {
        let effect = subscription! {
            id: EffectId::from_static("snapshots"),
            stream: futures::stream::iter(vec![TestAction::Snapshot])
        };

        match effect {
            Effect::Cancellable { id, effect } => {
                assert_eq!(id.as_str(), "snapshots");
                assert!(matches!(*effect, Effect::Stream(_)));
            },
            other => unreachable!("expected cancellable stream, got {other:?}"),
        }
    }
}
