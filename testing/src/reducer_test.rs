//! Given-When-Then harness for reducers.
//!
//! Reducers are pure, so most store behavior can be checked here without a
//! runtime: the effects are inspected as values, never executed.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use storefront_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test
///
/// `when_action` may be called several times; the actions are reduced in
/// order and effect assertions see the effects of the last one.
///
/// ```ignore
/// ReducerTest::new(CartReducer::new())
///     .with_env(env)
///     .given_state(CartState::signed_in(user))
///     .when_action(CartAction::AddItem { product })
///     .when_action(CartAction::IncrementQuantity { product_id })
///     .then_state(|state| assert_eq!(state.snapshot.quantity_of(&product_id), 2))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the state, environment, or at least one action is missing,
    /// or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        assert!(!self.actions.is_empty(), "At least one action must be set with when_action()");

        let mut effects = smallvec::SmallVec::<[Effect<A>; 4]>::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use storefront_core::effect::{Effect, EffectId};

    fn flatten<A>(effects: &[Effect<A>]) -> Vec<&Effect<A>> {
        let mut flat = Vec::new();
        for effect in effects {
            match effect {
                Effect::Parallel(inner) | Effect::Sequential(inner) => flat.extend(flatten(inner)),
                Effect::Cancellable { effect: inner, .. } => {
                    flat.push(effect);
                    flat.extend(flatten(std::slice::from_ref(inner.as_ref())));
                },
                other => flat.push(other),
            }
        }
        flat
    }

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect, nested or not
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            flatten(effects).iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that some effect cancels `id`
    ///
    /// # Panics
    ///
    /// Panics if no effect cancels `id`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A>(effects: &[Effect<A>], id: &EffectId) {
        assert!(
            effects.iter().any(|e| e.cancels(id)),
            "Expected an Effect::Cancel({id}), but none found"
        );
    }

    /// Assert that a stream is started under `id`
    ///
    /// # Panics
    ///
    /// Panics if no cancellable stream with that id is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_subscribes<A>(effects: &[Effect<A>], id: &EffectId) {
        let found = flatten(effects).iter().any(|e| match e {
            Effect::Cancellable { id: registered, effect } => {
                registered == id && matches!(effect.as_ref(), Effect::Stream(_))
            },
            _ => false,
        });
        assert!(found, "Expected a stream registered under {id}, but none found");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::effect::EffectId;
    use storefront_core::{smallvec, SmallVec};

    const TICKS: EffectId = EffectId::from_static("ticks");

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Watch,
        Unwatch,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                TestAction::Watch => smallvec![
                    Effect::Stream(Box::pin(futures::stream::empty())).cancellable(TICKS)
                ],
                TestAction::Unwatch => smallvec![Effect::merge(vec![Effect::Cancel(TICKS)])],
            }
        }
    }

    #[test]
    fn test_actions_reduce_in_order() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .when_action(TestAction::Increment)
            .then_state(|state| assert_eq!(state.count, 2))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_subscription_assertions() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Watch)
            .then_effects(|effects| assertions::assert_subscribes(effects, &TICKS))
            .run();

        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Unwatch)
            .then_effects(|effects| assertions::assert_cancels(effects, &TICKS))
            .run();
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<TestAction>::None], 1);
        assertions::assert_effects_count::<TestAction>(&[], 0);
    }
}
