//! Property tests for cart invariants and the coupon evaluator.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use storefront_cart::mocks::{InMemoryRecordStore, StaticCoupons};
use storefront_cart::{
    CartAction, CartEnvironment, CartLine, CartReducer, CartState, CouponRecord, DiscountKind,
    Money, Product, ProductId, UserId, evaluate,
};
use storefront_core::reducer::Reducer;
use storefront_testing::test_clock;

type Env = CartEnvironment<InMemoryRecordStore, StaticCoupons>;

const PRICES: [u64; 5] = [0, 1_999, 50_000, 125_050, 9_999_999];

fn env() -> Env {
    CartEnvironment::new(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(StaticCoupons::new()),
        Arc::new(test_clock()),
    )
}

fn product(index: usize) -> Product {
    Product {
        id: ProductId::new(format!("p{index}")),
        name: format!("Product {index}"),
        list_price: Money::from_minor(PRICES[index]),
        sale_price: None,
        thumbnail: String::new(),
        slug: format!("p{index}"),
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Update(usize, u32),
    Remove(usize),
    Increment(usize),
    Decrement(usize),
}

impl Op {
    fn into_action(self) -> CartAction {
        let id = |index: usize| ProductId::new(format!("p{index}"));
        match self {
            Self::Add(index) => CartAction::AddItem { product: product(index) },
            Self::Update(index, quantity) => CartAction::UpdateLine {
                product_id: id(index),
                quantity,
                selected_size: String::new(),
                selected_color: String::new(),
            },
            Self::Remove(index) => CartAction::RemoveLine { product_id: id(index) },
            Self::Increment(index) => CartAction::IncrementQuantity { product_id: id(index) },
            Self::Decrement(index) => CartAction::DecrementQuantity { product_id: id(index) },
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    let index = 0..PRICES.len();
    prop_oneof![
        index.clone().prop_map(Op::Add),
        (index.clone(), 1..50u32).prop_map(|(i, q)| Op::Update(i, q)),
        index.clone().prop_map(Op::Remove),
        index.clone().prop_map(Op::Increment),
        index.prop_map(Op::Decrement),
    ]
}

fn run(state: &mut CartState, env: &Env, actions: impl IntoIterator<Item = CartAction>) {
    let reducer = CartReducer::new();
    for action in actions {
        let _ = reducer.reduce(state, action, env);
    }
}

proptest! {
    #[test]
    fn at_most_one_line_per_product(ops in prop::collection::vec(op(), 0..80)) {
        let env = env();
        let mut state = CartState::signed_in(UserId::new("u1"));

        run(&mut state, &env, ops.into_iter().map(Op::into_action));

        let ids: HashSet<_> = state.snapshot.lines().iter().map(|l| l.product_id.clone()).collect();
        prop_assert_eq!(ids.len(), state.snapshot.len());
        prop_assert!(state.snapshot.lines().iter().all(|line| line.quantity >= 1));

        let expected: u64 = state
            .snapshot
            .lines()
            .iter()
            .map(|line| line.unit_price.minor() * u64::from(line.quantity))
            .sum();
        prop_assert_eq!(state.subtotal(), Money::from_minor(expected));
    }

    #[test]
    fn update_sets_exact_quantity(index in 0..PRICES.len(), quantity in 1..10_000u32) {
        let env = env();
        let mut state = CartState::signed_in(UserId::new("u1"));

        run(&mut state, &env, [
            Op::Add(index).into_action(),
            Op::Update(index, quantity).into_action(),
        ]);

        let id = ProductId::new(format!("p{index}"));
        prop_assert_eq!(state.snapshot.quantity_of(&id), Some(quantity));
        prop_assert_eq!(state.subtotal(), Money::from_minor(PRICES[index]).times(quantity));
    }

    #[test]
    fn removing_a_missing_product_changes_nothing(present in prop::collection::vec(0..3usize, 0..6)) {
        let env = env();
        let mut state = CartState::signed_in(UserId::new("u1"));
        run(&mut state, &env, present.into_iter().map(|i| Op::Add(i).into_action()));
        let before: Vec<CartLine> = state.snapshot.lines().to_vec();

        run(&mut state, &env, [Op::Remove(4).into_action()]);

        prop_assert_eq!(state.snapshot.lines(), before.as_slice());
    }

    #[test]
    fn evaluation_is_deterministic(
        subtotal in 0..100_000_000u64,
        basis_points in 0..=10_000u32,
        min in proptest::option::of(0..100_000_000u64),
    ) {
        let coupon = CouponRecord {
            code: "ANY".into(),
            discount: DiscountKind::Percentage { basis_points },
            min_subtotal: min.map(Money::from_minor),
            expires_at: None,
        };
        let now = storefront_core::environment::Clock::now(&test_clock());

        let first = evaluate(Money::from_minor(subtotal), Some(&coupon), now);
        let second = evaluate(Money::from_minor(subtotal), Some(&coupon), now);
        prop_assert_eq!(first, second);
        prop_assert!(first.discount <= Money::from_minor(subtotal));
    }

    #[test]
    fn flat_discount_is_capped_at_subtotal(subtotal in 0..10_000_000u64, flat in 0..20_000_000u64) {
        let coupon = CouponRecord {
            code: "FLAT".into(),
            discount: DiscountKind::Flat(Money::from_minor(flat)),
            min_subtotal: None,
            expires_at: None,
        };
        let now = storefront_core::environment::Clock::now(&test_clock());

        let evaluation = evaluate(Money::from_minor(subtotal), Some(&coupon), now);
        prop_assert!(evaluation.valid);
        prop_assert_eq!(evaluation.discount, Money::from_minor(flat.min(subtotal)));
    }
}
