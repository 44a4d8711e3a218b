//! Property test for the loyalty ledger: whatever sequence of orders and
//! redemptions runs, the balance never goes negative and lifetime points
//! never decrease.

mod common;

use auroramart::services::CheckoutService;
use auroramart::types::ShippingDetails;
use auroramart::StoreError;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    /// Place an order for this many units of the seeded product
    Order(i64),
    /// Attempt to redeem this many points
    Redeem(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..5).prop_map(Op::Order),
        (1i64..200).prop_map(Op::Redeem),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn ledger_invariants_hold(ops in proptest::collection::vec(op_strategy(), 1..12)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let (store, _dir) = common::create_test_store().await;
            // Plenty of stock so orders never fail for stock reasons
            let (_, products) = common::seed_catalog(&store, 1, 10_000).await;
            let user = common::create_customer(&store, "prop").await;
            let checkout =
                CheckoutService::new(store.clone(), common::test_checkout_config());

            let mut expected_balance = 0i64;
            let mut expected_lifetime = 0i64;

            for op in ops {
                match op {
                    Op::Order(quantity) => {
                        store.add_cart_item(user.id, products[0].id, quantity).await.unwrap();
                        let order = checkout
                            .place_order(user.id, ShippingDetails::default())
                            .await
                            .unwrap();
                        // 1 point per whole dollar of subtotal
                        let earned = order.subtotal_cents / 100;
                        expected_balance += earned;
                        expected_lifetime += earned;
                    }
                    Op::Redeem(points) => {
                        let result = store
                            .redeem_points_to_cart(user.id, points, 100)
                            .await;
                        if points <= expected_balance {
                            result.unwrap();
                            expected_balance -= points;
                        } else {
                            assert!(matches!(
                                result,
                                Err(StoreError::InsufficientPoints { .. })
                            ));
                        }
                    }
                }

                let account = store.get_loyalty_account(user.id).await.unwrap();
                assert!(account.points_balance >= 0);
                assert_eq!(account.points_balance, expected_balance);
                assert_eq!(account.lifetime_points, expected_lifetime);

                // The ledger sums to the balance
                let ledger = store.list_loyalty_transactions(user.id, 500).await.unwrap();
                let sum: i64 = ledger.iter().map(|t| t.points).sum();
                assert_eq!(sum, account.points_balance);
            }
        });
    }
}
