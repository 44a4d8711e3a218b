//! Contended-write behavior: guarded stock decrements and point debits
//! must admit exactly one winner and leave no partial state behind.

mod common;

use auroramart::services::CheckoutService;
use auroramart::types::ShippingDetails;
use auroramart::StoreError;
use serial_test::serial;

fn shipping(name: &str) -> ShippingDetails {
    ShippingDetails {
        name: name.into(),
        address: "1 Test St".into(),
        city: "Singapore".into(),
        zip_code: "000000".into(),
        country: "SG".into(),
        phone: None,
    }
}

#[tokio::test]
#[serial]
async fn test_last_unit_has_exactly_one_winner() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 1).await;
    let product = &products[0];

    let alice = common::create_customer(&store, "alice").await;
    let bob = common::create_customer(&store, "bob").await;

    // Both carts hold the last unit; the soft check at add time passes
    store.add_cart_item(alice.id, product.id, 1).await.unwrap();
    store.add_cart_item(bob.id, product.id, 1).await.unwrap();

    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());
    let (a, b) = tokio::join!(
        checkout.place_order(alice.id, shipping("Alice")),
        checkout.place_order(bob.id, shipping("Bob")),
    );

    let a_won = a.is_ok();
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one checkout must win the last unit");

    let loser = if a_won { b } else { a };
    assert!(matches!(loser, Err(StoreError::OutOfStock(_))));

    // Stock is zero, never negative
    assert_eq!(store.get_product(product.id).await.unwrap().stock_quantity, 0);

    // The losing user keeps their cart and earned no points
    let (loser_id, winner_id) = if a_won { (bob.id, alice.id) } else { (alice.id, bob.id) };
    assert!(!store.cart_view(loser_id).await.unwrap().is_empty());
    assert_eq!(
        store.get_loyalty_account(loser_id).await.unwrap().lifetime_points,
        0
    );
    assert!(store.cart_view(winner_id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_redemption_overdraft_leaves_no_trace() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 10).await;
    let user = common::create_customer(&store, "carol").await;
    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());

    // Earn 30 points
    store.add_cart_item(user.id, products[0].id, 3).await.unwrap();
    checkout.place_order(user.id, shipping("Carol")).await.unwrap();
    assert_eq!(
        store.get_loyalty_account(user.id).await.unwrap().points_balance,
        30
    );

    // Ask for more than the balance
    store.add_cart_item(user.id, products[0].id, 1).await.unwrap();
    let result = store.redeem_points_to_cart(user.id, 100, 100).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientPoints { requested: 100, balance: 30 })
    ));

    // Balance, ledger, and cart discounts are all untouched
    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 30);

    let ledger = store.list_loyalty_transactions(user.id, 10).await.unwrap();
    assert_eq!(ledger.len(), 1); // just the accrual

    let cart = store.cart_view(user.id).await.unwrap();
    assert!(cart.discounts.is_empty());
}

#[tokio::test]
#[serial]
async fn test_concurrent_redemptions_never_overdraw() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 10).await;
    let user = common::create_customer(&store, "dave").await;
    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());

    // Earn 100 points
    store.add_cart_item(user.id, products[0].id, 10).await.unwrap();
    checkout.place_order(user.id, shipping("Dave")).await.unwrap();

    // Two racing 80-point redemptions against a 100-point balance
    store.add_cart_item(user.id, products[0].id, 1).await.unwrap();
    let (a, b) = tokio::join!(
        store.redeem_points_to_cart(user.id, 80, 100),
        store.redeem_points_to_cart(user.id, 80, 100),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);

    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 20);
    assert!(account.points_balance >= 0);
}
