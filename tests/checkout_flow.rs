//! End-to-end storefront flow: register, fill a cart, redeem points,
//! check out, and verify stock, loyalty, and order state afterwards.

mod common;

use auroramart::services::CheckoutService;
use auroramart::types::{LoyaltyTransactionKind, OrderStatus, ShippingDetails};
use auroramart::StoreError;

fn shipping() -> ShippingDetails {
    ShippingDetails {
        name: "Ada Tan".into(),
        address: "1 Marina Way".into(),
        city: "Singapore".into(),
        zip_code: "018989".into(),
        country: "SG".into(),
        phone: None,
    }
}

#[tokio::test]
async fn test_full_checkout_flow() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 3, 10).await;
    let user = common::create_customer(&store, "ada").await;

    // Registration created a profile and an empty loyalty account
    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 0);

    // 2 x 10.00 + 1 x 20.00 + 2 x 30.00 = 100.00 subtotal
    store.add_cart_item(user.id, products[0].id, 2).await.unwrap();
    store.add_cart_item(user.id, products[1].id, 1).await.unwrap();
    store.add_cart_item(user.id, products[2].id, 2).await.unwrap();

    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());
    let (_, quote) = checkout.quote(user.id).await.unwrap();
    assert_eq!(quote.subtotal_cents, 10_000);
    assert_eq!(quote.tax_cents, 800);
    assert_eq!(quote.shipping_cents, 0); // free over 50.00
    assert_eq!(quote.total_cents, 10_800);

    let order = checkout.place_order(user.id, shipping()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_cents, 10_800);
    assert!(order.order_number.starts_with("AM"));

    // Stock was decremented per line
    assert_eq!(store.get_product(products[0].id).await.unwrap().stock_quantity, 8);
    assert_eq!(store.get_product(products[1].id).await.unwrap().stock_quantity, 9);
    assert_eq!(store.get_product(products[2].id).await.unwrap().stock_quantity, 8);

    // Cart is now empty
    let cart = store.cart_view(user.id).await.unwrap();
    assert!(cart.is_empty());

    // 1 point per whole dollar of subtotal
    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 100);
    assert_eq!(account.lifetime_points, 100);

    let ledger = store.list_loyalty_transactions(user.id, 10).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, LoyaltyTransactionKind::Earned);
    assert_eq!(ledger[0].points, 100);
    assert_eq!(ledger[0].order_id, Some(order.id));

    // Order items carry the price snapshot
    let items = store.order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 3);
    let snapshot_total: i64 = items.iter().map(|i| i.line_total_cents()).sum();
    assert_eq!(snapshot_total, 10_000);
}

#[tokio::test]
async fn test_redeemed_points_discount_the_quote() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 20).await;
    let user = common::create_customer(&store, "bee").await;
    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());

    // First order earns 100 points (10 x 10.00)
    store.add_cart_item(user.id, products[0].id, 10).await.unwrap();
    checkout.place_order(user.id, shipping()).await.unwrap();
    assert_eq!(
        store.get_loyalty_account(user.id).await.unwrap().points_balance,
        100
    );

    // Redeem all 100 points against a fresh cart: 100 pts -> 1.00 off
    store.add_cart_item(user.id, products[0].id, 10).await.unwrap();
    let discount = store.redeem_points_to_cart(user.id, 100, 100).await.unwrap();
    assert_eq!(discount.amount_cents, 100);

    // Points leave the balance at redemption time, not at checkout
    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 0);
    assert_eq!(account.lifetime_points, 100);

    let (_, quote) = checkout.quote(user.id).await.unwrap();
    assert_eq!(quote.subtotal_cents, 10_000);
    assert_eq!(quote.discount_cents, 100);
    // 8% of 99.00 = 7.92
    assert_eq!(quote.tax_cents, 792);
    assert_eq!(quote.total_cents, 10_692);

    let order = checkout.place_order(user.id, shipping()).await.unwrap();
    assert_eq!(order.discount_cents, 100);

    // Accrual is still on the full subtotal
    let account = store.get_loyalty_account(user.id).await.unwrap();
    assert_eq!(account.points_balance, 100);
    assert_eq!(account.lifetime_points, 200);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let (store, _dir) = common::create_test_store().await;
    let user = common::create_customer(&store, "cee").await;
    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());

    let result = checkout.place_order(user.id, shipping()).await;
    assert!(matches!(result, Err(StoreError::EmptyCart)));
}

#[tokio::test]
async fn test_order_status_transitions_and_history() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 5).await;
    let user = common::create_customer(&store, "dee").await;
    let checkout = CheckoutService::new(store.clone(), common::test_checkout_config());

    store.add_cart_item(user.id, products[0].id, 1).await.unwrap();
    let order = checkout.place_order(user.id, shipping()).await.unwrap();

    // Pending -> Processing -> Shipped -> Delivered
    store
        .transition_order_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    store
        .transition_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    let delivered = store
        .transition_order_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert!(delivered.completed_at.is_some());

    // Delivered orders cannot be cancelled
    let result = store
        .transition_order_status(order.id, OrderStatus::Cancelled)
        .await;
    assert!(matches!(result, Err(StoreError::InvalidTransition(_))));

    // Wrong owner sees NotFound, not Forbidden
    let other = common::create_customer(&store, "eve").await;
    let result = store.get_order_for_user(order.id, other.id).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}
