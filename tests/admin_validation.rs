//! Admin write validation: failed writes are 422-style field errors and
//! leave no partial state behind.

mod common;

use auroramart::storage::{NewProduct, ProductFilter, ProductUpdate};
use auroramart::StoreError;

fn draft_product(category_id: i64) -> NewProduct {
    NewProduct {
        sku: "SKU-NEW".into(),
        name: "Espresso Grinder".into(),
        slug: "espresso-grinder".into(),
        description: String::new(),
        price_cents: 14_900,
        discount_price_cents: None,
        category_id,
        subcategory_id: None,
        brand_id: None,
        stock_quantity: 25,
        reorder_threshold: 5,
        is_featured: false,
    }
}

#[tokio::test]
async fn test_invalid_product_is_rejected_with_field_errors() {
    let (store, _dir) = common::create_test_store().await;
    let (category, _) = common::seed_catalog(&store, 1, 10).await;

    let mut bad = draft_product(category.id);
    bad.name = String::new();
    bad.price_cents = -500;
    bad.stock_quantity = -3;

    let result = store.create_product(&bad).await;
    let Err(StoreError::Validation(fields)) = result else {
        panic!("expected validation failure");
    };
    // Every bad field is reported, not just the first
    assert!(fields.iter().any(|f| f.field == "name"));
    assert!(fields.iter().any(|f| f.field == "price_cents"));
    assert!(fields.iter().any(|f| f.field == "stock_quantity"));

    // Nothing was written
    assert!(matches!(
        store.get_product_by_sku("SKU-NEW").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_unknown_category_is_a_field_error() {
    let (store, _dir) = common::create_test_store().await;

    let result = store.create_product(&draft_product(9_999)).await;
    let Err(StoreError::Validation(fields)) = result else {
        panic!("expected validation failure");
    };
    assert!(fields.iter().any(|f| f.field == "category_id"));
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let (store, _dir) = common::create_test_store().await;
    let (category, _) = common::seed_catalog(&store, 1, 10).await;

    store.create_product(&draft_product(category.id)).await.unwrap();
    let result = store.create_product(&draft_product(category.id)).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_failed_update_leaves_product_unchanged() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 10).await;
    let before = products[0].clone();

    let result = store
        .update_product(
            before.id,
            &ProductUpdate {
                name: Some("Renamed".into()),
                price_cents: Some(-100),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    // The valid part of the update did not land either
    let after = store.get_product(before.id).await.unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.price_cents, before.price_cents);
}

#[tokio::test]
async fn test_subcategories_require_top_level_parent() {
    let (store, _dir) = common::create_test_store().await;
    let top = store
        .create_category("Fashion", "fashion", None, 0)
        .await
        .unwrap();
    let sub = store
        .create_category("Shoes", "shoes", Some(top.id), 0)
        .await
        .unwrap();

    // No third level
    let result = store
        .create_category("Sneakers", "sneakers", Some(sub.id), 0)
        .await;
    assert!(matches!(result, Err(StoreError::Validation(_))));
}

#[tokio::test]
async fn test_stock_adjustment_cannot_go_negative() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 1, 5).await;

    let result = store.adjust_stock(products[0].id, -6).await;
    assert!(matches!(result, Err(StoreError::OutOfStock(_))));
    assert_eq!(store.get_product(products[0].id).await.unwrap().stock_quantity, 5);

    let adjusted = store.adjust_stock(products[0].id, -5).await.unwrap();
    assert_eq!(adjusted.stock_quantity, 0);
}

#[tokio::test]
async fn test_admin_listing_includes_inactive_products() {
    let (store, _dir) = common::create_test_store().await;
    let (_, products) = common::seed_catalog(&store, 2, 10).await;

    store
        .update_product(
            products[0].id,
            &ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let public = store
        .list_products(&ProductFilter::default())
        .await
        .unwrap();
    assert_eq!(public.len(), 1);

    let admin = store
        .list_products(&ProductFilter {
            include_inactive: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(admin.len(), 2);
}
