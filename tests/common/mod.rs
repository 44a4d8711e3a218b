//! Common test utilities and helpers

use auroramart::config::{AppConfig, CheckoutConfig, MiningConfig};
use auroramart::storage::{NewProduct, NewUser, SqliteStore};
use auroramart::types::{Category, Product, User};
use tempfile::TempDir;

/// Create a file-backed store in a temp directory and run migrations.
/// The TempDir must stay alive for the duration of the test.
pub async fn create_test_store() -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let store = SqliteStore::connect(&url).await.expect("connect test db");
    store.run_migrations().await.expect("run migrations");
    (store, dir)
}

/// Default configuration with the reference pricing knobs
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

pub fn test_checkout_config() -> CheckoutConfig {
    test_config().checkout
}

pub fn test_mining_config() -> MiningConfig {
    MiningConfig {
        min_support: 0.0,
        min_confidence: 0.0,
        default_top_n: 5,
    }
}

/// Seed one top-level category and `n` active products priced 10.00,
/// 20.00, ... with the given stock each
pub async fn seed_catalog(store: &SqliteStore, n: usize, stock: i64) -> (Category, Vec<Product>) {
    let category = store
        .create_category("Electronics", "electronics", None, 0)
        .await
        .expect("create category");

    let mut products = Vec::with_capacity(n);
    for i in 0..n {
        let product = store
            .create_product(&NewProduct {
                sku: format!("SKU-{:04}", i + 1),
                name: format!("Product {}", i + 1),
                slug: format!("product-{}", i + 1),
                description: String::new(),
                price_cents: 1_000 * (i as i64 + 1),
                discount_price_cents: None,
                category_id: category.id,
                subcategory_id: None,
                brand_id: None,
                stock_quantity: stock,
                reorder_threshold: 2,
                is_featured: false,
            })
            .await
            .expect("create product");
        products.push(product);
    }
    (category, products)
}

/// Register a customer with a unique username
pub async fn create_customer(store: &SqliteStore, name: &str) -> User {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    store
        .register_user(&NewUser {
            username: format!("{}_{}", name, &unique[..8]),
            email: format!("{}_{}@example.com", name, &unique[..8]),
            password: "correct horse battery".to_string(),
            role: None,
        })
        .await
        .expect("register user")
}
