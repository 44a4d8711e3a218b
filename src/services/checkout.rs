//! Checkout pricing and order placement
//!
//! Pricing runs as a fixed pipeline over integer cents, so every stage is
//! exact and two quotes over the same cart always agree:
//! subtotal -> discounts (capped at subtotal) -> tax on the discounted
//! amount -> shipping -> total.

use crate::config::CheckoutConfig;
use crate::error::{Result, StoreError};
use crate::storage::{CartView, NewOrder, NewOrderLine, SqliteStore};
use crate::types::{Order, Quote, ShippingDetails, UserId};
use tracing::info;

/// Round-half-up tax in cents for a discounted subtotal, with the rate
/// expressed in basis points (800 = 8%).
pub fn tax_cents(taxable_cents: i64, rate_basis_points: i64) -> i64 {
    (taxable_cents * rate_basis_points + 5_000) / 10_000
}

/// Price a cart. Discounts never exceed the subtotal; tax applies to the
/// discounted amount; shipping is free at or above the configured threshold.
pub fn quote_cart(cart: &CartView, config: &CheckoutConfig) -> Quote {
    let subtotal_cents = cart.subtotal_cents();
    let discount_cents = cart.discount_total_cents().min(subtotal_cents);
    let taxable = subtotal_cents - discount_cents;
    let tax = tax_cents(taxable, config.tax_rate_basis_points);
    let shipping_cents = if subtotal_cents >= config.free_shipping_threshold_cents {
        0
    } else {
        config.shipping_flat_cents
    };
    Quote {
        subtotal_cents,
        discount_cents,
        tax_cents: tax,
        shipping_cents,
        total_cents: taxable + tax + shipping_cents,
    }
}

/// Orchestrates cart pricing and atomic order placement
pub struct CheckoutService {
    store: SqliteStore,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(store: SqliteStore, config: CheckoutConfig) -> Self {
        Self { store, config }
    }

    /// Price the user's current cart without placing an order
    pub async fn quote(&self, user_id: UserId) -> Result<(CartView, Quote)> {
        let cart = self.store.cart_view(user_id).await?;
        let quote = quote_cart(&cart, &self.config);
        Ok((cart, quote))
    }

    /// Place an order from the user's cart.
    ///
    /// Prices are quoted from the cart as stored, then the whole placement
    /// (order rows, stock decrements, loyalty accrual, cart clearing) runs
    /// in one storage transaction. Any stock shortfall rolls everything back.
    pub async fn place_order(&self, user_id: UserId, shipping: ShippingDetails) -> Result<Order> {
        let cart = self.store.cart_view(user_id).await?;
        if cart.is_empty() {
            return Err(StoreError::EmptyCart);
        }
        let quote = quote_cart(&cart, &self.config);

        let lines = cart
            .lines
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product.id,
                quantity: line.quantity,
                unit_price_cents: line.product.current_price_cents(),
            })
            .collect();

        let order = self
            .store
            .place_order(&NewOrder {
                user_id,
                lines,
                quote,
                shipping,
            })
            .await?;

        info!(
            "order {} placed for user {}: total {} cents",
            order.order_number, user_id, order.total_cents
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::types::{CartDiscount, CartLine, DiscountKind, Product, ProductId};
    use chrono::Utc;

    fn line(unit_price_cents: i64, quantity: i64) -> CartLine {
        CartLine {
            product: Product {
                id: ProductId::new(),
                sku: "SKU-1".into(),
                name: "Test Product".into(),
                slug: "test-product".into(),
                description: String::new(),
                price_cents: unit_price_cents,
                discount_price_cents: None,
                category_id: 1,
                subcategory_id: None,
                brand_id: None,
                stock_quantity: 100,
                reorder_threshold: 2,
                is_featured: false,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            quantity,
        }
    }

    fn discount(amount_cents: i64, points_used: i64) -> CartDiscount {
        CartDiscount {
            id: 1,
            kind: DiscountKind::LoyaltyPoints,
            amount_cents,
            points_used,
            description: format!("Redeemed {} points", points_used),
            applied_at: Utc::now(),
        }
    }

    fn config() -> CheckoutConfig {
        CheckoutConfig {
            tax_rate_basis_points: 800,
            shipping_flat_cents: 1_000,
            free_shipping_threshold_cents: 5_000,
        }
    }

    #[test]
    fn test_reference_quote() {
        // 100.00 subtotal, 10.00 discount, 8% tax, free shipping over 50.00
        let cart = CartView {
            lines: vec![line(5_000, 2)],
            discounts: vec![discount(1_000, 1_000)],
        };
        let quote = quote_cart(&cart, &config());
        assert_eq!(quote.subtotal_cents, 10_000);
        assert_eq!(quote.discount_cents, 1_000);
        assert_eq!(quote.tax_cents, 720);
        assert_eq!(quote.shipping_cents, 0);
        assert_eq!(quote.total_cents, 9_720);
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let cart = CartView {
            lines: vec![line(1_500, 2)],
            discounts: vec![],
        };
        let quote = quote_cart(&cart, &config());
        assert_eq!(quote.subtotal_cents, 3_000);
        assert_eq!(quote.tax_cents, 240);
        assert_eq!(quote.shipping_cents, 1_000);
        assert_eq!(quote.total_cents, 4_240);
    }

    #[test]
    fn test_free_shipping_exactly_at_threshold() {
        let cart = CartView {
            lines: vec![line(5_000, 1)],
            discounts: vec![],
        };
        assert_eq!(quote_cart(&cart, &config()).shipping_cents, 0);
    }

    #[test]
    fn test_discount_capped_at_subtotal() {
        let cart = CartView {
            lines: vec![line(500, 1)],
            discounts: vec![discount(2_000, 2_000)],
        };
        let quote = quote_cart(&cart, &config());
        assert_eq!(quote.discount_cents, 500);
        assert_eq!(quote.tax_cents, 0);
        // Flat shipping still applies to a fully discounted cart
        assert_eq!(quote.total_cents, 1_000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 8% of 131 cents = 10.48 -> 10; 8% of 119 = 9.52 -> 10
        assert_eq!(tax_cents(131, 800), 10);
        assert_eq!(tax_cents(119, 800), 10);
        // Exact half: 8% of 1_062.5 bp boundary; 625 * 800 = 500_000 -> 50
        assert_eq!(tax_cents(625, 800), 50);
        // 7% of 50 = 3.5 -> rounds up to 4
        assert_eq!(tax_cents(50, 700), 4);
    }

    #[test]
    fn test_empty_cart_quotes_to_shipping_only_pricing() {
        let cart = CartView {
            lines: vec![],
            discounts: vec![],
        };
        let quote = quote_cart(&cart, &config());
        assert_eq!(quote.subtotal_cents, 0);
        // A zero cart never ships, but the quote itself stays well formed
        assert_eq!(quote.total_cents, quote.shipping_cents);
    }
}
