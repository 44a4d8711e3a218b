//! Association rule storage
//!
//! Rules are a derived, read-only artifact: the miner replaces the whole set
//! inside one transaction with a bumped generation number, so a concurrent
//! reader sees either the previous set or the new one, never a mix.

use crate::error::Result;
use crate::storage::catalog::row_to_product;
use crate::storage::SqliteStore;
use crate::types::{AssociationRule, ProductId, Recommendation};
use sqlx::Row;
use tracing::info;

/// A rule produced by the mining job, before it gains a generation number
#[derive(Debug, Clone, PartialEq)]
pub struct MinedRule {
    pub antecedent_product_id: ProductId,
    pub consequent_product_id: ProductId,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl SqliteStore {
    /// Atomically replace the entire rule set
    pub async fn replace_rules(&self, rules: &[MinedRule]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT COALESCE(MAX(generation), 0) AS generation FROM association_rules",
        )
        .fetch_one(&mut *tx)
        .await?;
        let generation: i64 = row.try_get::<i64, _>("generation")? + 1;

        sqlx::query("DELETE FROM association_rules")
            .execute(&mut *tx)
            .await?;

        for rule in rules {
            sqlx::query(
                "INSERT INTO association_rules
                   (antecedent_product_id, consequent_product_id, support, confidence, lift, generation)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(rule.antecedent_product_id.to_string())
            .bind(rule.consequent_product_id.to_string())
            .bind(rule.support)
            .bind(rule.confidence)
            .bind(rule.lift)
            .bind(generation)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("association rules replaced: {} rules, generation {}", rules.len(), generation);
        Ok(generation)
    }

    /// Top-N consequents for a product, ranked by confidence then support,
    /// with the lower consequent id breaking ties for determinism. Unknown
    /// products and empty rule sets yield an empty list.
    pub async fn top_consequents(
        &self,
        product_id: ProductId,
        n: usize,
    ) -> Result<Vec<Recommendation>> {
        let rows = sqlx::query(
            "SELECT p.*, r.confidence AS rule_confidence, r.support AS rule_support
             FROM association_rules r
             JOIN products p ON p.id = r.consequent_product_id
             WHERE r.antecedent_product_id = ? AND p.is_active = 1
             ORDER BY r.confidence DESC, r.support DESC, r.consequent_product_id ASC
             LIMIT ?",
        )
        .bind(product_id.to_string())
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut recommendations = Vec::with_capacity(rows.len());
        for row in &rows {
            recommendations.push(Recommendation {
                product: row_to_product(row)?,
                confidence: row.try_get("rule_confidence")?,
                support: row.try_get("rule_support")?,
            });
        }
        Ok(recommendations)
    }

    /// Strongest rules overall, for the admin report
    pub async fn top_rules(&self, n: usize) -> Result<Vec<AssociationRule>> {
        let rows = sqlx::query(
            "SELECT * FROM association_rules
             ORDER BY confidence DESC, support DESC,
                      antecedent_product_id ASC, consequent_product_id ASC
             LIMIT ?",
        )
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let antecedent: String = row.try_get("antecedent_product_id")?;
                let consequent: String = row.try_get("consequent_product_id")?;
                Ok(AssociationRule {
                    antecedent_product_id: ProductId::from_string(&antecedent)?,
                    consequent_product_id: ProductId::from_string(&consequent)?,
                    support: row.try_get("support")?,
                    confidence: row.try_get("confidence")?,
                    lift: row.try_get("lift")?,
                    generation: row.try_get("generation")?,
                })
            })
            .collect()
    }

    /// Current rule count and generation, for the admin report header
    pub async fn rule_set_info(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n, COALESCE(MAX(generation), 0) AS generation
             FROM association_rules",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.try_get("n")?, row.try_get("generation")?))
    }

    /// Distinct products per order for the mining job. Cancelled and
    /// returned orders carry no purchase signal and are excluded.
    pub async fn order_baskets(&self) -> Result<Vec<Vec<ProductId>>> {
        let rows = sqlx::query(
            "SELECT oi.order_id, oi.product_id
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             WHERE o.status NOT IN ('cancelled', 'returned')
             ORDER BY oi.order_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut baskets: Vec<Vec<ProductId>> = Vec::new();
        let mut current_order: Option<String> = None;
        for row in rows {
            let order_id: String = row.try_get("order_id")?;
            let product_id = ProductId::from_string(&row.try_get::<String, _>("product_id")?)?;
            if current_order.as_deref() != Some(order_id.as_str()) {
                current_order = Some(order_id);
                baskets.push(Vec::new());
            }
            if let Some(basket) = baskets.last_mut() {
                basket.push(product_id);
            }
        }
        Ok(baskets)
    }
}
