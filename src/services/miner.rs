//! Association rule mining over order history
//!
//! Pairwise market-basket analysis: for every ordered pair of products that
//! co-occur in at least one order, compute support, confidence, and lift,
//! keep the pairs above the configured thresholds, and swap the stored rule
//! set atomically. The whole job is a batch; serving reads only the table.

use crate::config::MiningConfig;
use crate::error::Result;
use crate::storage::{MinedRule, SqliteStore};
use crate::types::ProductId;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Outcome of a mining run
#[derive(Debug, Clone, serde::Serialize)]
pub struct MiningReport {
    pub baskets: usize,
    pub rules: usize,
    pub generation: i64,
}

/// Mine directed pair rules from order baskets.
///
/// Duplicate products within a basket count once. Output order is
/// deterministic: confidence, then support, then product ids.
pub fn mine_rules(baskets: &[Vec<ProductId>], config: &MiningConfig) -> Vec<MinedRule> {
    let total = baskets.len() as f64;
    if baskets.is_empty() {
        return Vec::new();
    }

    let mut item_counts: HashMap<ProductId, i64> = HashMap::new();
    let mut pair_counts: HashMap<(ProductId, ProductId), i64> = HashMap::new();

    for basket in baskets {
        let distinct: HashSet<ProductId> = basket.iter().copied().collect();
        let mut items: Vec<ProductId> = distinct.into_iter().collect();
        items.sort_by_key(|id| id.0);

        for item in &items {
            *item_counts.entry(*item).or_insert(0) += 1;
        }
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                *pair_counts.entry((items[i], items[j])).or_insert(0) += 1;
            }
        }
    }

    let mut rules = Vec::new();
    for ((a, b), pair_count) in &pair_counts {
        let support = *pair_count as f64 / total;
        if support < config.min_support {
            continue;
        }
        // A pair yields up to two directed rules
        for (antecedent, consequent) in [(*a, *b), (*b, *a)] {
            let antecedent_count = item_counts[&antecedent] as f64;
            let consequent_count = item_counts[&consequent] as f64;
            let confidence = *pair_count as f64 / antecedent_count;
            if confidence < config.min_confidence {
                continue;
            }
            rules.push(MinedRule {
                antecedent_product_id: antecedent,
                consequent_product_id: consequent,
                support,
                confidence,
                lift: confidence / (consequent_count / total),
            });
        }
    }

    rules.sort_by(|x, y| {
        y.confidence
            .total_cmp(&x.confidence)
            .then(y.support.total_cmp(&x.support))
            .then(x.antecedent_product_id.0.cmp(&y.antecedent_product_id.0))
            .then(x.consequent_product_id.0.cmp(&y.consequent_product_id.0))
    });
    rules
}

/// Runs the batch mining job against the store
pub struct MinerService {
    store: SqliteStore,
    config: MiningConfig,
}

impl MinerService {
    pub fn new(store: SqliteStore, config: MiningConfig) -> Self {
        Self { store, config }
    }

    /// Mine the full order history and replace the stored rule set
    pub async fn regenerate(&self) -> Result<MiningReport> {
        let baskets = self.store.order_baskets().await?;
        if baskets.is_empty() {
            warn!("no order history to mine, keeping existing rule set");
            let (rules, generation) = self.store.rule_set_info().await?;
            return Ok(MiningReport {
                baskets: 0,
                rules: rules as usize,
                generation,
            });
        }

        let rules = mine_rules(&baskets, &self.config);
        let generation = self.store.replace_rules(&rules).await?;
        info!(
            "mined {} rules from {} baskets (generation {})",
            rules.len(),
            baskets.len(),
            generation
        );
        Ok(MiningReport {
            baskets: baskets.len(),
            rules: rules.len(),
            generation,
        })
    }
}
