//! Configuration for the AuroraMart backend
//!
//! Layers defaults, an optional TOML file, and `AURORAMART_*` environment
//! variables (double underscore as section separator, e.g.
//! `AURORAMART_DATABASE__URL`). All pricing knobs live here so the checkout
//! pipeline and the loyalty ledger read one source of truth.

use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub checkout: CheckoutConfig,
    pub loyalty: LoyaltyConfig,
    pub mining: MiningConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Listen address, e.g. "127.0.0.1:8080"
    pub addr: SocketAddr,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. "sqlite://auroramart.db"
    pub url: String,
}

/// Checkout pricing stages, all in integer units so totals are deterministic
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Tax rate in basis points (800 = 8%)
    pub tax_rate_basis_points: i64,
    /// Flat shipping charge in cents
    pub shipping_flat_cents: i64,
    /// Subtotals at or above this ship free
    pub free_shipping_threshold_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Redemption rate: this many points convert to one currency unit
    pub points_per_currency_unit: i64,
}

/// Association mining thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    /// Minimum support (pair orders / total orders) for a rule to be kept
    pub min_support: f64,
    /// Minimum confidence (pair orders / antecedent orders)
    pub min_confidence: f64,
    /// Default number of consequents returned per query
    pub default_top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized decision-tree artifact (JSON)
    pub path: PathBuf,
}

impl AppConfig {
    /// Load configuration: defaults, then an optional file, then environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("http.addr", "127.0.0.1:8080")?
            .set_default("http.session_ttl_hours", 24 * 7)?
            .set_default("database.url", "sqlite://auroramart.db")?
            .set_default("checkout.tax_rate_basis_points", 800)?
            .set_default("checkout.shipping_flat_cents", 1000)?
            .set_default("checkout.free_shipping_threshold_cents", 5000)?
            .set_default("loyalty.points_per_currency_unit", 100)?
            .set_default("mining.min_support", 0.01)?
            .set_default("mining.min_confidence", 0.2)?
            .set_default("mining.default_top_n", 5)?
            .set_default("model.path", "model/category_tree.json")?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("AURORAMART").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Defaults alone always deserialize
        Self::load(None).expect("default configuration is valid")
    }
}
