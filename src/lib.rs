//! AuroraMart - E-Commerce Platform with Demand Intelligence
//!
//! A Rust-based storefront backend that provides:
//! - Catalog, cart, and atomic checkout over SQLite
//! - A loyalty program with an append-only points ledger
//! - Preferred-category prediction from a decision-tree artifact
//! - Frequently-bought-together recommendations from mined association rules
//! - A capability-gated admin surface with reports
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Product, Order, LoyaltyAccount, etc.)
//! - **Storage**: SQLite persistence with guarded, transactional writes
//! - **Services**: Checkout pricing, the predictor, the rule miner
//! - **Api**: The HTTP surface (axum)
//!
//! # Example
//!
//! ```ignore
//! use auroramart::{api::{ApiServer, AppState}, AppConfig, PredictorService, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let store = SqliteStore::connect(&config.database.url).await?;
//!     store.run_migrations().await?;
//!
//!     let predictor = PredictorService::load(&config.model.path)?;
//!     let state = AppState::new(store, predictor, config.clone());
//!     ApiServer::new(config.http.addr, state).serve().await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Result, StoreError};
pub use services::{CheckoutService, MinerService, PredictorService};
pub use storage::SqliteStore;
pub use types::{
    AssociationRule, Category, LoyaltyAccount, LoyaltyTier, Order, OrderStatus, Product,
    ProductId, Role, User, UserId, UserProfile,
};
