//! Storage layer for the AuroraMart backend
//!
//! A single sqlx/SQLite backend, split by domain: catalog, carts, orders,
//! loyalty ledger, prediction records, and association rules. All writes to
//! contended rows (product stock, point balances) use guarded UPDATEs so
//! concurrent checkouts cannot lose updates or drive counters negative.

mod cart;
mod catalog;
mod loyalty;
mod orders;
mod predictions;
mod rules;
mod sqlite;
mod users;

pub use cart::CartView;
pub use catalog::{NewProduct, ProductFilter, ProductUpdate};
pub use loyalty::LoyaltyStats;
pub use orders::{NewOrder, NewOrderLine, OrderMetrics, SalesByCategoryRow};
pub use predictions::PredictionAccuracy;
pub use rules::MinedRule;
pub use sqlite::SqliteStore;
pub use users::{NewUser, ProfileUpdate};
