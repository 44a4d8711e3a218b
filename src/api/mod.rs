//! HTTP API: public storefront surface and the capability-gated admin panel

pub mod admin;
pub mod auth;
pub mod server;
pub mod state;

pub use auth::{allows, AuthSession, Capability};
pub use server::ApiServer;
pub use state::AppState;
