//! Shared state for HTTP handlers

use crate::config::AppConfig;
use crate::services::{CheckoutService, MinerService, PredictorService};
use crate::storage::SqliteStore;
use std::sync::Arc;

/// Everything handlers need, cheap to clone per request
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub predictor: Arc<PredictorService>,
    pub checkout: Arc<CheckoutService>,
    pub miner: Arc<MinerService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: SqliteStore, predictor: PredictorService, config: AppConfig) -> Self {
        let checkout = CheckoutService::new(store.clone(), config.checkout.clone());
        let miner = MinerService::new(store.clone(), config.mining.clone());
        Self {
            store,
            predictor: Arc::new(predictor),
            checkout: Arc::new(checkout),
            miner: Arc::new(miner),
            config: Arc::new(config),
        }
    }
}
