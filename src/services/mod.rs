//! Domain services layered over storage: pricing, loyalty math, the
//! prediction model, and the rule mining job

pub mod checkout;
pub mod loyalty;
pub mod miner;
pub mod predictor;

pub use checkout::{quote_cart, CheckoutService};
pub use miner::{mine_rules, MinerService, MiningReport};
pub use predictor::{ModelStatus, Prediction, PredictorService, TreeArtifact, TreeNode};
