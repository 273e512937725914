//! Model training
//!
//! The burn training loop, walk-forward backtesting, and error metrics.

pub mod metrics;
pub mod mlp_trainer;
pub mod walk_forward;

pub use metrics::ErrorMetrics;
pub use mlp_trainer::{MlpRegressor, MlpTrainer};
pub use walk_forward::{
    window_boundaries, BacktestPrediction, RegimeOutcome, SkipReason, SkippedWindow,
    ValidationReport, WalkForwardValidator, WindowReport,
};
