//! Score models
//!
//! The regressor capability traits and the burn network behind them.

pub mod mlp;
pub mod regressor;

pub use mlp::{ScoreNet, ScoreNetConfig};
pub use regressor::{Regressor, RegressorTrainer, ScorePair};
