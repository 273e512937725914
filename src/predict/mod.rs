//! Prediction and inference
//!
//! Matchup predictions from the deployed regime models, and pricing of
//! totals lines against them.

pub mod betting;
pub mod inference;

pub use betting::{evaluate_lines, line_edge, LineEdge, Side};
pub use inference::{format_prediction, MatchupPrediction, PredictionOracle, RegimePrediction};
