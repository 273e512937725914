//! Data ingestion and the feature table
//!
//! CSV loading of the provider's game log and the featurized dataset built
//! from it.

pub mod dataset;
pub mod loader;

pub use dataset::{GameDataset, GameFeatures};
pub use loader::load_games;
