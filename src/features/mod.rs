//! Feature extraction
//!
//! Stateful per-game passes that turn box scores into model-ready features.
//! Every pass expects games in (date, game id) order.

pub mod elo;
pub mod match_repr;
pub mod possessions;
pub mod team_stats;
pub mod temporal;

pub use elo::{EloRatingEngine, PreGameRatings, TeamRatings};
pub use match_repr::{FeatureVector, SideFeatures};
pub use possessions::{PossessionDeriver, PossessionStats, ValidGame};
pub use team_stats::{MatchForm, RollingForm, RollingFormEngine};
pub use temporal::{RestDays, RestDaysCalculator};
