//! NBA score forecasting from historical box scores
//!
//! Derives time-aware team ratings and form indicators game by game, then
//! backtests score regressors with walk-forward retraining.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// Result flag for one side of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinLoss {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
}

impl WinLoss {
    pub fn as_flag(&self) -> f64 {
        match self {
            WinLoss::Win => 1.0,
            WinLoss::Loss => 0.0,
        }
    }

    /// Win flag for a possibly missing result; missing counts as no win
    pub fn flag_or_zero(result: Option<WinLoss>) -> f64 {
        result.map_or(0.0, |r| r.as_flag())
    }
}

/// A single game row as delivered by the statistics provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "GAME_ID")]
    pub game_id: GameId,
    #[serde(rename = "GAME_DATE")]
    pub date: NaiveDate,
    #[serde(rename = "TEAM_NAME_home")]
    pub home_team: String,
    #[serde(rename = "TEAM_NAME_away")]
    pub away_team: String,
    #[serde(rename = "PTS_home")]
    pub home_points: u32,
    #[serde(rename = "PTS_away")]
    pub away_points: u32,
    #[serde(rename = "FGA_home")]
    pub home_fga: u32,
    #[serde(rename = "FGA_away")]
    pub away_fga: u32,
    #[serde(rename = "FTA_home")]
    pub home_fta: u32,
    #[serde(rename = "FTA_away")]
    pub away_fta: u32,
    #[serde(rename = "OREB_home")]
    pub home_oreb: u32,
    #[serde(rename = "OREB_away")]
    pub away_oreb: u32,
    #[serde(rename = "TOV_home")]
    pub home_tov: u32,
    #[serde(rename = "TOV_away")]
    pub away_tov: u32,
    /// Blank or unrecognized flags load as `None`
    #[serde(rename = "WL_home", default, deserialize_with = "csv::invalid_option")]
    pub home_result: Option<WinLoss>,
    #[serde(rename = "WL_away", default, deserialize_with = "csv::invalid_option")]
    pub away_result: Option<WinLoss>,
}

impl GameRecord {
    /// Check if a team took part in this game
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

/// One of the two independently tuned model configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Conservative,
    Chaos,
}

impl Regime {
    pub const ALL: [Regime; 2] = [Regime::Conservative, Regime::Chaos];
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Conservative => write!(f, "conservative"),
            Regime::Chaos => write!(f, "chaos"),
        }
    }
}

/// Retraining cadence for walk-forward validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrainPeriod {
    Monthly,
    Weekly,
}

impl RetrainPeriod {
    /// First boundary on or after `date` (month start, or Monday)
    pub fn align(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            RetrainPeriod::Monthly => {
                if date.day() == 1 {
                    Some(date)
                } else {
                    date.with_day(1)?.checked_add_months(Months::new(1))
                }
            }
            RetrainPeriod::Weekly => {
                let offset = (7 - date.weekday().num_days_from_monday()) % 7;
                date.checked_add_days(Days::new(offset as u64))
            }
        }
    }

    /// Boundary following `date`
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            RetrainPeriod::Monthly => date.checked_add_months(Months::new(1)),
            RetrainPeriod::Weekly => date.checked_add_days(Days::new(7)),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("Missing {artifact}: could not find {path}")]
    MissingInput { artifact: String, path: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Team not found in historical data: {0}")]
    TeamNotFound(String),

    #[error("No walk-forward window trained a model for the {regime} regime")]
    RegimeTrainingFailure { regime: Regime },

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub elo: EloConfig,
    pub rest: RestConfig,
    pub rolling: RollingConfig,
    pub validation: ValidationConfig,
    pub regimes: RegimesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub games_path: String,
    pub features_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            games_path: "data/nba_games.csv".to_string(),
            features_path: "data/nba_features.csv".to_string(),
        }
    }
}

/// Rating engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloConfig {
    /// Learning rate applied to (actual - expected)
    pub k_factor: f64,
    /// Weight pulling each updated rating toward the league mean
    pub reversion: f64,
    /// Rating for teams with no history, and the reset value
    pub base_rating: f64,
    /// Number of trailing emitted ratings in the league mean
    pub league_window: usize,
    pub rating_floor: f64,
    pub rating_ceiling: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            k_factor: 0.15,
            reversion: 0.01,
            base_rating: 1000.0,
            league_window: 1000,
            rating_floor: 0.0,
            rating_ceiling: 3000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Rest assumed before a team's first observed game
    pub default_rest_days: u32,
    pub max_rest_days: u32,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            default_rest_days: 3,
            max_rest_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    pub window: usize,
    pub default_points: f64,
    pub default_pace: f64,
    pub default_win_rate: f64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        RollingConfig {
            window: 5,
            default_points: 112.0,
            default_pace: 98.0,
            default_win_rate: 0.50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub start_date: NaiveDate,
    pub period: RetrainPeriod,
    /// Earliest game the chaos regime may train on
    pub chaos_cutoff: NaiveDate,
    pub min_train_rows: usize,
    /// Train windows on the rayon pool
    pub parallel: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            start_date: NaiveDate::from_ymd_opt(2023, 10, 24).unwrap_or_default(),
            period: RetrainPeriod::Monthly,
            chaos_cutoff: NaiveDate::from_ymd_opt(2021, 10, 19).unwrap_or_default(),
            min_train_rows: 200,
            parallel: true,
        }
    }
}

/// Hyperparameters for one regime's score regressors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    pub learning_rate: f64,
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
    pub weight_decay: f64,
    /// Fraction of training rows drawn each epoch
    pub subsample: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimesConfig {
    pub conservative: RegimeParams,
    pub chaos: RegimeParams,
}

impl RegimesConfig {
    pub fn params(&self, regime: Regime) -> &RegimeParams {
        match regime {
            Regime::Conservative => &self.conservative,
            Regime::Chaos => &self.chaos,
        }
    }
}

impl Default for RegimesConfig {
    fn default() -> Self {
        RegimesConfig {
            conservative: RegimeParams {
                learning_rate: 0.002,
                hidden_dims: vec![32],
                dropout: 0.1,
                weight_decay: 1e-3,
                subsample: 0.7,
                epochs: 120,
                batch_size: 64,
                seed: 42,
            },
            chaos: RegimeParams {
                learning_rate: 0.01,
                hidden_dims: vec![64, 64, 32],
                dropout: 0.0,
                weight_decay: 0.0,
                subsample: 1.0,
                epochs: 120,
                batch_size: 64,
                seed: 7,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoopsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_alignment() {
        let period = RetrainPeriod::Monthly;
        assert_eq!(period.align(date(2023, 10, 24)), Some(date(2023, 11, 1)));
        assert_eq!(period.align(date(2023, 11, 1)), Some(date(2023, 11, 1)));
        assert_eq!(period.advance(date(2023, 12, 1)), Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_weekly_alignment() {
        let period = RetrainPeriod::Weekly;
        // 2023-10-24 is a Tuesday
        assert_eq!(period.align(date(2023, 10, 24)), Some(date(2023, 10, 30)));
        assert_eq!(period.align(date(2023, 10, 30)), Some(date(2023, 10, 30)));
        assert_eq!(period.advance(date(2023, 10, 30)), Some(date(2023, 11, 6)));
    }

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.validation.start_date, date(2023, 10, 24));
        assert_eq!(parsed.validation.period, RetrainPeriod::Monthly);
        assert_eq!(parsed.regimes.chaos, config.regimes.chaos);
        assert_eq!(parsed.elo.k_factor, 0.15);
    }

    #[test]
    fn test_regime_params_lookup() {
        let regimes = RegimesConfig::default();
        let conservative = regimes.params(Regime::Conservative);
        let chaos = regimes.params(Regime::Chaos);
        assert!(conservative.learning_rate < chaos.learning_rate);
        assert!(conservative.hidden_dims.len() < chaos.hidden_dims.len());
        assert!(conservative.weight_decay > chaos.weight_decay);
        assert!(conservative.subsample < chaos.subsample);
    }
}
