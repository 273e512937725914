//! Feature table construction
//!
//! Runs the per-game passes in order over the sorted game table and keeps one
//! fully featurized row per valid game.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use crate::data::loader;
use crate::features::possessions::DerivationReport;
use crate::features::{
    EloRatingEngine, FeatureVector, MatchForm, PossessionDeriver, PossessionStats,
    PreGameRatings, RestDays, RestDaysCalculator, RollingFormEngine, SideFeatures,
};
use crate::{Config, GameRecord, HoopsError, Result};

/// A game with every derived column attached
#[derive(Debug, Clone, PartialEq)]
pub struct GameFeatures {
    pub record: GameRecord,
    pub possessions: PossessionStats,
    pub rest: RestDays,
    pub ratings: PreGameRatings,
    pub form: MatchForm,
}

impl GameFeatures {
    pub fn date(&self) -> NaiveDate {
        self.record.date
    }

    /// Model input for this game
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector::new(
            SideFeatures::from_state(&self.ratings.home, self.rest.home, &self.form.home),
            SideFeatures::from_state(&self.ratings.away, self.rest.away, &self.form.away),
        )
    }
}

/// Summary of a dataset build
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildReport {
    pub derivation: DerivationReport,
    pub rating_resets: usize,
    pub teams: usize,
}

/// The featurized game table, in (date, game id) order
#[derive(Debug, Clone)]
pub struct GameDataset {
    games: Vec<GameFeatures>,
    report: BuildReport,
}

impl GameDataset {
    /// Load the game table from CSV and build features
    pub fn from_csv<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let records = loader::load_games(path)?;
        Self::build(records, config)
    }

    /// Build features from raw records (sorted here if they are not already)
    pub fn build(records: Vec<GameRecord>, config: &Config) -> Result<Self> {
        let records = if loader::is_chronological(&records) {
            records
        } else {
            loader::sort_chronologically(records)
        };

        let (games, derivation) = PossessionDeriver::new().derive_all(records);
        if games.is_empty() {
            return Err(HoopsError::InvalidInput(
                "no valid games after filtering".to_string(),
            ));
        }

        let rest = RestDaysCalculator::new(config.rest.clone()).apply(&games);

        let mut elo = EloRatingEngine::new(config.elo.clone());
        let ratings = elo.apply(&games);

        let form = RollingFormEngine::new(config.rolling.clone()).apply(&games);

        let report = BuildReport {
            derivation,
            rating_resets: elo.divergence_resets(),
            teams: elo.teams().count(),
        };

        let games: Vec<GameFeatures> = games
            .into_iter()
            .zip(rest)
            .zip(ratings)
            .zip(form)
            .map(|(((game, rest), ratings), form)| GameFeatures {
                record: game.record,
                possessions: game.possessions,
                rest,
                ratings,
                form,
            })
            .collect();

        log::info!(
            "Built features for {} games across {} teams ({} dropped)",
            games.len(),
            report.teams,
            report.derivation.dropped()
        );

        Ok(GameDataset { games, report })
    }

    pub fn games(&self) -> &[GameFeatures] {
        &self.games
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.games.first().map(|g| g.date())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.games.last().map(|g| g.date())
    }

    /// Write the feature table snapshot as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        for game in &self.games {
            writer.serialize(FeatureRow::from(game))?;
        }
        writer.flush()?;

        log::info!("Wrote {} feature rows to {}", self.games.len(), path.display());
        Ok(())
    }
}

/// Flat CSV row for the snapshot export
#[derive(Debug, Serialize)]
struct FeatureRow<'a> {
    #[serde(rename = "GAME_ID")]
    game_id: String,
    #[serde(rename = "GAME_DATE")]
    date: NaiveDate,
    #[serde(rename = "TEAM_NAME_home")]
    home_team: &'a str,
    #[serde(rename = "TEAM_NAME_away")]
    away_team: &'a str,
    #[serde(rename = "PTS_home")]
    home_points: u32,
    #[serde(rename = "PTS_away")]
    away_points: u32,
    #[serde(rename = "POSS_home")]
    home_possessions: f64,
    #[serde(rename = "POSS_away")]
    away_possessions: f64,
    #[serde(rename = "GAME_PACE")]
    pace: f64,
    #[serde(rename = "OFF_EFF_home_actual")]
    home_efficiency: f64,
    #[serde(rename = "OFF_EFF_away_actual")]
    away_efficiency: f64,
    #[serde(rename = "PACE_actual")]
    pace_index: f64,
    home_rest_days: u32,
    away_rest_days: u32,
    home_off_rating_pre: f64,
    home_def_rating_pre: f64,
    home_pace_rating_pre: f64,
    away_off_rating_pre: f64,
    away_def_rating_pre: f64,
    away_pace_rating_pre: f64,
    home_roll_pts: f64,
    home_roll_pace: f64,
    home_roll_win: f64,
    away_roll_pts: f64,
    away_roll_pace: f64,
    away_roll_win: f64,
}

impl<'a> From<&'a GameFeatures> for FeatureRow<'a> {
    fn from(g: &'a GameFeatures) -> Self {
        let r = &g.record;
        FeatureRow {
            game_id: r.game_id.to_string(),
            date: r.date,
            home_team: &r.home_team,
            away_team: &r.away_team,
            home_points: r.home_points,
            away_points: r.away_points,
            home_possessions: g.possessions.home_possessions,
            away_possessions: g.possessions.away_possessions,
            pace: g.possessions.pace,
            home_efficiency: g.possessions.home_efficiency,
            away_efficiency: g.possessions.away_efficiency,
            pace_index: g.possessions.pace_index,
            home_rest_days: g.rest.home,
            away_rest_days: g.rest.away,
            home_off_rating_pre: g.ratings.home.offense,
            home_def_rating_pre: g.ratings.home.defense,
            home_pace_rating_pre: g.ratings.home.pace,
            away_off_rating_pre: g.ratings.away.offense,
            away_def_rating_pre: g.ratings.away.defense,
            away_pace_rating_pre: g.ratings.away.pace,
            home_roll_pts: g.form.home.points,
            home_roll_pace: g.form.home.pace,
            home_roll_win: g.form.home.win_rate,
            away_roll_pts: g.form.away.points,
            away_roll_pace: g.form.away.pace,
            away_roll_win: g.form.away.win_rate,
        }
    }
}

/// Synthetic leagues for tests across the crate
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::{GameId, WinLoss};
    use chrono::Days;

    pub const TEAMS: [&str; 4] = ["Atlanta", "Boston", "Chicago", "Denver"];

    /// A plausible game between two teams
    pub fn game(id: u64, date: NaiveDate, home: &str, away: &str, home_pts: u32, away_pts: u32) -> GameRecord {
        let home_won = home_pts > away_pts;
        GameRecord {
            game_id: GameId(id),
            date,
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_points: home_pts,
            away_points: away_pts,
            home_fga: 88,
            away_fga: 87,
            home_fta: 22,
            away_fta: 20,
            home_oreb: 10,
            away_oreb: 9,
            home_tov: 14,
            away_tov: 13,
            home_result: Some(if home_won { WinLoss::Win } else { WinLoss::Loss }),
            away_result: Some(if home_won { WinLoss::Loss } else { WinLoss::Win }),
        }
    }

    /// Round-robin league: one game per day from `start`, cycling matchups
    pub fn league(start: NaiveDate, n_games: usize) -> Vec<GameRecord> {
        let pairs = [(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)];
        (0..n_games)
            .map(|i| {
                let (h, a) = pairs[i % pairs.len()];
                let (h, a) = if (i / pairs.len()) % 2 == 0 { (h, a) } else { (a, h) };
                let home_pts = 100 + ((i * 7) % 25) as u32;
                let away_pts = 98 + ((i * 11) % 27) as u32;
                let away_pts = if away_pts == home_pts { away_pts + 1 } else { away_pts };
                game(
                    i as u64 + 1,
                    start + Days::new(i as u64),
                    TEAMS[h],
                    TEAMS[a],
                    home_pts,
                    away_pts,
                )
            })
            .collect()
    }

    pub fn dataset(start: NaiveDate, n_games: usize) -> GameDataset {
        GameDataset::build(league(start, n_games), &Config::default()).unwrap()
    }
}
