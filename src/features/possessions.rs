//! Possession, pace and efficiency derivation
//!
//! Estimates possessions from box-score counts and drops rows whose derived
//! metrics cannot come from a real game.

use serde::{Deserialize, Serialize};

use crate::GameRecord;

/// Free throws that end a possession, per attempt
const FREE_THROW_WEIGHT: f64 = 0.44;

/// Points per possession scaling used for efficiency
const EFFICIENCY_SCALE: f64 = 1000.0;

/// Pace index = pace * PACE_SCALE
const PACE_SCALE: f64 = 10.0;

const EFFICIENCY_BOUNDS: (f64, f64) = (10.0, 3000.0);
const PACE_INDEX_BOUNDS: (f64, f64) = (500.0, 2000.0);

/// Derived possession metrics for one game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PossessionStats {
    pub home_possessions: f64,
    pub away_possessions: f64,
    /// Mean possessions per side (every game treated as 48 minutes)
    pub pace: f64,
    /// Pace on the rating scale (pace * 10)
    pub pace_index: f64,
    pub home_efficiency: f64,
    pub away_efficiency: f64,
}

impl PossessionStats {
    /// Derive metrics from a raw row. Returns None when either side has zero
    /// possessions, which would make efficiency undefined.
    pub fn from_record(record: &GameRecord) -> Option<Self> {
        let home_possessions = possessions(
            record.home_fga,
            record.home_fta,
            record.home_oreb,
            record.home_tov,
        );
        let away_possessions = possessions(
            record.away_fga,
            record.away_fta,
            record.away_oreb,
            record.away_tov,
        );

        if home_possessions == 0.0 || away_possessions == 0.0 {
            return None;
        }

        let pace = (home_possessions + away_possessions) / 2.0;

        Some(PossessionStats {
            home_possessions,
            away_possessions,
            pace,
            pace_index: pace * PACE_SCALE,
            home_efficiency: record.home_points as f64 / home_possessions * EFFICIENCY_SCALE,
            away_efficiency: record.away_points as f64 / away_possessions * EFFICIENCY_SCALE,
        })
    }

    /// Both efficiencies and the pace index sit strictly inside their bounds
    pub fn is_plausible(&self) -> bool {
        let within = |v: f64, (lo, hi): (f64, f64)| v.is_finite() && v > lo && v < hi;
        within(self.home_efficiency, EFFICIENCY_BOUNDS)
            && within(self.away_efficiency, EFFICIENCY_BOUNDS)
            && within(self.pace_index, PACE_INDEX_BOUNDS)
    }
}

/// Standard possession estimate: FGA + 0.44 * FTA - OREB + TOV
pub fn possessions(fga: u32, fta: u32, oreb: u32, tov: u32) -> f64 {
    fga as f64 + FREE_THROW_WEIGHT * fta as f64 - oreb as f64 + tov as f64
}

/// A game that passed the validity filter
#[derive(Debug, Clone, PartialEq)]
pub struct ValidGame {
    pub record: GameRecord,
    pub possessions: PossessionStats,
}

/// Why a row was excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    /// Zero possessions on one side
    Missing,
    /// Efficiency or pace outside the plausible range
    Implausible,
}

/// Counts from a derivation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationReport {
    pub total: usize,
    pub kept: usize,
    pub missing: usize,
    pub implausible: usize,
}

impl DerivationReport {
    pub fn dropped(&self) -> usize {
        self.missing + self.implausible
    }
}

/// Derives possession metrics and filters invalid rows
#[derive(Debug, Clone, Copy, Default)]
pub struct PossessionDeriver;

impl PossessionDeriver {
    pub fn new() -> Self {
        PossessionDeriver
    }

    /// Derive one row, or say why it must be dropped
    pub fn derive(&self, record: GameRecord) -> Result<ValidGame, RowRejection> {
        let stats = PossessionStats::from_record(&record).ok_or(RowRejection::Missing)?;
        if !stats.is_plausible() {
            return Err(RowRejection::Implausible);
        }
        Ok(ValidGame {
            record,
            possessions: stats,
        })
    }

    /// Derive every row, keeping input order. Dropped rows never come back.
    pub fn derive_all(&self, records: Vec<GameRecord>) -> (Vec<ValidGame>, DerivationReport) {
        let mut report = DerivationReport {
            total: records.len(),
            ..Default::default()
        };
        let mut games = Vec::with_capacity(records.len());

        for record in records {
            let game_id = record.game_id;
            match self.derive(record) {
                Ok(game) => games.push(game),
                Err(reason) => {
                    log::debug!("Dropping game {}: {:?}", game_id, reason);
                    match reason {
                        RowRejection::Missing => report.missing += 1,
                        RowRejection::Implausible => report.implausible += 1,
                    }
                }
            }
        }

        report.kept = games.len();
        if report.dropped() > 0 {
            log::warn!(
                "Dropped {} of {} games ({} missing possessions, {} implausible)",
                report.dropped(),
                report.total,
                report.missing,
                report.implausible
            );
        }

        (games, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameId, WinLoss};
    use chrono::NaiveDate;

    fn make_record(home_points: u32, away_points: u32) -> GameRecord {
        GameRecord {
            game_id: GameId(1),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            home_team: "Boston Celtics".to_string(),
            away_team: "Miami Heat".to_string(),
            home_points,
            away_points,
            home_fga: 88,
            away_fga: 90,
            home_fta: 25,
            away_fta: 20,
            home_oreb: 10,
            away_oreb: 12,
            home_tov: 13,
            away_tov: 14,
            home_result: Some(WinLoss::Win),
            away_result: Some(WinLoss::Loss),
        }
    }

    #[test]
    fn test_possession_formula() {
        let p = possessions(88, 25, 10, 13);
        assert!((p - 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_metrics() {
        let stats = PossessionStats::from_record(&make_record(120, 100)).unwrap();
        // away: 90 + 8.8 - 12 + 14 = 100.8
        assert!((stats.away_possessions - 100.8).abs() < 1e-9);
        assert!((stats.pace - 101.4).abs() < 1e-9);
        assert!((stats.pace_index - 1014.0).abs() < 1e-9);
        assert!((stats.home_efficiency - 120.0 / 102.0 * 1000.0).abs() < 1e-9);
        assert!(stats.is_plausible());
    }

    #[test]
    fn test_zero_possessions_is_missing() {
        let mut record = make_record(100, 100);
        record.home_fga = 0;
        record.home_fta = 0;
        record.home_oreb = 0;
        record.home_tov = 0;

        let deriver = PossessionDeriver::new();
        assert_eq!(deriver.derive(record), Err(RowRejection::Missing));
    }

    #[test]
    fn test_implausible_rows_dropped() {
        let deriver = PossessionDeriver::new();

        // Zero points -> efficiency 0, below the lower bound
        let scoreless = make_record(0, 100);
        // Huge possession count pushes the pace index past 2000
        let mut runaway = make_record(110, 105);
        runaway.home_fga = 400;
        runaway.away_fga = 400;

        let (games, report) =
            deriver.derive_all(vec![make_record(110, 104), scoreless, runaway]);

        assert_eq!(games.len(), 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.kept, 1);
        assert_eq!(report.implausible, 2);
        assert_eq!(report.missing, 0);
    }
}
