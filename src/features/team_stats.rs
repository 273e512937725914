//! Rolling team form
//!
//! Trailing averages of points, pace and wins over each team's most recent
//! games. A game never contributes to its own form values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::features::possessions::ValidGame;
use crate::{RollingConfig, WinLoss};

/// One entry in a team's game log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormEntry {
    pub points: f64,
    pub pace: f64,
    pub win: f64,
}

/// Rolling averages for a team going into a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingForm {
    pub points: f64,
    pub pace: f64,
    pub win_rate: f64,
}

/// Rolling form for both sides of a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchForm {
    pub home: RollingForm,
    pub away: RollingForm,
}

/// Per-team chronological game logs with lagged window averages
pub struct RollingFormEngine {
    logs: HashMap<String, Vec<FormEntry>>,
    config: RollingConfig,
}

impl Default for RollingFormEngine {
    fn default() -> Self {
        Self::new(RollingConfig::default())
    }
}

impl RollingFormEngine {
    pub fn new(config: RollingConfig) -> Self {
        RollingFormEngine {
            logs: HashMap::new(),
            config,
        }
    }

    fn defaults(&self) -> RollingForm {
        RollingForm {
            points: self.config.default_points,
            pace: self.config.default_pace,
            win_rate: self.config.default_win_rate,
        }
    }

    /// Form over the last `window` logged games. Teams with fewer logged
    /// games get the configured defaults.
    pub fn form_before(&self, team: &str) -> RollingForm {
        let window = self.config.window;
        let log = match self.logs.get(team) {
            Some(log) if window > 0 && log.len() >= window => log,
            _ => return self.defaults(),
        };

        let recent = &log[log.len() - window..];
        let n = window as f64;
        RollingForm {
            points: recent.iter().map(|e| e.points).sum::<f64>() / n,
            pace: recent.iter().map(|e| e.pace).sum::<f64>() / n,
            win_rate: recent.iter().map(|e| e.win).sum::<f64>() / n,
        }
    }

    /// Append an entry to a team's log
    pub fn record(&mut self, team: &str, entry: FormEntry) {
        self.logs.entry(team.to_string()).or_default().push(entry);
    }

    /// Form for both sides before the game, then log the game for both
    pub fn process_game(&mut self, game: &ValidGame) -> MatchForm {
        let r = &game.record;
        let form = MatchForm {
            home: self.form_before(&r.home_team),
            away: self.form_before(&r.away_team),
        };

        self.record(
            &r.home_team,
            FormEntry {
                points: r.home_points as f64,
                pace: game.possessions.pace_index,
                win: WinLoss::flag_or_zero(r.home_result),
            },
        );
        self.record(
            &r.away_team,
            FormEntry {
                points: r.away_points as f64,
                pace: game.possessions.pace_index,
                win: WinLoss::flag_or_zero(r.away_result),
            },
        );

        form
    }

    /// Sweep sorted games, returning lagged form per row
    pub fn apply(&mut self, games: &[ValidGame]) -> Vec<MatchForm> {
        games.iter().map(|g| self.process_game(g)).collect()
    }

    /// A team's full game log in chronological order
    pub fn log(&self, team: &str) -> &[FormEntry] {
        self.logs.get(team).map(|l| l.as_slice()).unwrap_or(&[])
    }
}
