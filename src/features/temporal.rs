//! Rest-day features
//!
//! Days since each team's previous game, capped, computed in a single
//! forward pass over chronologically sorted games.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::features::possessions::ValidGame;
use crate::RestConfig;

/// Rest days for both sides of a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestDays {
    pub home: u32,
    pub away: u32,
}

/// Capped days between `last` and `on`. Dates before `last` count as zero.
pub fn capped_rest_days(last: NaiveDate, on: NaiveDate, max_rest_days: u32) -> u32 {
    (on - last).num_days().clamp(0, max_rest_days as i64) as u32
}

/// Tracks the last game date per team
pub struct RestDaysCalculator {
    last_played: HashMap<String, NaiveDate>,
    config: RestConfig,
}

impl Default for RestDaysCalculator {
    fn default() -> Self {
        Self::new(RestConfig::default())
    }
}

impl RestDaysCalculator {
    pub fn new(config: RestConfig) -> Self {
        RestDaysCalculator {
            last_played: HashMap::new(),
            config,
        }
    }

    /// Rest for a team playing on `date` (call BEFORE recording the game)
    pub fn rest_for(&self, team: &str, date: NaiveDate) -> u32 {
        match self.last_played.get(team) {
            Some(last) => capped_rest_days(*last, date, self.config.max_rest_days),
            None => self.config.default_rest_days,
        }
    }

    /// Compute both sides' rest, then record the game date for both teams
    pub fn process(&mut self, home: &str, away: &str, date: NaiveDate) -> RestDays {
        let rest = RestDays {
            home: self.rest_for(home, date),
            away: self.rest_for(away, date),
        };

        self.last_played.insert(home.to_string(), date);
        self.last_played.insert(away.to_string(), date);

        rest
    }

    /// One linear pass over sorted games
    pub fn apply(&mut self, games: &[ValidGame]) -> Vec<RestDays> {
        games
            .iter()
            .map(|g| self.process(&g.record.home_team, &g.record.away_team, g.record.date))
            .collect()
    }

    /// Last recorded game date for a team
    pub fn last_played(&self, team: &str) -> Option<NaiveDate> {
        self.last_played.get(team).copied()
    }
}
