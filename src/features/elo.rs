//! Elo-style offense, defense and pace ratings
//!
//! Ratings move toward observed efficiency and pace game by game, are pulled
//! slightly toward a trailing league mean, and are reset when they diverge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::features::possessions::ValidGame;
use crate::EloConfig;

/// Offense, defense and pace ratings for one team
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRatings {
    pub offense: f64,
    pub defense: f64,
    pub pace: f64,
}

impl TeamRatings {
    pub fn uniform(rating: f64) -> Self {
        TeamRatings {
            offense: rating,
            defense: rating,
            pace: rating,
        }
    }
}

/// Ratings of both teams as they stood before a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreGameRatings {
    pub home: TeamRatings,
    pub away: TeamRatings,
}

/// Append-only record of every emitted rating, one sequence per metric
#[derive(Debug, Clone)]
pub struct LeagueHistory {
    offense: Vec<f64>,
    defense: Vec<f64>,
    pace: Vec<f64>,
}

impl LeagueHistory {
    /// Each sequence starts with one seed value
    fn seeded(seed: f64) -> Self {
        LeagueHistory {
            offense: vec![seed],
            defense: vec![seed],
            pace: vec![seed],
        }
    }

    /// Trailing means over the last `window` values of each sequence
    pub fn trailing_means(&self, window: usize) -> TeamRatings {
        TeamRatings {
            offense: trailing_mean(&self.offense, window),
            defense: trailing_mean(&self.defense, window),
            pace: trailing_mean(&self.pace, window),
        }
    }

    /// Number of ratings emitted per metric (seed excluded)
    pub fn emitted_len(&self) -> usize {
        self.offense.len() - 1
    }

    pub fn offense(&self) -> &[f64] {
        &self.offense[1..]
    }

    pub fn pace(&self) -> &[f64] {
        &self.pace[1..]
    }
}

fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window.max(1));
    let tail = &values[start..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Rating state machine over all teams
pub struct EloRatingEngine {
    ratings: HashMap<String, TeamRatings>,
    history: LeagueHistory,
    config: EloConfig,
    resets: usize,
}

impl Default for EloRatingEngine {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl EloRatingEngine {
    pub fn new(config: EloConfig) -> Self {
        EloRatingEngine {
            ratings: HashMap::new(),
            history: LeagueHistory::seeded(config.base_rating),
            config,
            resets: 0,
        }
    }

    /// Current ratings for a team (base rating if never seen)
    pub fn ratings(&self, team: &str) -> TeamRatings {
        self.ratings
            .get(team)
            .copied()
            .unwrap_or_else(|| TeamRatings::uniform(self.config.base_rating))
    }

    /// Trailing league means used as the reversion target
    pub fn league_means(&self) -> TeamRatings {
        self.history.trailing_means(self.config.league_window)
    }

    pub fn history(&self) -> &LeagueHistory {
        &self.history
    }

    /// How many updates were reset to the base rating
    pub fn divergence_resets(&self) -> usize {
        self.resets
    }

    /// Single rating update with reversion and the stability clamp.
    ///
    /// `new = r + k * (actual - expected)`, then blended with the league mean
    /// by the reversion weight. The clamp is checked after blending.
    pub fn safe_update(&self, old: f64, actual: f64, expected: f64, league_mean: f64) -> Option<f64> {
        let k = self.config.k_factor;
        let w = self.config.reversion;

        let updated = old + k * (actual - expected);
        let blended = updated * (1.0 - w) + league_mean * w;

        if !blended.is_finite()
            || blended > self.config.rating_ceiling
            || blended < self.config.rating_floor
        {
            return None;
        }
        Some(blended)
    }

    fn update_or_reset(
        &mut self,
        team: &str,
        metric: &str,
        old: f64,
        actual: f64,
        expected: f64,
        league_mean: f64,
    ) -> f64 {
        match self.safe_update(old, actual, expected, league_mean) {
            Some(rating) => rating,
            None => {
                self.resets += 1;
                log::debug!(
                    "{} {} rating diverged (old={:.1}, actual={:.1}, expected={:.1}); resetting",
                    team,
                    metric,
                    old,
                    actual,
                    expected
                );
                self.config.base_rating
            }
        }
    }

    /// Emit pre-game ratings, then update both teams from the game's outcome.
    ///
    /// `home_efficiency` and `away_efficiency` are points per 1000
    /// possessions; `pace_index` is the game's pace on the rating scale.
    pub fn process(
        &mut self,
        home: &str,
        away: &str,
        home_efficiency: f64,
        away_efficiency: f64,
        pace_index: f64,
    ) -> PreGameRatings {
        let h = self.ratings(home);
        let a = self.ratings(away);
        let pre_game = PreGameRatings { home: h, away: a };

        let league = self.league_means();

        // Home offense against away defense
        let expected_home = h.offense + (a.defense - league.defense);
        let home_offense =
            self.update_or_reset(home, "offense", h.offense, home_efficiency, expected_home, league.offense);
        let away_defense =
            self.update_or_reset(away, "defense", a.defense, home_efficiency, expected_home, league.defense);

        // Away offense against home defense
        let expected_away = a.offense + (h.defense - league.defense);
        let away_offense =
            self.update_or_reset(away, "offense", a.offense, away_efficiency, expected_away, league.offense);
        let home_defense =
            self.update_or_reset(home, "defense", h.defense, away_efficiency, expected_away, league.defense);

        let expected_pace = (h.pace + a.pace) / 2.0;
        let home_pace = self.update_or_reset(home, "pace", h.pace, pace_index, expected_pace, league.pace);
        let away_pace = self.update_or_reset(away, "pace", a.pace, pace_index, expected_pace, league.pace);

        let home_new = TeamRatings {
            offense: home_offense,
            defense: home_defense,
            pace: home_pace,
        };
        let away_new = TeamRatings {
            offense: away_offense,
            defense: away_defense,
            pace: away_pace,
        };

        self.ratings.insert(home.to_string(), home_new);
        self.ratings.insert(away.to_string(), away_new);

        self.history.offense.extend([home_new.offense, away_new.offense]);
        self.history.defense.extend([home_new.defense, away_new.defense]);
        self.history.pace.extend([home_new.pace, away_new.pace]);

        pre_game
    }

    pub fn process_game(&mut self, game: &ValidGame) -> PreGameRatings {
        self.process(
            &game.record.home_team,
            &game.record.away_team,
            game.possessions.home_efficiency,
            game.possessions.away_efficiency,
            game.possessions.pace_index,
        )
    }

    /// Sweep sorted games, returning pre-game ratings per row
    pub fn apply(&mut self, games: &[ValidGame]) -> Vec<PreGameRatings> {
        let out: Vec<_> = games.iter().map(|g| self.process_game(g)).collect();
        if self.resets > 0 {
            log::info!("Rating engine reset {} diverged ratings", self.resets);
        }
        out
    }

    /// Teams with at least one processed game
    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.ratings.keys().map(|k| k.as_str())
    }
}
