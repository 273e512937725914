//! Live matchup predictions
//!
//! The oracle indexes each team's latest rating and form state and runs both
//! regimes' score models on a matchup. The regimes are reported side by side,
//! never blended.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::data::GameDataset;
use crate::features::temporal::capped_rest_days;
use crate::features::{FeatureVector, RollingForm, SideFeatures, TeamRatings};
use crate::model::{Regressor, ScorePair};
use crate::{HoopsError, Regime, Result};

/// A team's state as of its latest indexed game
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamSnapshot {
    pub last_game: NaiveDate,
    pub ratings: TeamRatings,
    pub form: RollingForm,
}

/// One regime's view of a matchup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimePrediction {
    pub regime: Regime,
    pub home: String,
    pub away: String,
    pub predicted_home_score: f64,
    pub predicted_away_score: f64,
    pub predicted_total: f64,
}

/// Both regimes' predictions plus the input they were made from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupPrediction {
    pub conservative: RegimePrediction,
    pub chaos: RegimePrediction,
    pub features: FeatureVector,
}

impl MatchupPrediction {
    pub fn regime(&self, regime: Regime) -> &RegimePrediction {
        match regime {
            Regime::Conservative => &self.conservative,
            Regime::Chaos => &self.chaos,
        }
    }
}

/// Answers matchup queries from the deployable model pairs
pub struct PredictionOracle<M: Regressor> {
    conservative: ScorePair<M>,
    chaos: ScorePair<M>,
    index: HashMap<String, TeamSnapshot>,
    max_rest_days: u32,
}

impl<M: Regressor> PredictionOracle<M> {
    pub fn new(
        conservative: ScorePair<M>,
        chaos: ScorePair<M>,
        dataset: &GameDataset,
        max_rest_days: u32,
    ) -> Self {
        let mut index = HashMap::new();

        // Table order is chronological, so later rows overwrite earlier ones
        for game in dataset.games() {
            for (team, ratings, form) in [
                (&game.record.home_team, game.ratings.home, game.form.home),
                (&game.record.away_team, game.ratings.away, game.form.away),
            ] {
                index.insert(
                    team.clone(),
                    TeamSnapshot {
                        last_game: game.date(),
                        ratings,
                        form,
                    },
                );
            }
        }

        log::info!("Indexed {} teams for prediction", index.len());

        PredictionOracle {
            conservative,
            chaos,
            index,
            max_rest_days,
        }
    }

    /// Indexed team names, sorted
    pub fn teams(&self) -> Vec<&str> {
        let mut teams: Vec<&str> = self.index.keys().map(String::as_str).collect();
        teams.sort_unstable();
        teams
    }

    /// Canonical team name for a case-insensitive query
    pub fn resolve_team(&self, query: &str) -> Option<&str> {
        let query = query.trim();
        self.index
            .get_key_value(query)
            .map(|(name, _)| name.as_str())
            .or_else(|| {
                self.index
                    .keys()
                    .find(|name| name.eq_ignore_ascii_case(query))
                    .map(String::as_str)
            })
    }

    pub fn snapshot(&self, team: &str) -> Option<&TeamSnapshot> {
        self.resolve_team(team).and_then(|name| self.index.get(name))
    }

    fn lookup(&self, team: &str) -> Result<(&str, &TeamSnapshot)> {
        let name = self
            .resolve_team(team)
            .ok_or_else(|| HoopsError::TeamNotFound(team.to_string()))?;
        let snapshot = self
            .index
            .get(name)
            .ok_or_else(|| HoopsError::TeamNotFound(team.to_string()))?;
        Ok((name, snapshot))
    }

    fn side_features(&self, snapshot: &TeamSnapshot, today: NaiveDate) -> SideFeatures {
        let rest = capped_rest_days(snapshot.last_game, today, self.max_rest_days);
        SideFeatures::from_state(&snapshot.ratings, rest, &snapshot.form)
    }

    /// Predict a matchup as of `today`
    pub fn predict(&self, home: &str, away: &str, today: NaiveDate) -> Result<MatchupPrediction> {
        let (home_name, home_snapshot) = self.lookup(home)?;
        let (away_name, away_snapshot) = self.lookup(away)?;

        let features = FeatureVector::new(
            self.side_features(home_snapshot, today),
            self.side_features(away_snapshot, today),
        );

        let regime_prediction = |regime: Regime, pair: &ScorePair<M>| -> Result<RegimePrediction> {
            let (home_score, away_score) = pair
                .predict(std::slice::from_ref(&features))?
                .into_iter()
                .next()
                .ok_or_else(|| HoopsError::Model("empty prediction".to_string()))?;
            Ok(RegimePrediction {
                regime,
                home: home_name.to_string(),
                away: away_name.to_string(),
                predicted_home_score: home_score as f64,
                predicted_away_score: away_score as f64,
                predicted_total: home_score as f64 + away_score as f64,
            })
        };

        Ok(MatchupPrediction {
            conservative: regime_prediction(Regime::Conservative, &self.conservative)?,
            chaos: regime_prediction(Regime::Chaos, &self.chaos)?,
            features,
        })
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &MatchupPrediction) -> String {
    let row = |p: &RegimePrediction| {
        format!(
            "│  {:<13} {:>6.1} - {:<6.1}  total {:>6.1}",
            p.regime.to_string(),
            p.predicted_home_score,
            p.predicted_away_score,
            p.predicted_total
        )
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  Rest days:     {} {:.0} / {} {:.0}
{}
{}
└─────────────────────────────────────────────────┘
"#,
        pred.conservative.home,
        pred.conservative.away,
        pred.conservative.home,
        pred.features.home.rest_days,
        pred.conservative.away,
        pred.features.away.rest_days,
        row(&pred.conservative),
        row(&pred.chaos),
    )
}
