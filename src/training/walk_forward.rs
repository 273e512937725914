//! Walk-forward backtesting
//!
//! The game table is cut at periodic boundaries. Each window retrains both
//! regimes from scratch on games strictly before its start and scores the
//! games inside it. Nothing is shuffled across the time axis.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::ops::Range;

use crate::data::{GameDataset, GameFeatures};
use crate::features::FeatureVector;
use crate::model::{RegressorTrainer, ScorePair};
use crate::training::metrics::ErrorMetrics;
use crate::{
    Config, GameId, HoopsError, Regime, RegimesConfig, Result, RetrainPeriod, ValidationConfig,
};

/// Boundary dates from the aligned start through `end` (inclusive)
pub fn window_boundaries(start: NaiveDate, end: NaiveDate, period: RetrainPeriod) -> Vec<NaiveDate> {
    let mut boundaries = Vec::new();
    let mut current = period.align(start);
    while let Some(boundary) = current {
        if boundary > end {
            break;
        }
        boundaries.push(boundary);
        current = period.advance(boundary);
    }
    boundaries
}

/// Why a window was not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientTraining { rows: usize, required: usize },
    EmptyTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedWindow {
    pub index: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub reason: SkipReason,
}

/// One evaluated window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowReport {
    pub index: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_first_date: Option<NaiveDate>,
    pub train_last_date: Option<NaiveDate>,
    pub test_first_date: NaiveDate,
    pub test_last_date: NaiveDate,
    pub rmse: f64,
}

/// An out-of-sample prediction for one game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestPrediction {
    pub regime: Regime,
    pub window: usize,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub actual_home: f64,
    pub actual_away: f64,
    pub predicted_home: f64,
    pub predicted_away: f64,
}

impl BacktestPrediction {
    pub fn actual_total(&self) -> f64 {
        self.actual_home + self.actual_away
    }

    pub fn predicted_total(&self) -> f64 {
        self.predicted_home + self.predicted_away
    }
}

/// Backtest result for one regime
#[derive(Debug, Clone)]
pub struct RegimeOutcome<M> {
    pub regime: Regime,
    /// Pair trained by the last evaluated window
    pub models: Option<ScorePair<M>>,
    pub metrics: ErrorMetrics,
    pub windows: Vec<WindowReport>,
    pub skipped: Vec<SkippedWindow>,
    pub predictions: Vec<BacktestPrediction>,
}

impl<M> RegimeOutcome<M> {
    /// RMSE on the summed score over all evaluated windows
    pub fn rmse(&self) -> Option<f64> {
        self.metrics.rmse_total()
    }

    pub fn is_trained(&self) -> bool {
        self.models.is_some()
    }

    /// The deployable pair, or `RegimeTrainingFailure` if no window trained
    pub fn into_models(self) -> Result<ScorePair<M>> {
        let regime = self.regime;
        self.models
            .ok_or(HoopsError::RegimeTrainingFailure { regime })
    }
}

/// Both regimes' backtests over the same table
#[derive(Debug, Clone)]
pub struct ValidationReport<M> {
    pub conservative: RegimeOutcome<M>,
    pub chaos: RegimeOutcome<M>,
}

impl<M> ValidationReport<M> {
    pub fn regime(&self, regime: Regime) -> &RegimeOutcome<M> {
        match regime {
            Regime::Conservative => &self.conservative,
            Regime::Chaos => &self.chaos,
        }
    }

    /// (conservative, chaos) model pairs; fails if either regime never trained
    pub fn into_models(self) -> Result<(ScorePair<M>, ScorePair<M>)> {
        let conservative = self.conservative.into_models()?;
        let chaos = self.chaos.into_models()?;
        Ok((conservative, chaos))
    }
}

/// Row ranges for one window, resolved before any training happens
#[derive(Debug, Clone)]
struct WindowPlan {
    index: usize,
    start: NaiveDate,
    end: NaiveDate,
    train: Range<usize>,
    test: Range<usize>,
}

struct WindowResult<M> {
    report: WindowReport,
    models: ScorePair<M>,
    metrics: ErrorMetrics,
    predictions: Vec<BacktestPrediction>,
}

/// Periodic retrain-and-score backtester over both regimes
pub struct WalkForwardValidator<T: RegressorTrainer> {
    trainer: T,
    config: ValidationConfig,
    regimes: RegimesConfig,
}

impl<T: RegressorTrainer> WalkForwardValidator<T> {
    pub fn new(trainer: T, config: &Config) -> Self {
        WalkForwardValidator {
            trainer,
            config: config.validation.clone(),
            regimes: config.regimes.clone(),
        }
    }

    pub fn validate(&self, dataset: &GameDataset) -> Result<ValidationReport<T::Model>> {
        self.validate_games(dataset.games())
    }

    /// Backtest both regimes over a date-sorted game table
    pub fn validate_games(&self, games: &[GameFeatures]) -> Result<ValidationReport<T::Model>> {
        Ok(ValidationReport {
            conservative: self.run_regime(Regime::Conservative, games)?,
            chaos: self.run_regime(Regime::Chaos, games)?,
        })
    }

    /// Lower bound on training dates for a regime
    fn train_floor(&self, regime: Regime) -> Option<NaiveDate> {
        match regime {
            Regime::Conservative => None,
            Regime::Chaos => Some(self.config.chaos_cutoff),
        }
    }

    fn plan(
        &self,
        regime: Regime,
        games: &[GameFeatures],
    ) -> (Vec<WindowPlan>, Vec<SkippedWindow>) {
        let Some(last) = games.last() else {
            return (Vec::new(), Vec::new());
        };

        let boundaries = window_boundaries(self.config.start_date, last.date(), self.config.period);
        let position = |date: NaiveDate| games.partition_point(|g| g.date() < date);
        let floor = self.train_floor(regime).map(|cutoff| position(cutoff)).unwrap_or(0);

        let mut plans = Vec::new();
        let mut skipped = Vec::new();

        for (index, pair) in boundaries.windows(2).enumerate() {
            let (start, end) = (pair[0], pair[1]);
            let test = position(start)..position(end);
            let train = floor.min(test.start)..test.start;

            let reason = if train.len() < self.config.min_train_rows {
                Some(SkipReason::InsufficientTraining {
                    rows: train.len(),
                    required: self.config.min_train_rows,
                })
            } else if test.is_empty() {
                Some(SkipReason::EmptyTest)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    log::info!(
                        "[{}] window {} [{} → {}) skipped: {:?}",
                        regime,
                        index,
                        start,
                        end,
                        reason
                    );
                    skipped.push(SkippedWindow {
                        index,
                        window_start: start,
                        window_end: end,
                        reason,
                    });
                }
                None => plans.push(WindowPlan {
                    index,
                    start,
                    end,
                    train,
                    test,
                }),
            }
        }

        (plans, skipped)
    }

    /// Backtest a single regime over a date-sorted game table
    pub fn run_regime(&self, regime: Regime, games: &[GameFeatures]) -> Result<RegimeOutcome<T::Model>> {
        if games.windows(2).any(|w| w[0].date() > w[1].date()) {
            return Err(HoopsError::InvalidInput(
                "walk-forward validation needs games in date order".to_string(),
            ));
        }

        let (plans, skipped) = self.plan(regime, games);
        log::info!(
            "[{}] {} windows to train, {} skipped",
            regime,
            plans.len(),
            skipped.len()
        );

        let vectors: Vec<FeatureVector> = games.iter().map(|g| g.feature_vector()).collect();
        let home_targets: Vec<f32> = games.iter().map(|g| g.record.home_points as f32).collect();
        let away_targets: Vec<f32> = games.iter().map(|g| g.record.away_points as f32).collect();
        let inputs = WindowInputs {
            games,
            vectors: &vectors,
            home_targets: &home_targets,
            away_targets: &away_targets,
        };

        let results: Vec<WindowResult<T::Model>> = if self.config.parallel {
            plans
                .par_iter()
                .map(|plan| self.train_window(regime, plan, &inputs))
                .collect::<Result<_>>()?
        } else {
            plans
                .iter()
                .map(|plan| self.train_window(regime, plan, &inputs))
                .collect::<Result<_>>()?
        };

        let mut outcome = RegimeOutcome {
            regime,
            models: None,
            metrics: ErrorMetrics::new(),
            windows: Vec::with_capacity(results.len()),
            skipped,
            predictions: Vec::new(),
        };

        // Results are in window order; the last one supplies the models
        for result in results {
            outcome.metrics.merge(&result.metrics);
            outcome.windows.push(result.report);
            outcome.predictions.extend(result.predictions);
            outcome.models = Some(result.models);
        }

        match outcome.rmse() {
            Some(rmse) => log::info!(
                "[{}] backtest RMSE {:.2} over {} games",
                regime,
                rmse,
                outcome.metrics.count
            ),
            None => log::warn!("[{}] no window was trained", regime),
        }

        Ok(outcome)
    }

    fn train_window(
        &self,
        regime: Regime,
        plan: &WindowPlan,
        inputs: &WindowInputs<'_>,
    ) -> Result<WindowResult<T::Model>> {
        let params = self.regimes.params(regime);
        let train_x = &inputs.vectors[plan.train.clone()];

        let models = ScorePair {
            home: self
                .trainer
                .fit(params, train_x, &inputs.home_targets[plan.train.clone()])?,
            away: self
                .trainer
                .fit(params, train_x, &inputs.away_targets[plan.train.clone()])?,
        };

        let test_games = &inputs.games[plan.test.clone()];
        let predicted = models.predict(&inputs.vectors[plan.test.clone()])?;

        let mut metrics = ErrorMetrics::new();
        let predictions: Vec<BacktestPrediction> = test_games
            .iter()
            .zip(predicted)
            .map(|(game, (home, away))| {
                let prediction = BacktestPrediction {
                    regime,
                    window: plan.index,
                    game_id: game.record.game_id,
                    date: game.date(),
                    home_team: game.record.home_team.clone(),
                    away_team: game.record.away_team.clone(),
                    actual_home: game.record.home_points as f64,
                    actual_away: game.record.away_points as f64,
                    predicted_home: home as f64,
                    predicted_away: away as f64,
                };
                metrics.update(
                    prediction.actual_home,
                    prediction.actual_away,
                    prediction.predicted_home,
                    prediction.predicted_away,
                );
                prediction
            })
            .collect();

        let train_games = &inputs.games[plan.train.clone()];
        let report = WindowReport {
            index: plan.index,
            window_start: plan.start,
            window_end: plan.end,
            train_rows: train_games.len(),
            test_rows: test_games.len(),
            train_first_date: train_games.first().map(|g| g.date()),
            train_last_date: train_games.last().map(|g| g.date()),
            test_first_date: test_games[0].date(),
            test_last_date: test_games[test_games.len() - 1].date(),
            rmse: metrics.rmse_total().unwrap_or_default(),
        };

        log::info!(
            "[{}] window {} [{} → {}): train {}, test {}, RMSE {:.2}",
            regime,
            plan.index,
            plan.start,
            plan.end,
            report.train_rows,
            report.test_rows,
            report.rmse
        );

        Ok(WindowResult {
            report,
            models,
            metrics,
            predictions,
        })
    }
}

/// Immutable per-row inputs shared by every window
struct WindowInputs<'a> {
    games: &'a [GameFeatures],
    vectors: &'a [FeatureVector],
    home_targets: &'a [f32],
    away_targets: &'a [f32],
}
