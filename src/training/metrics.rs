//! Out-of-sample error metrics

use std::fmt;

/// Squared and absolute score errors accumulated over backtest predictions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorMetrics {
    /// Number of predictions
    pub count: usize,
    /// Sum of squared errors on the game total (home + away)
    pub total_sq_sum: f64,
    /// Sum of absolute errors on the game total
    pub total_abs_sum: f64,
    pub home_sq_sum: f64,
    pub away_sq_sum: f64,
    /// Predictions whose margin sign matched the actual winner
    pub correct_winners: usize,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one prediction
    pub fn update(
        &mut self,
        actual_home: f64,
        actual_away: f64,
        predicted_home: f64,
        predicted_away: f64,
    ) {
        let total_err = (predicted_home + predicted_away) - (actual_home + actual_away);
        self.count += 1;
        self.total_sq_sum += total_err * total_err;
        self.total_abs_sum += total_err.abs();
        self.home_sq_sum += (predicted_home - actual_home).powi(2);
        self.away_sq_sum += (predicted_away - actual_away).powi(2);
        if (predicted_home > predicted_away) == (actual_home > actual_away) {
            self.correct_winners += 1;
        }
    }

    fn mean_root(&self, sum: f64) -> Option<f64> {
        (self.count > 0).then(|| (sum / self.count as f64).sqrt())
    }

    /// RMSE of predicted vs actual summed points; `None` with no predictions
    pub fn rmse_total(&self) -> Option<f64> {
        self.mean_root(self.total_sq_sum)
    }

    pub fn rmse_home(&self) -> Option<f64> {
        self.mean_root(self.home_sq_sum)
    }

    pub fn rmse_away(&self) -> Option<f64> {
        self.mean_root(self.away_sq_sum)
    }

    pub fn mae_total(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_abs_sum / self.count as f64)
    }

    /// Share of games where the predicted winner was right
    pub fn winner_accuracy(&self) -> Option<f64> {
        (self.count > 0).then(|| self.correct_winners as f64 / self.count as f64)
    }

    /// Merge another metrics instance
    pub fn merge(&mut self, other: &ErrorMetrics) {
        self.count += other.count;
        self.total_sq_sum += other.total_sq_sum;
        self.total_abs_sum += other.total_abs_sum;
        self.home_sq_sum += other.home_sq_sum;
        self.away_sq_sum += other.away_sq_sum;
        self.correct_winners += other.correct_winners;
    }
}

impl fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.rmse_total(), self.mae_total(), self.winner_accuracy()) {
            (Some(rmse), Some(mae), Some(acc)) => write!(
                f,
                "Total RMSE: {:.2} | Total MAE: {:.2} | Home RMSE: {:.2} | Away RMSE: {:.2} | Winner: {:.1}% ({} games)",
                rmse,
                mae,
                self.rmse_home().unwrap_or_default(),
                self.rmse_away().unwrap_or_default(),
                acc * 100.0,
                self.count
            ),
            _ => write!(f, "no predictions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let metrics = ErrorMetrics::new();
        assert_eq!(metrics.rmse_total(), None);
        assert_eq!(metrics.mae_total(), None);
        assert_eq!(metrics.to_string(), "no predictions");
    }

    #[test]
    fn test_rmse_on_total() {
        let mut metrics = ErrorMetrics::new();
        // Home over by 3, away under by 3: total error is zero
        metrics.update(100.0, 100.0, 103.0, 97.0);
        // Total off by 4
        metrics.update(110.0, 100.0, 112.0, 102.0);

        assert_eq!(metrics.count, 2);
        assert!((metrics.rmse_total().unwrap() - (16.0f64 / 2.0).sqrt()).abs() < 1e-12);
        assert!((metrics.mae_total().unwrap() - 2.0).abs() < 1e-12);
        assert!((metrics.rmse_home().unwrap() - (13.0f64 / 2.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_winner_accuracy() {
        let mut metrics = ErrorMetrics::new();
        metrics.update(110.0, 100.0, 105.0, 101.0);
        metrics.update(95.0, 100.0, 105.0, 101.0);
        assert_eq!(metrics.winner_accuracy(), Some(0.5));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let games = [
            (101.0, 99.0, 104.0, 96.0),
            (120.0, 111.0, 110.0, 108.0),
            (95.0, 102.0, 99.0, 100.0),
        ];

        let mut single = ErrorMetrics::new();
        for (ah, aa, ph, pa) in games {
            single.update(ah, aa, ph, pa);
        }

        let mut first = ErrorMetrics::new();
        first.update(games[0].0, games[0].1, games[0].2, games[0].3);
        let mut rest = ErrorMetrics::new();
        for (ah, aa, ph, pa) in &games[1..] {
            rest.update(*ah, *aa, *ph, *pa);
        }
        first.merge(&rest);

        assert_eq!(first.count, single.count);
        assert!((first.rmse_total().unwrap() - single.rmse_total().unwrap()).abs() < 1e-12);
    }
}
