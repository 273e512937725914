//! Totals-line edge calculator
//!
//! Treats the backtest RMSE as the spread of a normal distribution around the
//! predicted total and prices over/under lines against decimal odds.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

use crate::{HoopsError, Result};

/// Which side of a totals line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Over,
    Under,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => write!(f, "O"),
            Side::Under => write!(f, "U"),
        }
    }
}

/// A priced line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineEdge {
    pub side: Side,
    pub line: f64,
    pub odds: f64,
    /// Model probability that this side wins
    pub probability: f64,
    /// Expected profit per unit staked
    pub expected_value: f64,
}

impl LineEdge {
    /// Decimal odds at which the bet would break even
    pub fn fair_odds(&self) -> f64 {
        1.0 / self.probability
    }

    pub fn is_positive(&self) -> bool {
        self.expected_value > 0.0
    }
}

impl fmt::Display for LineEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} @ {:.2}: {:.1}% prob, EV = {:+.2} ({:+.1}%)",
            self.side,
            self.line,
            self.odds,
            self.probability * 100.0,
            self.expected_value,
            self.expected_value * 100.0
        )
    }
}

/// Price one line
pub fn line_edge(prediction: f64, rmse: f64, line: f64, odds: f64, side: Side) -> Result<LineEdge> {
    if !rmse.is_finite() || rmse <= 0.0 {
        return Err(HoopsError::InvalidInput(format!(
            "RMSE must be positive, got {}",
            rmse
        )));
    }
    if odds.is_nan() || odds <= 1.0 {
        return Err(HoopsError::InvalidInput(format!(
            "decimal odds must exceed 1.0, got {}",
            odds
        )));
    }

    let normal = Normal::new(0.0, 1.0).map_err(|e| HoopsError::InvalidInput(e.to_string()))?;
    let under = normal.cdf((line - prediction) / rmse);
    let probability = match side {
        Side::Under => under,
        Side::Over => 1.0 - under,
    };

    Ok(LineEdge {
        side,
        line,
        odds,
        probability,
        expected_value: probability * (odds - 1.0) - (1.0 - probability),
    })
}

/// Price a ladder of (line, odds) pairs on one side
pub fn evaluate_lines(
    prediction: f64,
    rmse: f64,
    lines: &[(f64, f64)],
    side: Side,
) -> Result<Vec<LineEdge>> {
    lines
        .iter()
        .map(|&(line, odds)| line_edge(prediction, rmse, line, odds, side))
        .collect()
}

/// Highest expected value among priced lines
pub fn best_edge(edges: &[LineEdge]) -> Option<&LineEdge> {
    edges
        .iter()
        .max_by(|a, b| a.expected_value.total_cmp(&b.expected_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_at_prediction_is_coin_flip() {
        let edge = line_edge(230.0, 18.0, 230.0, 2.0, Side::Under).unwrap();
        assert!((edge.probability - 0.5).abs() < 1e-9);
        assert!(edge.expected_value.abs() < 1e-9);
        assert!((edge.fair_odds() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_over_and_under_complement() {
        let under = line_edge(235.0, 18.93, 240.0, 1.93, Side::Under).unwrap();
        let over = line_edge(235.0, 18.93, 240.0, 1.93, Side::Over).unwrap();
        assert!((under.probability + over.probability - 1.0).abs() < 1e-12);
        assert!(under.probability > 0.5);
        // (240 - 235) / 18.93 ≈ 0.264 standard deviations
        assert!((under.probability - 0.6041).abs() < 1e-3);
    }

    #[test]
    fn test_ladder_and_best_edge() {
        let lines = [(237.0, 2.23), (240.0, 1.93), (244.0, 1.64)];
        let edges = evaluate_lines(235.0, 18.93, &lines, Side::Under).unwrap();
        assert_eq!(edges.len(), 3);
        assert!(edges.windows(2).all(|w| w[0].probability < w[1].probability));

        let best = best_edge(&edges).unwrap();
        assert!(edges.iter().all(|e| e.expected_value <= best.expected_value));
        assert!(best.is_positive());
        assert!(best_edge(&[]).is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(line_edge(230.0, 0.0, 230.0, 2.0, Side::Over).is_err());
        assert!(line_edge(230.0, -1.0, 230.0, 2.0, Side::Over).is_err());
        assert!(line_edge(230.0, 10.0, 230.0, 1.0, Side::Over).is_err());
        assert!(line_edge(230.0, f64::NAN, 230.0, 2.0, Side::Over).is_err());
    }

    #[test]
    fn test_display() {
        let edge = line_edge(230.0, 18.0, 230.0, 2.0, Side::Under).unwrap();
        assert_eq!(edge.to_string(), "U230 @ 2.00: 50.0% prob, EV = +0.00 (+0.0%)");
    }
}
