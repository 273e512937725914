//! Match feature vector
//!
//! The fixed 14-value model input. Training rows and live queries are both
//! assembled through [`SideFeatures::from_state`] and [`FeatureVector::to_array`],
//! so there is exactly one definition of the column order.

use serde::{Deserialize, Serialize};

use crate::features::elo::TeamRatings;
use crate::features::team_stats::RollingForm;

/// Features describing one side of a matchup
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideFeatures {
    pub off_rating: f32,
    pub def_rating: f32,
    pub pace_rating: f32,
    pub rest_days: f32,
    pub roll_points: f32,
    pub roll_pace: f32,
    pub roll_win: f32,
}

impl SideFeatures {
    pub fn from_state(ratings: &TeamRatings, rest_days: u32, form: &RollingForm) -> Self {
        SideFeatures {
            off_rating: ratings.offense as f32,
            def_rating: ratings.defense as f32,
            pace_rating: ratings.pace as f32,
            rest_days: rest_days as f32,
            roll_points: form.points as f32,
            roll_pace: form.pace as f32,
            roll_win: form.win_rate as f32,
        }
    }
}

/// Model input for a single game
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub home: SideFeatures,
    pub away: SideFeatures,
}

impl FeatureVector {
    /// Number of features
    pub const DIM: usize = 14;

    /// Column names in model order
    pub const NAMES: [&'static str; Self::DIM] = [
        "home_off_rating_pre",
        "home_def_rating_pre",
        "home_pace_rating_pre",
        "home_rest_days",
        "away_off_rating_pre",
        "away_def_rating_pre",
        "away_pace_rating_pre",
        "away_rest_days",
        "home_roll_pts",
        "home_roll_pace",
        "home_roll_win",
        "away_roll_pts",
        "away_roll_pace",
        "away_roll_win",
    ];

    pub fn new(home: SideFeatures, away: SideFeatures) -> Self {
        FeatureVector { home, away }
    }

    /// Flatten in model order
    pub fn to_array(&self) -> [f32; Self::DIM] {
        let (h, a) = (&self.home, &self.away);
        [
            h.off_rating,
            h.def_rating,
            h.pace_rating,
            h.rest_days,
            a.off_rating,
            a.def_rating,
            a.pace_rating,
            a.rest_days,
            h.roll_points,
            h.roll_pace,
            h.roll_win,
            a.roll_points,
            a.roll_pace,
            a.roll_win,
        ]
    }

    /// Rebuild from a flat slice in model order
    pub fn from_slice(v: &[f32]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(FeatureVector {
            home: SideFeatures {
                off_rating: v[0],
                def_rating: v[1],
                pace_rating: v[2],
                rest_days: v[3],
                roll_points: v[8],
                roll_pace: v[9],
                roll_win: v[10],
            },
            away: SideFeatures {
                off_rating: v[4],
                def_rating: v[5],
                pace_rating: v[6],
                rest_days: v[7],
                roll_points: v[11],
                roll_pace: v[12],
                roll_win: v[13],
            },
        })
    }

    /// (name, value) pairs in model order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> {
        Self::NAMES.into_iter().zip(self.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector::new(
            SideFeatures {
                off_rating: 1.0,
                def_rating: 2.0,
                pace_rating: 3.0,
                rest_days: 4.0,
                roll_points: 9.0,
                roll_pace: 10.0,
                roll_win: 11.0,
            },
            SideFeatures {
                off_rating: 5.0,
                def_rating: 6.0,
                pace_rating: 7.0,
                rest_days: 8.0,
                roll_points: 12.0,
                roll_pace: 13.0,
                roll_win: 14.0,
            },
        )
    }

    #[test]
    fn test_model_order() {
        let values = sample().to_array();
        let expected: Vec<f32> = (1..=14).map(|v| v as f32).collect();
        assert_eq!(values.to_vec(), expected);
    }

    #[test]
    fn test_named_columns() {
        let named: Vec<_> = sample().named().collect();
        assert_eq!(named[3], ("home_rest_days", 4.0));
        assert_eq!(named[8], ("home_roll_pts", 9.0));
        assert_eq!(named[13], ("away_roll_win", 14.0));
    }

    #[test]
    fn test_from_slice_inverts_to_array() {
        let v = sample();
        assert_eq!(FeatureVector::from_slice(&v.to_array()), Some(v));
        assert_eq!(FeatureVector::from_slice(&[0.0; 3]), None);
    }

    #[test]
    fn test_from_state() {
        let side = SideFeatures::from_state(
            &TeamRatings {
                offense: 1010.0,
                defense: 990.0,
                pace: 1000.5,
            },
            2,
            &RollingForm {
                points: 112.0,
                pace: 98.0,
                win_rate: 0.5,
            },
        );
        assert_eq!(side.off_rating, 1010.0);
        assert_eq!(side.rest_days, 2.0);
        assert_eq!(side.roll_win, 0.5);
    }
}
