//! Regressor capability traits
//!
//! Score models are opaque: anything that can be fit on feature vectors and
//! then predict from them can back a regime.

use crate::features::FeatureVector;
use crate::{RegimeParams, Result};

/// A trained single-target regressor
pub trait Regressor: Send {
    /// One prediction per input row, in input order
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<f32>>;

    /// Convenience for a single row
    fn predict_one(&self, features: &FeatureVector) -> Result<f32> {
        self.predict(std::slice::from_ref(features))?
            .into_iter()
            .next()
            .ok_or_else(|| crate::HoopsError::Model("regressor returned no prediction".to_string()))
    }
}

/// Fits a fresh regressor from scratch. Implementations must not carry state
/// from one fit to the next.
pub trait RegressorTrainer: Sync {
    type Model: Regressor;

    fn fit(
        &self,
        params: &RegimeParams,
        features: &[FeatureVector],
        targets: &[f32],
    ) -> Result<Self::Model>;
}

/// Home-points and away-points regressors trained together
#[derive(Debug, Clone)]
pub struct ScorePair<M> {
    pub home: M,
    pub away: M,
}

impl<M: Regressor> ScorePair<M> {
    /// Predicted (home, away) points per row
    pub fn predict(&self, features: &[FeatureVector]) -> Result<Vec<(f32, f32)>> {
        let home = self.home.predict(features)?;
        let away = self.away.predict(features)?;
        if home.len() != features.len() || away.len() != features.len() {
            return Err(crate::HoopsError::Model(format!(
                "expected {} predictions, got {} home and {} away",
                features.len(),
                home.len(),
                away.len()
            )));
        }
        Ok(home.into_iter().zip(away).collect())
    }
}
