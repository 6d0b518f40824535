use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adaptation::adapter::AdaptError;
use crate::strategies::types::SignalKind;

/// Tolerance on the sum-to-one invariant.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Trust coefficients for the three signals.
///
/// Always sums to 1 within [`SUM_TOLERANCE`]. Copied by value; the adapter
/// replaces it wholesale and never mutates a published vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub mean_reversion: f64,
    pub momentum: f64,
    pub sentiment_momentum: f64,
}

impl WeightVector {
    pub fn new(mean_reversion: f64, momentum: f64, sentiment_momentum: f64) -> Result<Self, AdaptError> {
        let weights = Self {
            mean_reversion,
            momentum,
            sentiment_momentum,
        };
        if weights.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AdaptError::InvalidWeights(format!(
                "weights must be finite and non-negative: {}",
                weights
            )));
        }
        if (weights.sum() - 1.0).abs() > SUM_TOLERANCE {
            return Err(AdaptError::InvalidWeights(format!(
                "weights sum to {}, expected 1",
                weights.sum()
            )));
        }
        Ok(weights)
    }

    pub fn equal() -> Self {
        Self::from_array([1.0 / 3.0; 3])
    }

    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::MeanReversion => self.mean_reversion,
            SignalKind::Momentum => self.momentum,
            SignalKind::SentimentMomentum => self.sentiment_momentum,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.mean_reversion, self.momentum, self.sentiment_momentum]
    }

    /// Unchecked; callers must already hold the invariant.
    pub(crate) fn from_array(values: [f64; 3]) -> Self {
        Self {
            mean_reversion: values[0],
            momentum: values[1],
            sentiment_momentum: values[2],
        }
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    pub fn within(&self, min: f64, max: f64) -> bool {
        self.as_array()
            .iter()
            .all(|w| *w >= min - SUM_TOLERANCE && *w <= max + SUM_TOLERANCE)
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::from_array([0.33, 0.33, 0.34])
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean_reversion={:.4} momentum={:.4} sentiment_momentum={:.4}",
            self.mean_reversion, self.momentum, self.sentiment_momentum
        )
    }
}

/// Clamp to `[min, max]` and renormalize to sum 1.
///
/// Plain renormalization after a clamp can push a weight back out of bounds
/// (a clamped 0.6 grows when its siblings shrink), so clamped weights are
/// pinned and the remaining mass is spread over the free ones until nothing
/// moves. With three weights this settles in at most three passes.
pub fn project_onto_bounds(raw: [f64; 3], min: f64, max: f64) -> Result<WeightVector, AdaptError> {
    let clamped = raw.map(|w| w.clamp(min, max));
    let total: f64 = clamped.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(AdaptError::WeightCollapse { sum: total });
    }

    let mut weights = clamped.map(|w| w / total);
    let mut pinned = [false; 3];

    for _ in 0..weights.len() {
        let mut moved = false;
        for i in 0..weights.len() {
            if pinned[i] {
                continue;
            }
            if weights[i] < min {
                weights[i] = min;
                pinned[i] = true;
                moved = true;
            } else if weights[i] > max {
                weights[i] = max;
                pinned[i] = true;
                moved = true;
            }
        }
        if !moved {
            break;
        }

        let pinned_mass: f64 = (0..3).filter(|&i| pinned[i]).map(|i| weights[i]).sum();
        let free_mass: f64 = (0..3).filter(|&i| !pinned[i]).map(|i| weights[i]).sum();
        if free_mass <= 0.0 {
            break;
        }
        let scale = (1.0 - pinned_mass) / free_mass;
        for i in 0..weights.len() {
            if !pinned[i] {
                weights[i] *= scale;
            }
        }
    }

    let projected = WeightVector::from_array(weights);
    let sum = projected.sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE || !projected.within(min, max) {
        return Err(AdaptError::WeightCollapse { sum });
    }
    Ok(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_validates_sum() {
        assert!(WeightVector::new(0.33, 0.33, 0.34).is_ok());
        assert!(WeightVector::new(0.5, 0.5, 0.5).is_err());
        assert!(WeightVector::new(f64::NAN, 0.5, 0.5).is_err());
        assert!(WeightVector::new(-0.1, 0.6, 0.5).is_err());
    }

    #[test]
    fn test_default_and_equal() {
        assert!((WeightVector::default().sum() - 1.0).abs() < SUM_TOLERANCE);
        assert!((WeightVector::equal().sum() - 1.0).abs() < SUM_TOLERANCE);
        assert_eq!(WeightVector::default().get(SignalKind::SentimentMomentum), 0.34);
    }

    #[test]
    fn test_projection_plain_renormalize() {
        let w = project_onto_bounds([0.2, 0.2, 0.2], 0.1, 0.6).unwrap();
        for value in w.as_array() {
            assert!((value - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_projection_keeps_upper_bound_after_renormalize() {
        // Clamp gives [0.6, 0.19, 0.19]; naive renormalization would give 0.612
        let w = project_onto_bounds([0.7, 0.19, 0.19], 0.1, 0.6).unwrap();
        assert!((w.mean_reversion - 0.6).abs() < 1e-12);
        assert!((w.momentum - 0.2).abs() < 1e-12);
        assert!((w.sentiment_momentum - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_projection_keeps_lower_bound_after_renormalize() {
        let w = project_onto_bounds([0.05, 0.6, 0.6], 0.1, 0.6).unwrap();
        assert!((w.mean_reversion - 0.1).abs() < 1e-12);
        assert!((w.momentum - 0.45).abs() < 1e-12);
        assert!((w.sentiment_momentum - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_projection_collapse_on_non_finite() {
        let err = project_onto_bounds([f64::NAN, 0.3, 0.3], 0.1, 0.6).unwrap_err();
        assert!(matches!(err, AdaptError::WeightCollapse { .. }));
    }

    proptest! {
        #[test]
        fn projection_holds_invariant(
            a in -1.0..2.0_f64,
            b in -1.0..2.0_f64,
            c in -1.0..2.0_f64,
        ) {
            let w = project_onto_bounds([a, b, c], 0.1, 0.6).unwrap();
            prop_assert!((w.sum() - 1.0).abs() <= SUM_TOLERANCE);
            prop_assert!(w.within(0.1, 0.6));
        }
    }
}
