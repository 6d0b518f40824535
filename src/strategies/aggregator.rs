use serde::Serialize;
use tracing::debug;

use crate::adaptation::weights::WeightVector;
use crate::config::AggregatorConfig;
use crate::strategies::types::{Action, Decision, SignalKind, SignalSet};

/// The contribution of a single signal to the fused prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub signal: SignalKind,
    pub weight: f64,
    pub confidence: f64,
    pub direction: f64,
    pub contribution: f64,
}

/// Result of fusing one signal set under one weight vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub weighted_sum: f64,
    pub confidence_mass: f64,
    pub normalized_prediction: f64,
    pub decision: Decision,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("degenerate aggregation: confidence mass is {0}")]
    Degenerate(f64),
}

/// Confidence-weighted fusion of signal directions into a buy/hold/sell call.
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fuse signals with weights.
    ///
    /// Each signal contributes `direction * weight * confidence`; the sum is
    /// normalized by the total `weight * confidence` mass. Fails with
    /// [`AggregationError::Degenerate`] when that mass is zero, i.e. every
    /// signal reported zero confidence.
    pub fn aggregate(
        &self,
        signals: &SignalSet,
        weights: &WeightVector,
    ) -> Result<Aggregation, AggregationError> {
        let contributions: Vec<Contribution> = signals
            .iter()
            .map(|(kind, output)| {
                let weight = weights.get(kind);
                Contribution {
                    signal: kind,
                    weight,
                    confidence: output.confidence,
                    direction: output.direction,
                    contribution: output.direction * weight * output.confidence,
                }
            })
            .collect();

        let weighted_sum: f64 = contributions.iter().map(|c| c.contribution).sum();
        let confidence_mass: f64 = contributions.iter().map(|c| c.weight * c.confidence).sum();

        if !(confidence_mass > 0.0 && confidence_mass.is_finite()) {
            return Err(AggregationError::Degenerate(confidence_mass));
        }

        let normalized_prediction = weighted_sum / confidence_mass;
        let decision = Decision {
            action: self.classify(normalized_prediction),
            confidence: self.decision_confidence(normalized_prediction),
        };

        debug!(
            weighted_sum,
            confidence_mass,
            normalized_prediction,
            action = %decision.action,
            "aggregated signals"
        );

        Ok(Aggregation {
            weighted_sum,
            confidence_mass,
            normalized_prediction,
            decision,
            contributions,
        })
    }

    /// Like [`aggregate`](Self::aggregate) but falls back to `hold` at zero
    /// confidence when the aggregation is degenerate.
    pub fn decide(&self, signals: &SignalSet, weights: &WeightVector) -> Decision {
        match self.aggregate(signals, weights) {
            Ok(aggregation) => aggregation.decision,
            Err(AggregationError::Degenerate(_)) => Decision::hold(),
        }
    }

    /// Both thresholds are exclusive: a prediction exactly on one holds.
    pub fn classify(&self, normalized_prediction: f64) -> Action {
        if normalized_prediction > self.config.buy_threshold {
            Action::Buy
        } else if normalized_prediction < self.config.sell_threshold {
            Action::Sell
        } else {
            Action::Hold
        }
    }

    fn decision_confidence(&self, normalized_prediction: f64) -> f64 {
        let raw = normalized_prediction.abs() * self.config.confidence_scale;
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, self.config.confidence_cap)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}
