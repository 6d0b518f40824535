pub mod scheduler;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adaptation::adapter::{AdaptError, WeightAdapter, WeightSnapshot};
use crate::adaptation::feedback::{performance_score, PerformanceRecord};
use crate::adaptation::weights::WeightVector;
use crate::config::Config;
use crate::data::types::{PricePoint, SentimentPoint};
use crate::strategies::aggregator::{AggregationError, Aggregator, Contribution};
use crate::strategies::mean_reversion::MeanReversionSignal;
use crate::strategies::momentum::MomentumSignal;
use crate::strategies::sentiment_momentum::SentimentMomentumSignal;
use crate::strategies::types::{Decision, MarketWindow, Signal, SignalError, SignalSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Adapt(#[from] AdaptError),
}

/// Everything the presentation layer needs about one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub signals: SignalSet,
    pub weights: WeightVector,
    /// `None` when every signal had zero confidence.
    pub normalized_prediction: Option<f64>,
    pub contributions: Vec<Contribution>,
}

impl Evaluation {
    /// Score this decision once the price has moved from `before` to `after`
    pub fn score_against(&self, before: f64, after: f64) -> f64 {
        performance_score(self.decision.action, before, after)
    }
}

/// Facade wiring the three signals, the aggregator and the weight adapter.
///
/// Shared across tasks behind an `Arc`; `evaluate` and `adapt` may run
/// concurrently.
pub struct SignalEngine {
    mean_reversion: MeanReversionSignal,
    momentum: MomentumSignal,
    sentiment_momentum: SentimentMomentumSignal,
    aggregator: Aggregator,
    adapter: WeightAdapter,
    stance_threshold: f64,
}

impl SignalEngine {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let initial = config.initial_weight_vector()?;

        let engine = Self {
            mean_reversion: MeanReversionSignal::from_config(&config.signals),
            momentum: MomentumSignal::from_config(&config.signals),
            sentiment_momentum: SentimentMomentumSignal::from_config(&config.signals),
            aggregator: Aggregator::new(config.aggregator.clone()),
            adapter: WeightAdapter::new(config.adaptation.clone(), initial, config.engine.seed),
            stance_threshold: config.signals.stance_threshold,
        };

        info!(
            "Signal engine ready (buy > {}, sell < {}, seed: {:?})",
            config.aggregator.buy_threshold, config.aggregator.sell_threshold, config.engine.seed
        );
        Ok(engine)
    }

    /// Run the three generators over the window.
    pub fn signals(
        &self,
        prices: &[PricePoint],
        sentiment: &[SentimentPoint],
    ) -> Result<SignalSet, SignalError> {
        let window = MarketWindow::new(prices, sentiment);
        Ok(SignalSet {
            mean_reversion: self.mean_reversion.generate(&window)?,
            momentum: self.momentum.generate(&window)?,
            sentiment_momentum: self.sentiment_momentum.generate(&window)?,
        })
    }

    /// Evaluate against the currently published weights.
    pub fn evaluate(
        &self,
        prices: &[PricePoint],
        sentiment: &[SentimentPoint],
    ) -> Result<Evaluation, EngineError> {
        self.evaluate_with(prices, sentiment, self.adapter.weights())
    }

    /// Evaluate against explicit weights. Pure: identical inputs give an
    /// identical evaluation.
    pub fn evaluate_with(
        &self,
        prices: &[PricePoint],
        sentiment: &[SentimentPoint],
        weights: WeightVector,
    ) -> Result<Evaluation, EngineError> {
        let signals = self.signals(prices, sentiment)?;

        for (kind, output) in signals.iter() {
            debug!(
                signal = %kind,
                direction = output.direction,
                confidence = output.confidence,
                stance = ?output.stance(self.stance_threshold),
                "signal output"
            );
        }

        match self.aggregator.aggregate(&signals, &weights) {
            Ok(aggregation) => Ok(Evaluation {
                decision: aggregation.decision,
                signals,
                weights,
                normalized_prediction: Some(aggregation.normalized_prediction),
                contributions: aggregation.contributions,
            }),
            Err(AggregationError::Degenerate(mass)) => {
                warn!("All signals silent (confidence mass {}), holding", mass);
                Ok(Evaluation {
                    decision: Decision::hold(),
                    signals,
                    weights,
                    normalized_prediction: None,
                    contributions: Vec::new(),
                })
            }
        }
    }

    /// Run one adaptation tick; see [`WeightAdapter::adapt`].
    pub fn adapt(&self, feedback: Option<&PerformanceRecord>) -> Result<WeightVector, EngineError> {
        Ok(self.adapter.adapt(feedback)?)
    }

    pub fn weights(&self) -> WeightVector {
        self.adapter.weights()
    }

    pub fn weight_history(&self) -> Vec<WeightSnapshot> {
        self.adapter.history()
    }

    pub fn ticks(&self) -> u64 {
        self.adapter.ticks()
    }

    pub fn stance_threshold(&self) -> f64 {
        self.stance_threshold
    }
}
