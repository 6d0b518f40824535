use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::adaptation::adapter::AdaptError;
use crate::config::FeedbackConfig;
use crate::strategies::types::{Action, SignalKind, SignalSet, Stance};

/// Recent directional accuracy per signal, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub mean_reversion: f64,
    pub momentum: f64,
    pub sentiment_momentum: f64,
}

impl PerformanceRecord {
    pub fn new(mean_reversion: f64, momentum: f64, sentiment_momentum: f64) -> Result<Self, AdaptError> {
        let record = Self {
            mean_reversion,
            momentum,
            sentiment_momentum,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), AdaptError> {
        for kind in SignalKind::ALL {
            let accuracy = self.get(kind);
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(AdaptError::InvalidFeedback(format!(
                    "{} accuracy {} outside [0, 1]",
                    kind, accuracy
                )));
            }
        }
        Ok(())
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

    pub fn mean(&self) -> f64 {
        self.as_array().iter().sum::<f64>() / 3.0
    }
}

/// Score a decision against the realized move.
///
/// Buy scores the return, sell its negation, hold scores how close to flat
/// the price stayed.
pub fn performance_score(action: Action, before_price: f64, after_price: f64) -> f64 {
    let change = if before_price > 0.0 {
        (after_price - before_price) / before_price
    } else {
        0.0
    };

    match action {
        Action::Buy => change,
        Action::Sell => -change,
        Action::Hold => 1.0 - change.abs(),
    }
}

/// Judges each signal's stance against the next observed price and keeps a
/// trailing hit rate per signal.
pub struct AccuracyTracker {
    config: FeedbackConfig,
    stance_threshold: f64,
    pending: HashMap<String, PendingCall>,
    outcomes: [VecDeque<bool>; 3],
}

struct PendingCall {
    price: f64,
    stances: [Stance; 3],
}

impl AccuracyTracker {
    pub fn new(config: FeedbackConfig, stance_threshold: f64) -> Self {
        Self {
            config,
            stance_threshold,
            pending: HashMap::new(),
            outcomes: Default::default(),
        }
    }

    /// Remember the calls made for `symbol` at `price`, replacing any
    /// unresolved ones.
    pub fn record(&mut self, symbol: &str, price: f64, signals: &SignalSet) {
        let stances = SignalKind::ALL.map(|kind| signals.get(kind).stance(self.stance_threshold));
        self.pending.insert(symbol.to_string(), PendingCall { price, stances });
    }

    /// Resolve the pending calls for `symbol` against a newer price.
    ///
    /// Returns whether each signal was right, or `None` if nothing was pending.
    pub fn resolve(&mut self, symbol: &str, price: f64) -> Option<[bool; 3]> {
        let call = self.pending.remove(symbol)?;
        if call.price <= 0.0 {
            return None;
        }

        let change = (price - call.price) / call.price;
        let band = self.config.neutral_band;
        let hits = call.stances.map(|stance| match stance {
            Stance::Bullish => change > band,
            Stance::Bearish => change < -band,
            Stance::Neutral => change.abs() <= band,
        });

        for (history, hit) in self.outcomes.iter_mut().zip(hits) {
            history.push_back(hit);
            while history.len() > self.config.accuracy_window {
                history.pop_front();
            }
        }

        debug!(symbol, change, ?hits, "resolved signal calls");
        Some(hits)
    }

    pub fn samples(&self, kind: SignalKind) -> usize {
        self.outcomes[kind.index()].len()
    }

    pub fn accuracy(&self, kind: SignalKind) -> Option<f64> {
        let history = &self.outcomes[kind.index()];
        if history.is_empty() {
            return None;
        }
        let hits = history.iter().filter(|hit| **hit).count();
        Some(hits as f64 / history.len() as f64)
    }

    /// Accuracy for every signal, once each has `min_samples` outcomes.
    pub fn performance(&self) -> Option<PerformanceRecord> {
        if SignalKind::ALL
            .iter()
            .any(|kind| self.samples(*kind) < self.config.min_samples.max(1))
        {
            return None;
        }
        Some(PerformanceRecord {
            mean_reversion: self.accuracy(SignalKind::MeanReversion)?,
            momentum: self.accuracy(SignalKind::Momentum)?,
            sentiment_momentum: self.accuracy(SignalKind::SentimentMomentum)?,
        })
    }
}
