use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::types::{PricePoint, SentimentPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MeanReversion,
    Momentum,
    SentimentMomentum,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [
        SignalKind::MeanReversion,
        SignalKind::Momentum,
        SignalKind::SentimentMomentum,
    ];

    pub fn index(self) -> usize {
        match self {
            SignalKind::MeanReversion => 0,
            SignalKind::Momentum => 1,
            SignalKind::SentimentMomentum => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::MeanReversion => "mean_reversion",
            SignalKind::Momentum => "momentum",
            SignalKind::SentimentMomentum => "sentiment_momentum",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Hold => "hold",
            Action::Sell => "sell",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    /// Signed expected move, e.g. a fractional return.
    pub direction: f64,
    /// In [0, 1].
    pub confidence: f64,
}

impl SignalOutput {
    pub fn new(direction: f64, confidence: f64) -> Self {
        Self { direction, confidence }
    }

    pub fn stance(&self, threshold: f64) -> Stance {
        if self.direction > threshold {
            Stance::Bullish
        } else if self.direction < -threshold {
            Stance::Bearish
        } else {
            Stance::Neutral
        }
    }
}

/// One output per signal, produced fresh for every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub mean_reversion: SignalOutput,
    pub momentum: SignalOutput,
    pub sentiment_momentum: SignalOutput,
}

impl SignalSet {
    pub fn get(&self, kind: SignalKind) -> SignalOutput {
        match kind {
            SignalKind::MeanReversion => self.mean_reversion,
            SignalKind::Momentum => self.momentum,
            SignalKind::SentimentMomentum => self.sentiment_momentum,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, SignalOutput)> + '_ {
        SignalKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// In [0, 0.95] with default config.
    pub confidence: f64,
}

impl Decision {
    pub fn hold() -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
        }
    }
}

/// Borrowed view of the observations a signal reads from.
#[derive(Debug, Clone, Copy)]
pub struct MarketWindow<'a> {
    pub prices: &'a [PricePoint],
    pub sentiment: &'a [SentimentPoint],
}

impl<'a> MarketWindow<'a> {
    pub fn new(prices: &'a [PricePoint], sentiment: &'a [SentimentPoint]) -> Self {
        Self { prices, sentiment }
    }
}

/// A predictive heuristic producing a (direction, confidence) pair.
pub trait Signal: Send + Sync {
    fn kind(&self) -> SignalKind;

    fn generate(&self, window: &MarketWindow<'_>) -> Result<SignalOutput, SignalError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("{signal}: insufficient data, need {required} points, have {actual}")]
    InsufficientData {
        signal: SignalKind,
        required: usize,
        actual: usize,
    },

    #[error("{signal}: invalid input: {reason}")]
    InvalidInput {
        signal: SignalKind,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_thresholds() {
        assert_eq!(SignalOutput::new(0.02, 0.5).stance(0.01), Stance::Bullish);
        assert_eq!(SignalOutput::new(-0.02, 0.5).stance(0.01), Stance::Bearish);
        assert_eq!(SignalOutput::new(0.01, 0.5).stance(0.01), Stance::Neutral);
        assert_eq!(SignalOutput::new(0.0, 0.0).stance(0.01), Stance::Neutral);
    }

    #[test]
    fn test_signal_set_lookup_order() {
        let set = SignalSet {
            mean_reversion: SignalOutput::new(1.0, 0.1),
            momentum: SignalOutput::new(2.0, 0.2),
            sentiment_momentum: SignalOutput::new(3.0, 0.3),
        };
        let kinds: Vec<_> = set.iter().map(|(k, s)| (k.index(), s.direction)).collect();
        assert_eq!(kinds, vec![(0, 1.0), (1, 2.0), (2, 3.0)]);
    }

    #[test]
    fn test_action_serializes_lowercase() {
        let json = serde_json::to_string(&Decision { action: Action::Sell, confidence: 0.4 }).unwrap();
        assert_eq!(json, r#"{"action":"sell","confidence":0.4}"#);
    }
}
