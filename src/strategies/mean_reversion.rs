use crate::config::SignalConfig;
use crate::strategies::price_tail;
use crate::strategies::types::{MarketWindow, Signal, SignalError, SignalKind, SignalOutput};

/// Bets on the last price drifting back to the window mean.
#[derive(Debug, Clone)]
pub struct MeanReversionSignal {
    window: usize,
    scale: f64,
    confidence_cap: f64,
}

impl MeanReversionSignal {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            scale: 5.0,
            confidence_cap: 0.9,
        }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self {
            window: config.mean_reversion_window,
            scale: config.mean_reversion_scale,
            confidence_cap: config.confidence_cap,
        }
    }
}

impl Default for MeanReversionSignal {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Signal for MeanReversionSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::MeanReversion
    }

    fn generate(&self, window: &MarketWindow<'_>) -> Result<SignalOutput, SignalError> {
        let prices = price_tail(self.kind(), window.prices, self.window)?;

        let mean = prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64;
        let last = prices[prices.len() - 1].price;

        // Above the mean predicts a fall, below predicts a rise
        let deviation = (last - mean) / mean;

        Ok(SignalOutput {
            direction: -deviation,
            confidence: (deviation.abs() * self.scale).min(self.confidence_cap),
        })
    }
}
