use crate::config::SignalConfig;
use crate::strategies::price_tail;
use crate::strategies::types::{MarketWindow, Signal, SignalError, SignalKind, SignalOutput};

/// Extrapolates the window's first-to-last return.
#[derive(Debug, Clone)]
pub struct MomentumSignal {
    window: usize,
    scale: f64,
    confidence_cap: f64,
}

impl MomentumSignal {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            scale: 3.0,
            confidence_cap: 0.9,
        }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self {
            window: config.momentum_window,
            scale: config.momentum_scale,
            confidence_cap: config.confidence_cap,
        }
    }
}

impl Default for MomentumSignal {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Signal for MomentumSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Momentum
    }

    fn generate(&self, window: &MarketWindow<'_>) -> Result<SignalOutput, SignalError> {
        let prices = price_tail(self.kind(), window.prices, self.window)?;

        let first = prices[0].price;
        let last = prices[prices.len() - 1].price;
        let change = (last - first) / first;

        Ok(SignalOutput {
            direction: change,
            confidence: (change.abs() * self.scale).min(self.confidence_cap),
        })
    }
}
