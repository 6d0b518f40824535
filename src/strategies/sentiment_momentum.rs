use crate::config::SignalConfig;
use crate::data::types::tail;
use crate::strategies::types::{MarketWindow, Signal, SignalError, SignalKind, SignalOutput};

/// Trades in the direction of recent average news sentiment.
#[derive(Debug, Clone)]
pub struct SentimentMomentumSignal {
    window: usize,
    amplification: f64,
    scale: f64,
    confidence_cap: f64,
}

impl SentimentMomentumSignal {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            amplification: 2.0,
            scale: 2.0,
            confidence_cap: 0.9,
        }
    }

    pub fn from_config(config: &SignalConfig) -> Self {
        Self {
            window: config.sentiment_window,
            amplification: config.sentiment_amplification,
            scale: config.sentiment_scale,
            confidence_cap: config.confidence_cap,
        }
    }
}

impl Default for SentimentMomentumSignal {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Signal for SentimentMomentumSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::SentimentMomentum
    }

    fn generate(&self, window: &MarketWindow<'_>) -> Result<SignalOutput, SignalError> {
        let points = tail(window.sentiment, self.window);
        if points.is_empty() {
            return Err(SignalError::InsufficientData {
                signal: self.kind(),
                required: 1,
                actual: 0,
            });
        }
        if let Some(bad) = points.iter().find(|p| !(-1.0..=1.0).contains(&p.sentiment)) {
            return Err(SignalError::InvalidInput {
                signal: self.kind(),
                reason: format!("sentiment {} on {} outside [-1, 1]", bad.sentiment, bad.date),
            });
        }

        let avg = points.iter().map(|p| p.sentiment).sum::<f64>() / points.len() as f64;

        Ok(SignalOutput {
            direction: avg * self.amplification,
            confidence: (avg.abs() * self.scale).min(self.confidence_cap),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::sentiment;

    #[test]
    fn test_average_sentiment_amplified() {
        let series = sentiment(&[0.2, 0.4, 0.0]);
        let out = SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &series))
            .unwrap();
        assert!((out.direction - 0.4).abs() < 1e-12);
        assert!((out.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_sentiment() {
        let series = sentiment(&[0.0; 10]);
        let out = SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &series))
            .unwrap();
        assert_eq!(out.direction, 0.0);
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn test_negative_sentiment_capped() {
        let series = sentiment(&[-0.9, -1.0]);
        let out = SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &series))
            .unwrap();
        assert!(out.direction < 0.0);
        assert_eq!(out.confidence, 0.9);
    }

    #[test]
    fn test_single_point_is_enough() {
        let series = sentiment(&[0.1]);
        assert!(SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &series))
            .is_ok());
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        let err = SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &[]))
            .unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData { required: 1, actual: 0, .. }));
    }

    #[test]
    fn test_out_of_range_sentiment_rejected() {
        for value in [5.0, -1.5, f64::NAN] {
            let series = sentiment(&[0.1, value]);
            let err = SentimentMomentumSignal::default()
                .generate(&MarketWindow::new(&[], &series))
                .unwrap_err();
            assert!(matches!(err, SignalError::InvalidInput { .. }), "{} accepted", value);
        }

        let series = sentiment(&[1.0, -1.0]);
        assert!(SentimentMomentumSignal::default()
            .generate(&MarketWindow::new(&[], &series))
            .is_ok());
    }
}
