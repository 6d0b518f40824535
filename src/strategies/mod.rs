pub mod aggregator;
pub mod mean_reversion;
pub mod momentum;
pub mod sentiment_momentum;
pub mod types;

use crate::data::types::{tail, PricePoint};
use crate::strategies::types::{SignalError, SignalKind};

const MIN_PRICE_POINTS: usize = 2;

/// Most recent `window` prices, checked for length and positivity.
pub(crate) fn price_tail(
    signal: SignalKind,
    prices: &[PricePoint],
    window: usize,
) -> Result<&[PricePoint], SignalError> {
    let recent = tail(prices, window);
    if recent.len() < MIN_PRICE_POINTS {
        return Err(SignalError::InsufficientData {
            signal,
            required: MIN_PRICE_POINTS,
            actual: recent.len(),
        });
    }
    if let Some(bad) = recent.iter().find(|p| !(p.price.is_finite() && p.price > 0.0)) {
        return Err(SignalError::InvalidInput {
            signal,
            reason: format!("price {} on {} is not positive", bad.price, bad.date),
        });
    }
    Ok(recent)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Days, NaiveDate};

    use crate::data::types::{PricePoint, SentimentPoint};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(i as u64))
            .unwrap()
    }

    pub fn prices(values: &[f64]) -> Vec<PricePoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint { date: day(i), price, volume: 1_000_000 })
            .collect()
    }

    pub fn sentiment(values: &[f64]) -> Vec<SentimentPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &sentiment)| SentimentPoint { date: day(i), sentiment, article_count: 10 })
            .collect()
    }

    pub fn flat_then_jump() -> Vec<PricePoint> {
        let mut values = vec![100.0; 9];
        values.push(110.0);
        prices(&values)
    }
}
