use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    /// In [-1, 1].
    pub sentiment: f64,
    pub article_count: u32,
}

/// Full history for one instrument, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MarketSeries {
    pub prices: Vec<PricePoint>,
    pub sentiment: Vec<SentimentPoint>,
}

impl MarketSeries {
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().map(|p| p.price)
    }
}

pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for PricePoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for SentimentPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Check that a series is chronological with unique dates.
pub fn validate_chronological<T: Dated>(points: &[T]) -> Result<()> {
    for pair in points.windows(2) {
        if pair[1].date() <= pair[0].date() {
            bail!(
                "series not strictly chronological: {} followed by {}",
                pair[0].date(),
                pair[1].date()
            );
        }
    }
    Ok(())
}

/// The most recent `len` points of a series (or all of them if shorter).
pub fn tail<T>(points: &[T], len: usize) -> &[T] {
    &points[points.len().saturating_sub(len)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, price: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            price,
            volume: 1_000,
        }
    }

    #[test]
    fn test_chronological_accepts_increasing_dates() {
        let series = vec![point(1, 10.0), point(2, 11.0), point(5, 12.0)];
        assert!(validate_chronological(&series).is_ok());
    }

    #[test]
    fn test_chronological_rejects_duplicates() {
        let series = vec![point(1, 10.0), point(1, 11.0)];
        assert!(validate_chronological(&series).is_err());
    }

    #[test]
    fn test_chronological_rejects_reversed() {
        let series = vec![point(3, 10.0), point(2, 11.0)];
        assert!(validate_chronological(&series).is_err());
    }

    #[test]
    fn test_tail() {
        let values = [1, 2, 3, 4, 5];
        assert_eq!(tail(&values, 2), &[4, 5]);
        assert_eq!(tail(&values, 10), &values);
        assert!(tail(&values, 0).is_empty());
    }
}
