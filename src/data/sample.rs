use anyhow::Result;
use chrono::{Days, NaiveDate};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::debug;

use crate::data::cache::SeriesCache;
use crate::data::types::{tail, validate_chronological, MarketSeries, PricePoint, SentimentPoint};
use crate::data::DataProvider;

const DEFAULT_HISTORY_DAYS: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendRegime {
    Uptrend,
    Downtrend,
    Volatile,
    Sideways,
}

impl TrendRegime {
    const ALL: [TrendRegime; 4] = [
        TrendRegime::Uptrend,
        TrendRegime::Downtrend,
        TrendRegime::Volatile,
        TrendRegime::Sideways,
    ];

    fn drift<R: Rng>(self, rng: &mut R) -> f64 {
        match self {
            TrendRegime::Uptrend => rng.gen_range(0.1..0.5),
            TrendRegime::Downtrend => rng.gen_range(-0.5..-0.1),
            TrendRegime::Volatile => rng.gen_range(-1.0..1.0),
            TrendRegime::Sideways => rng.gen_range(-0.1..0.1),
        }
    }

    fn sentiment_bias(self) -> f64 {
        match self {
            TrendRegime::Uptrend => 0.2,
            TrendRegime::Downtrend => -0.2,
            TrendRegime::Volatile | TrendRegime::Sideways => 0.0,
        }
    }
}

/// Synthetic market data for demos and tests.
///
/// Each symbol gets its own reproducible series derived from the provider
/// seed, so two providers with the same seed agree on every point. Advanced
/// days are kept for the provider's lifetime.
pub struct SampleDataProvider {
    cache: SeriesCache,
    seed: u64,
    history_days: usize,
    start: NaiveDate,
    advance_lock: Mutex<()>,
}

impl SampleDataProvider {
    pub fn new(seed: u64) -> Self {
        Self::with_history(seed, DEFAULT_HISTORY_DAYS)
    }

    pub fn with_history(seed: u64, history_days: usize) -> Self {
        Self {
            cache: SeriesCache::persistent(),
            seed,
            history_days: history_days.max(1),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            advance_lock: Mutex::new(()),
        }
    }

    pub fn regime(&self, symbol: &str) -> TrendRegime {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        TrendRegime::ALL[rng.gen_range(0..TrendRegime::ALL.len())]
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.series(symbol).last_price()
    }

    /// Append the next trading day to a symbol's series and return its price.
    pub fn advance(&self, symbol: &str) -> Result<f64> {
        let _guard = self.advance_lock.lock();
        let current = self.series(symbol);
        let mut next = (*current).clone();

        let day = next.prices.len() as u64;
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol).wrapping_add(day));
        let regime = self.regime(symbol);
        let prev = next.last_price().unwrap_or(100.0);
        let date = self.date_for(day);

        let (price, sentiment) = next_day(&mut rng, regime, prev, date);
        next.prices.push(price.clone());
        next.sentiment.push(sentiment);

        validate_chronological(&next.prices)?;
        validate_chronological(&next.sentiment)?;

        debug!(symbol, date = %price.date, price = price.price, "advanced synthetic series");
        self.cache.insert(symbol, Arc::new(next));
        Ok(price.price)
    }

    fn series(&self, symbol: &str) -> Arc<MarketSeries> {
        if let Some(series) = self.cache.get(symbol) {
            return series;
        }
        let series = Arc::new(self.generate(symbol));
        self.cache.insert(symbol, Arc::clone(&series));
        series
    }

    fn generate(&self, symbol: &str) -> MarketSeries {
        let seed = self.symbol_seed(symbol);
        let regime = self.regime(symbol);
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);

        let mut series = MarketSeries::default();
        let mut price = rng.gen_range(100.0..500.0);
        for day in 0..self.history_days {
            let (point, sentiment) = next_day(&mut rng, regime, price, self.date_for(day as u64));
            price = point.price;
            series.prices.push(point);
            series.sentiment.push(sentiment);
        }

        debug!(symbol, ?regime, days = self.history_days, "generated synthetic series");
        series
    }

    fn date_for(&self, day: u64) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(day))
            .unwrap_or(NaiveDate::MAX)
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        symbol
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
    }
}

fn next_day<R: Rng>(
    rng: &mut R,
    regime: TrendRegime,
    prev_price: f64,
    date: NaiveDate,
) -> (PricePoint, SentimentPoint) {
    let change = rng.gen_range(-2.0..2.0) + regime.drift(rng);
    let price = (prev_price + change).max(0.01);

    let sentiment = (regime.sentiment_bias() + rng.gen_range(-0.8..0.8)).clamp(-1.0, 1.0);

    (
        PricePoint {
            date,
            price,
            volume: rng.gen_range(1_000_000..10_000_000),
        },
        SentimentPoint {
            date,
            sentiment,
            article_count: rng.gen_range(5..55),
        },
    )
}

impl DataProvider for SampleDataProvider {
    fn price_window(&self, symbol: &str, len: usize) -> Result<Vec<PricePoint>> {
        Ok(tail(&self.series(symbol).prices, len).to_vec())
    }

    fn sentiment_window(&self, symbol: &str, len: usize) -> Result<Vec<SentimentPoint>> {
        Ok(tail(&self.series(symbol).sentiment, len).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_series() {
        let a = SampleDataProvider::new(42);
        let b = SampleDataProvider::new(42);

        assert_eq!(
            a.price_window("AAPL", 20).unwrap(),
            b.price_window("AAPL", 20).unwrap()
        );
        assert_eq!(a.regime("AAPL"), b.regime("AAPL"));
    }

    #[test]
    fn test_window_length_and_order() {
        let provider = SampleDataProvider::with_history(1, 30);

        let prices = provider.price_window("MSFT", 10).unwrap();
        let sentiment = provider.sentiment_window("MSFT", 10).unwrap();
        assert_eq!(prices.len(), 10);
        assert_eq!(sentiment.len(), 10);
        assert!(validate_chronological(&prices).is_ok());

        let all = provider.price_window("MSFT", 500).unwrap();
        assert_eq!(all.len(), 30);
    }

    #[test]
    fn test_values_in_range() {
        let provider = SampleDataProvider::new(9);
        for point in provider.price_window("TSLA", 90).unwrap() {
            assert!(point.price >= 0.01);
            assert!((1_000_000..10_000_000).contains(&point.volume));
        }
        for point in provider.sentiment_window("TSLA", 90).unwrap() {
            assert!((-1.0..=1.0).contains(&point.sentiment));
            assert!((5..55).contains(&point.article_count));
        }
    }

    #[test]
    fn test_advance_appends_next_day() {
        let provider = SampleDataProvider::with_history(3, 15);
        let before = provider.price_window("GOOGL", 100).unwrap();

        let price = provider.advance("GOOGL").unwrap();
        let after = provider.price_window("GOOGL", 100).unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after.last().unwrap().price, price);
        assert!(after.last().unwrap().date > before.last().unwrap().date);
        assert_eq!(provider.last_price("GOOGL"), Some(price));
    }

    #[test]
    fn test_advanced_days_are_kept() {
        let provider = SampleDataProvider::with_history(5, 15);
        provider.advance("AMZN").unwrap();
        let last = provider.advance("AMZN").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));

        let prices = provider.price_window("AMZN", 100).unwrap();
        assert_eq!(prices.len(), 17);
        assert_eq!(prices.last().unwrap().price, last);
        assert_eq!(provider.sentiment_window("AMZN", 100).unwrap().len(), 17);
    }
}
