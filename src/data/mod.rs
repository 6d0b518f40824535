pub mod cache;
pub mod sample;
pub mod types;

use anyhow::Result;

use crate::data::types::{PricePoint, SentimentPoint};

/// Supplies chronologically ordered, de-duplicated windows for an instrument.
///
/// Gaps in calendar coverage are the provider's business; callers only rely
/// on getting at most `len` of the most recent points.
pub trait DataProvider: Send + Sync {
    fn price_window(&self, symbol: &str, len: usize) -> Result<Vec<PricePoint>>;

    fn sentiment_window(&self, symbol: &str, len: usize) -> Result<Vec<SentimentPoint>>;
}
