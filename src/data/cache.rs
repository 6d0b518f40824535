use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::data::types::MarketSeries;

pub struct SeriesCache {
    cache: DashMap<String, CachedSeries>,
    ttl: Option<Duration>,
}

struct CachedSeries {
    series: Arc<MarketSeries>,
    timestamp: Instant,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Entries live until replaced or cleared
    pub fn persistent() -> Self {
        Self {
            cache: DashMap::new(),
            ttl: None,
        }
    }

    /// Insert (or replace) the series for a symbol, resetting its age
    pub fn insert(&self, symbol: impl Into<String>, series: Arc<MarketSeries>) {
        self.cache.insert(symbol.into(), CachedSeries {
            series,
            timestamp: Instant::now(),
        });
    }

    /// Get series if not expired (evict on read)
    pub fn get(&self, symbol: &str) -> Option<Arc<MarketSeries>> {
        let entry = self.cache.get(symbol)?;
        let expired = self.ttl.is_some_and(|ttl| entry.timestamp.elapsed() > ttl);
        if expired {
            drop(entry); // Drop the read lock before removing
            self.cache.remove(symbol);
            None
        } else {
            Some(Arc::clone(&entry.series))
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cache_insert_and_get() {
        let cache = SeriesCache::default();
        cache.insert("AAPL", Arc::new(MarketSeries::default()));

        assert!(cache.get("AAPL").is_some());
        assert!(cache.get("MSFT").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_ttl_expiration() {
        let cache = SeriesCache::new(Duration::from_millis(100));
        cache.insert("TSLA", Arc::new(MarketSeries::default()));

        assert!(cache.get("TSLA").is_some());

        thread::sleep(Duration::from_millis(150));

        assert!(cache.get("TSLA").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persistent_cache_keeps_entries() {
        let cache = SeriesCache::persistent();
        cache.insert("TSLA", Arc::new(MarketSeries::default()));

        thread::sleep(Duration::from_millis(50));

        assert!(cache.get("TSLA").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_replaces_entry() {
        let cache = SeriesCache::default();
        cache.insert("AAPL", Arc::new(MarketSeries::default()));

        let mut series = MarketSeries::default();
        series.prices.push(crate::data::types::PricePoint {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            price: 101.0,
            volume: 5,
        });
        cache.insert("AAPL", Arc::new(series));

        assert_eq!(cache.get("AAPL").unwrap().last_price(), Some(101.0));
        assert_eq!(cache.len(), 1);
    }
}
