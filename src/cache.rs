//! Time-bounded result cache keyed by the normalized request. Entries are
//! immutable once written; stale entries are evicted on the read that finds
//! them and the whole map is swept on every write, which bounds growth
//! without a background task.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::api::models::{ApiResult, Request};

pub const CACHE_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: ApiResult,
    stored_at: DateTime<Utc>,
}

pub struct ResultCache {
    entries: Mutex<HashMap<Request, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::days(CACHE_TTL_DAYS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        ResultCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached value for `key` if it is within the TTL. A stale
    /// entry found here is evicted before reporting a miss.
    pub fn get(&self, key: &Request) -> Option<ApiResult> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Utc::now() - entry.stored_at <= self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("evicting stale cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, then sweeps every stale entry. Overwrites
    /// are idempotent last-write-wins.
    pub fn put(&self, key: Request, value: ApiResult) {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
        entries.retain(|_, entry| now - entry.stored_at <= self.ttl);
    }

    #[cfg(test)]
    fn backdate(&self, key: &Request, age: Duration) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.stored_at = Utc::now() - age;
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{
        AnalysisResult, FilterTag, Language, MarketSentiment, Mode,
    };

    fn key(query: &str, filters: Vec<FilterTag>) -> Request {
        Request {
            query: query.to_string(),
            filters,
            language: Language::En,
            mode: Mode::Analysis,
        }
    }

    fn result(name: &str) -> ApiResult {
        ApiResult::Analysis(AnalysisResult {
            name: name.to_string(),
            category: "General".to_string(),
            query_type: "analysis".to_string(),
            price_range: None,
            overview: ".".to_string(),
            pros: vec![],
            cons: vec![],
            market_sentiment: MarketSentiment {
                score: 0.0,
                description: ".".to_string(),
            },
            best_for: vec![],
            considerations: vec![],
            tags: vec![],
            comparable_products: vec![],
        })
    }

    #[test]
    fn put_then_get_returns_the_value() {
        let cache = ResultCache::new();
        cache.put(key("iPhone 15", vec![FilterTag::Price]), result("iPhone 15"));
        let hit = cache.get(&key("iPhone 15", vec![FilterTag::Price]));
        assert_eq!(hit, Some(result("iPhone 15")));
    }

    #[test]
    fn expired_entry_reads_as_absent_and_is_evicted() {
        let cache = ResultCache::new();
        let k = key("iPhone 15", vec![]);
        cache.put(k.clone(), result("iPhone 15"));
        cache.backdate(&k, Duration::days(CACHE_TTL_DAYS) + Duration::hours(1));

        assert_eq!(cache.get(&k), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn entry_just_inside_the_ttl_still_hits() {
        let cache = ResultCache::new();
        let k = key("iPhone 15", vec![]);
        cache.put(k.clone(), result("iPhone 15"));
        cache.backdate(&k, Duration::days(CACHE_TTL_DAYS) - Duration::hours(1));
        assert!(cache.get(&k).is_some());
    }

    #[test]
    fn put_sweeps_stale_entries() {
        let cache = ResultCache::new();
        let old = key("old query", vec![]);
        cache.put(old.clone(), result("old"));
        cache.backdate(&old, Duration::days(CACHE_TTL_DAYS) + Duration::hours(1));

        cache.put(key("new query", vec![]), result("new"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("new query", vec![])).is_some());
    }

    #[test]
    fn different_requests_do_not_collide() {
        let cache = ResultCache::new();
        cache.put(key("iPhone 15", vec![]), result("plain"));

        assert!(cache.get(&key("iPhone 15", vec![FilterTag::Price])).is_none());
        assert!(cache.get(&key("iPhone 15 Pro", vec![])).is_none());

        let mut other_mode = key("iPhone 15", vec![]);
        other_mode.mode = Mode::Recommendation;
        assert!(cache.get(&other_mode).is_none());
    }

    #[test]
    fn overwrite_is_last_write_wins() {
        let cache = ResultCache::new();
        let k = key("iPhone 15", vec![]);
        cache.put(k.clone(), result("first"));
        cache.put(k.clone(), result("second"));
        assert_eq!(cache.get(&k), Some(result("second")));
    }
}
