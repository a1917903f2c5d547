//! In-memory outcome cache keyed by query.
//!
//! Entries expire after a fixed time-to-live. Only complete outcomes are
//! stored: a region that failed on a rate limit should be retried on the next
//! request, not served stale for the whole TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::domain::{FetchOutcome, TrendQuery};
use crate::trends::retry::Sleeper;
use crate::trends::{TrendFetcher, TrendsProvider};

#[derive(Debug)]
pub struct OutcomeCache {
    ttl: Duration,
    entries: HashMap<TrendQuery, CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    outcome: FetchOutcome,
}

impl OutcomeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, query: &TrendQuery) -> Option<&FetchOutcome> {
        self.get_at(query, Instant::now())
    }

    fn get_at(&self, query: &TrendQuery, now: Instant) -> Option<&FetchOutcome> {
        let entry = self.entries.get(query)?;
        if now.saturating_duration_since(entry.stored_at) >= self.ttl {
            return None;
        }
        Some(&entry.outcome)
    }

    /// Store `outcome` if it is complete. Returns whether it was stored.
    /// Expired entries are dropped on every call, so the map only holds
    /// queries seen within the last TTL.
    pub fn insert(&mut self, query: TrendQuery, outcome: FetchOutcome) -> bool {
        self.insert_at(query, outcome, Instant::now())
    }

    fn insert_at(&mut self, query: TrendQuery, outcome: FetchOutcome, now: Instant) -> bool {
        let purged = self.purge_expired_at(now);
        if purged > 0 {
            debug!("cache: dropped {purged} expired entries");
        }
        if !outcome.is_complete() || self.ttl.is_zero() {
            return false;
        }
        self.entries.insert(
            query,
            CacheEntry {
                stored_at: now,
                outcome,
            },
        );
        true
    }

    pub fn invalidate(&mut self, query: &TrendQuery) -> bool {
        self.entries.remove(query).is_some()
    }

    /// Drop expired entries. Returns how many were removed.
    fn purge_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fetcher that consults an [`OutcomeCache`] first.
pub struct CachedFetcher<P, S> {
    fetcher: TrendFetcher<P, S>,
    cache: OutcomeCache,
}

impl<P: TrendsProvider, S: Sleeper> CachedFetcher<P, S> {
    pub fn new(fetcher: TrendFetcher<P, S>, cache: OutcomeCache) -> Self {
        Self { fetcher, cache }
    }

    /// Return the cached outcome when fresh, otherwise fetch and remember it.
    pub fn fetch(&mut self, query: &TrendQuery) -> FetchOutcome {
        if let Some(hit) = self.cache.get(query) {
            debug!("cache hit for '{}' ({} regions)", query.term(), query.regions().len());
            return hit.clone();
        }
        self.refresh(query)
    }

    /// Always go upstream, replacing any cached entry.
    pub fn refresh(&mut self, query: &TrendQuery) -> FetchOutcome {
        self.cache.invalidate(query);
        let outcome = self.fetcher.fetch(query);
        self.cache.insert(query.clone(), outcome.clone());
        outcome
    }

    pub fn cache(&self) -> &OutcomeCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, RegionError, Timeframe, TrendPoint};
    use crate::trends::fetcher::tests::{weekly, ScriptedProvider};
    use crate::trends::retry::tests::RecordingSleeper;
    use crate::trends::{ProviderError, RetryPolicy};
    use chrono::NaiveDate;

    fn query(term: &str) -> TrendQuery {
        TrendQuery::new(term, ["DE-BY"], Timeframe::TwelveMonths).unwrap()
    }

    fn complete() -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        outcome.series.insert(
            "DE-BY",
            vec![TrendPoint {
                date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
                interest: Some(55),
            }],
        );
        outcome
    }

    fn partial() -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        outcome.record_failure(RegionError {
            region: "DE-BY".to_string(),
            kind: FailureKind::RateLimitExhausted,
            summary: "rate limited".to_string(),
            attempts: 3,
        });
        outcome
    }

    #[test]
    fn returns_fresh_complete_outcomes() {
        let mut cache = OutcomeCache::new(Duration::from_secs(60));
        assert!(cache.insert(query("bowl"), complete()));
        assert_eq!(cache.get(&query("bowl")), Some(&complete()));
        assert!(cache.get(&query("burger")).is_none());
    }

    #[test]
    fn refuses_partial_outcomes() {
        let mut cache = OutcomeCache::new(Duration::from_secs(60));
        assert!(!cache.insert(query("bowl"), partial()));
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let mut cache = OutcomeCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at(query("bowl"), complete(), t0);

        assert!(cache.get_at(&query("bowl"), t0 + Duration::from_secs(59)).is_some());
        assert!(cache.get_at(&query("bowl"), t0 + Duration::from_secs(60)).is_none());
        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(61)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn inserting_drops_expired_entries() {
        let mut cache = OutcomeCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        for (idx, term) in ["bowl", "wrap", "salad", "curry", "soup"].into_iter().enumerate() {
            cache.insert_at(query(term), complete(), t0 + Duration::from_secs(61 * idx as u64));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at(&query("soup"), t0 + Duration::from_secs(61 * 4)).is_some());

        // A refused partial outcome still evicts.
        assert!(!cache.insert_at(query("bowl"), partial(), t0 + Duration::from_secs(61 * 6)));
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_fetcher_does_not_accumulate_expired_queries() {
        let provider = ScriptedProvider::default().script("DE-BY", vec![Ok(weekly(2, false))]);
        let sleeper = RecordingSleeper::default();
        let fetcher = TrendFetcher::with_sleeper(&provider, &sleeper, RetryPolicy::default(), Duration::ZERO);
        let mut cached = CachedFetcher::new(fetcher, OutcomeCache::new(Duration::from_millis(1)));

        for term in ["bowl", "wrap", "salad", "curry", "soup"] {
            cached.fetch(&query(term));
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(cached.cache().len(), 1);
    }

    #[test]
    fn timeframe_is_part_of_the_key() {
        let mut cache = OutcomeCache::new(Duration::from_secs(60));
        cache.insert(query("bowl"), complete());
        let other = TrendQuery::new("bowl", ["DE-BY"], Timeframe::FiveYears).unwrap();
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn cached_fetcher_skips_upstream_on_hit_and_refresh_bypasses() {
        let provider = ScriptedProvider::default().script("DE-BY", vec![Ok(weekly(3, false))]);
        let sleeper = RecordingSleeper::default();
        let fetcher = TrendFetcher::with_sleeper(&provider, &sleeper, RetryPolicy::default(), Duration::ZERO);
        let mut cached = CachedFetcher::new(fetcher, OutcomeCache::new(Duration::from_secs(600)));

        let first = cached.fetch(&query("bowl"));
        let second = cached.fetch(&query("bowl"));
        assert_eq!(first, second);
        assert_eq!(provider.calls_for("DE-BY"), 1);

        cached.refresh(&query("bowl"));
        assert_eq!(provider.calls_for("DE-BY"), 2);
    }

    #[test]
    fn cached_fetcher_retries_partial_outcomes_next_time() {
        let provider = ScriptedProvider::default()
            .script("DE-BY", vec![Err(ProviderError::Transport("reset".to_string())), Ok(weekly(2, false))]);
        let sleeper = RecordingSleeper::default();
        let fetcher = TrendFetcher::with_sleeper(&provider, &sleeper, RetryPolicy::default(), Duration::ZERO);
        let mut cached = CachedFetcher::new(fetcher, OutcomeCache::new(Duration::from_secs(600)));

        assert!(!cached.fetch(&query("bowl")).is_complete());
        assert!(cached.fetch(&query("bowl")).is_complete());
        assert_eq!(provider.calls_for("DE-BY"), 2);
        assert_eq!(cached.cache().len(), 1);
    }
}
