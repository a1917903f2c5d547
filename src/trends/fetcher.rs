//! Geo-batched trend fetch.
//!
//! Regions are fetched one after another. Each region gets its own retry
//! budget for rate limiting, and a fixed pacing wait separates consecutive
//! regions whatever the previous one did. The provider limits by request
//! frequency, so the pacing is the throttle and must stay sequential.

use std::time::Duration;

use log::{info, warn};

use crate::domain::{FailureKind, FetchOutcome, RegionError, TrendPoint, TrendQuery};
use crate::trends::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::trends::{ProviderError, TrendsProvider, UpstreamSeries};

pub struct TrendFetcher<P, S = ThreadSleeper> {
    provider: P,
    sleeper: S,
    retry: RetryPolicy,
    pacing: Duration,
}

impl<P: TrendsProvider> TrendFetcher<P, ThreadSleeper> {
    pub fn new(provider: P, retry: RetryPolicy, pacing: Duration) -> Self {
        Self::with_sleeper(provider, ThreadSleeper, retry, pacing)
    }
}

impl<P: TrendsProvider, S: Sleeper> TrendFetcher<P, S> {
    pub fn with_sleeper(provider: P, sleeper: S, retry: RetryPolicy, pacing: Duration) -> Self {
        Self {
            provider,
            sleeper,
            retry,
            pacing,
        }
    }

    /// Fetch every region of `query`. Never fails as a whole: per-region
    /// problems are recorded in the outcome.
    pub fn fetch(&self, query: &TrendQuery) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let regions = query.distinct_regions();
        if regions.len() < query.regions().len() {
            warn!(
                "query for '{}' lists {} duplicate region(s); fetching each once",
                query.term(),
                query.regions().len() - regions.len()
            );
        }

        let budget = self.retry.effective_attempts();
        for (idx, region) in regions.iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                self.sleeper.sleep(self.pacing);
            }

            let retried = self.retry.run(
                &self.sleeper,
                |attempt| {
                    let result = self
                        .provider
                        .interest_over_time(query.term(), region, query.timeframe());
                    if let Err(ProviderError::RateLimited) = &result {
                        warn!("{region}: rate limited (attempt {attempt}/{budget})");
                    }
                    result
                },
                ProviderError::is_retryable,
            );

            match retried.result {
                Ok(upstream) => {
                    let points = strip_partial_marker(upstream);
                    info!("{region}: {} sample(s) after {} attempt(s)", points.len(), retried.attempts);
                    outcome.series.insert(*region, points);
                }
                Err(err) => {
                    let error = region_error(region, err, retried.attempts);
                    warn!("{region}: giving up ({}): {}", error.kind.label(), error.summary);
                    outcome.record_failure(error);
                }
            }
        }

        info!(
            "fetched '{}' ({}): {} region(s) ok, {} failed",
            query.term(),
            query.timeframe().display_name(),
            outcome.series.len(),
            outcome.failed_regions.len()
        );
        outcome
    }
}

/// The partial-data flag is metadata about the row, not a value.
fn strip_partial_marker(upstream: UpstreamSeries) -> Vec<TrendPoint> {
    upstream
        .rows
        .into_iter()
        .map(|row| TrendPoint {
            date: row.date,
            interest: row.interest,
        })
        .collect()
}

fn region_error(region: &str, err: ProviderError, attempts: u32) -> RegionError {
    let kind = match err {
        ProviderError::RateLimited => FailureKind::RateLimitExhausted,
        ProviderError::Transport(_) => FailureKind::Transport,
        ProviderError::Parse(_) => FailureKind::Parse,
    };
    let summary = match kind {
        FailureKind::RateLimitExhausted => format!("{err} after {attempts} attempt(s)"),
        _ => err.to_string(),
    };
    RegionError {
        region: region.to_string(),
        kind,
        summary,
        attempts,
    }
}
