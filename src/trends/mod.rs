//! Search-interest time series per region.
//!
//! - `TrendsProvider`: the upstream capability (one region, one call)
//! - `google`: blocking Google Trends implementation
//! - `retry`: bounded exponential backoff around a single call
//! - `fetcher`: sequential, paced, per-region batch fetch
//! - `cache`: keyed outcome store with a time-to-live

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Timeframe;

pub mod cache;
pub mod fetcher;
pub mod google;
pub mod retry;

pub use cache::{CachedFetcher, OutcomeCache};
pub use fetcher::TrendFetcher;
pub use google::GoogleTrendsClient;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

/// Failure of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Provider asked us to slow down (HTTP 429).
    #[error("rate limited by trends provider")]
    RateLimited,
    /// Network error or unexpected HTTP status.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response could not be interpreted.
    #[error("malformed response: {0}")]
    Parse(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}

/// A row as delivered by the provider, partial-data flag included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamRow {
    pub date: NaiveDate,
    pub interest: Option<u8>,
    /// Provider marks the most recent samples as possibly incomplete.
    pub is_partial: bool,
}

/// Provider answer for one `(term, region, timeframe)`. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamSeries {
    pub rows: Vec<UpstreamRow>,
}

/// Upstream trends capability.
///
/// Implementations are used from a single thread; the fetcher calls them
/// strictly sequentially.
pub trait TrendsProvider {
    fn interest_over_time(
        &self,
        term: &str,
        region: &str,
        timeframe: Timeframe,
    ) -> Result<UpstreamSeries, ProviderError>;
}

impl<P: TrendsProvider + ?Sized> TrendsProvider for &P {
    fn interest_over_time(
        &self,
        term: &str,
        region: &str,
        timeframe: Timeframe,
    ) -> Result<UpstreamSeries, ProviderError> {
        (**self).interest_over_time(term, region, timeframe)
    }
}
