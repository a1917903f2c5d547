//! Shared trends wiring used by both the CLI and the dashboard.
//!
//! Keeping this in one place avoids duplicating the setup:
//! flags -> `FetchConfig` -> provider client -> paced/retrying fetcher -> cache
//!
//! The front-ends can then focus on presentation (printing vs widgets).

use std::time::Duration;

use log::info;

use crate::cli::{FetchArgs, QueryArgs};
use crate::domain::{FetchConfig, TrendQuery};
use crate::error::AppError;
use crate::trends::{CachedFetcher, GoogleTrendsClient, OutcomeCache, RetryPolicy, ThreadSleeper, TrendFetcher};

/// The fetcher both front-ends use: Google client, real sleeps, TTL cache.
pub type BoardFetcher = CachedFetcher<GoogleTrendsClient, ThreadSleeper>;

pub fn fetch_config_from_args(args: &FetchArgs) -> FetchConfig {
    FetchConfig {
        pacing: Duration::from_millis(args.pacing_ms),
        max_attempts: args.max_attempts,
        backoff_base: Duration::from_millis(args.backoff_base_ms),
        backoff_max: Duration::from_millis(args.backoff_max_ms),
        hl: args.hl.clone(),
        tz_offset_minutes: args.tz,
        cache_ttl: Duration::from_secs(args.cache_ttl_secs),
    }
}

pub fn query_from_args(args: &QueryArgs) -> Result<TrendQuery, AppError> {
    TrendQuery::new(args.term.as_str(), args.regions.iter().map(String::as_str), args.timeframe)
}

pub fn retry_policy(config: &FetchConfig) -> Result<RetryPolicy, AppError> {
    if config.max_attempts == 0 {
        return Err(AppError::usage("--max-attempts must be at least 1."));
    }
    if config.backoff_max < config.backoff_base {
        return Err(AppError::usage("--backoff-max-ms must not be below --backoff-base-ms."));
    }
    Ok(RetryPolicy {
        max_attempts: config.max_attempts,
        base_delay: config.backoff_base,
        max_delay: config.backoff_max,
    })
}

/// Construct the client once; it is reused for every fetch of the session.
pub fn build_fetcher(config: &FetchConfig) -> Result<BoardFetcher, AppError> {
    let retry = retry_policy(config)?;
    let client = GoogleTrendsClient::new(config.hl.clone(), config.tz_offset_minutes)?;
    info!(
        "trends fetcher: pacing={:?} attempts={} backoff={:?}..{:?} hl={} tz={} ttl={:?}",
        config.pacing,
        retry.max_attempts,
        retry.base_delay,
        retry.max_delay,
        config.hl,
        config.tz_offset_minutes,
        config.cache_ttl
    );
    Ok(CachedFetcher::new(
        TrendFetcher::new(client, retry, config.pacing),
        OutcomeCache::new(config.cache_ttl),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn trends_args(extra: &[&str]) -> crate::cli::TrendsArgs {
        let mut argv = vec!["tb", "trends"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Trends(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_become_fetch_config() {
        let args = trends_args(&["--pacing-ms", "250", "--backoff-base-ms", "1000", "--cache-ttl-secs", "0"]);
        let config = fetch_config_from_args(&args.fetch);

        assert_eq!(config.pacing, Duration::from_millis(250));
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.backoff_max, Duration::from_secs(60));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.hl, "de-DE");

        let retry = retry_policy(&config).unwrap();
        assert_eq!(retry.max_attempts, 3);
    }

    #[test]
    fn invalid_retry_settings_are_usage_errors() {
        let args = trends_args(&["--max-attempts", "0"]);
        let err = retry_policy(&fetch_config_from_args(&args.fetch)).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let args = trends_args(&["--backoff-base-ms", "5000", "--backoff-max-ms", "10"]);
        assert!(retry_policy(&fetch_config_from_args(&args.fetch)).is_err());
    }

    #[test]
    fn empty_term_is_rejected_before_fetching() {
        let args = trends_args(&["--term", "  "]);
        assert_eq!(query_from_args(&args.query).unwrap_err().exit_code(), 2);
    }
}
