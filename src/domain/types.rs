//! Shared domain types.
//!
//! These types are kept lightweight so they can be:
//!
//! - produced by the trend fetcher and the places collector
//! - exported to CSV
//! - rendered by the CLI reports and the dashboard

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;

use crate::error::AppError;

/// Relative lookback window for a trends query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Timeframe {
    /// Last five years, weekly samples.
    #[value(name = "5y")]
    FiveYears,
    /// Last twelve months, weekly samples.
    #[value(name = "12m")]
    TwelveMonths,
    /// Last three months, daily samples.
    #[value(name = "3m")]
    ThreeMonths,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::FiveYears, Timeframe::TwelveMonths, Timeframe::ThreeMonths];

    /// Provider-side timeframe string.
    pub fn provider_code(self) -> &'static str {
        match self {
            Timeframe::FiveYears => "today 5-y",
            Timeframe::TwelveMonths => "today 12-m",
            Timeframe::ThreeMonths => "today 3-m",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Timeframe::FiveYears => "5 years",
            Timeframe::TwelveMonths => "12 months",
            Timeframe::ThreeMonths => "3 months",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Timeframe::FiveYears => Timeframe::TwelveMonths,
            Timeframe::TwelveMonths => Timeframe::ThreeMonths,
            Timeframe::ThreeMonths => Timeframe::FiveYears,
        }
    }
}

/// One trends request: a search term over a list of regions.
///
/// Only constructible through [`TrendQuery::new`], so a query in hand always
/// has a non-empty term and at least one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrendQuery {
    term: String,
    regions: Vec<String>,
    timeframe: Timeframe,
}

impl TrendQuery {
    pub fn new<I, S>(term: impl Into<String>, regions: I, timeframe: Timeframe) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let term = term.into().trim().to_string();
        if term.is_empty() {
            return Err(AppError::usage("Search term must not be empty."));
        }

        let regions: Vec<String> = regions
            .into_iter()
            .map(|r| r.into().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if regions.is_empty() {
            return Err(AppError::usage("At least one region code is required."));
        }

        Ok(Self {
            term,
            regions,
            timeframe,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Regions in request order with repeats removed (first occurrence wins).
    pub fn distinct_regions(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.regions
            .iter()
            .map(String::as_str)
            .filter(|r| seen.insert(*r))
            .collect()
    }
}

/// One sample of a region's interest-over-time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Relative interest 0-100, `None` when the provider has no sample.
    pub interest: Option<u8>,
}

/// Series for a single region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSeries {
    pub region: String,
    pub points: Vec<TrendPoint>,
}

impl RegionSeries {
    pub fn latest_interest(&self) -> Option<u8> {
        self.points.iter().rev().find_map(|p| p.interest)
    }

    pub fn mean_interest(&self) -> Option<f64> {
        let values: Vec<f64> = self.points.iter().filter_map(|p| p.interest).map(f64::from).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Region -> series, kept in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendSeries {
    regions: Vec<RegionSeries>,
}

impl TrendSeries {
    pub fn insert(&mut self, region: impl Into<String>, points: Vec<TrendPoint>) {
        let region = region.into();
        match self.regions.iter_mut().find(|s| s.region == region) {
            Some(existing) => existing.points = points,
            None => self.regions.push(RegionSeries { region, points }),
        }
    }

    pub fn get(&self, region: &str) -> Option<&RegionSeries> {
        self.regions.iter().find(|s| s.region == region)
    }

    pub fn contains(&self, region: &str) -> bool {
        self.get(region).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionSeries> {
        self.regions.iter()
    }

    pub fn region_codes(&self) -> Vec<&str> {
        self.regions.iter().map(|s| s.region.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Sorted union of all sample dates across regions.
    pub fn date_grid(&self) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .regions
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        dates.into_iter().collect()
    }
}

/// Why a region ended up in `failed_regions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt was rate limited.
    RateLimitExhausted,
    /// Network error or non-success HTTP status.
    Transport,
    /// Upstream answered with something we could not read.
    Parse,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::RateLimitExhausted => "rate limited",
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionError {
    pub region: String,
    pub kind: FailureKind,
    pub summary: String,
    pub attempts: u32,
}

/// Result of fetching a [`TrendQuery`]. Partial success is a normal value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub series: TrendSeries,
    pub failed_regions: BTreeSet<String>,
    /// Failures in request order.
    pub errors: Vec<RegionError>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_regions.is_empty()
    }

    pub fn record_failure(&mut self, error: RegionError) {
        self.failed_regions.insert(error.region.clone());
        self.errors.push(error);
    }
}

/// Fetch tuning shared by the CLI and the dashboard.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub pacing: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub hl: String,
    pub tz_offset_minutes: i32,
    pub cache_ttl: Duration,
}

/// One customer review for a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub location: String,
    pub text: String,
    /// Star rating 1-5.
    pub rating: u8,
    pub timestamp: NaiveDateTime,
    pub author: String,
}

pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Financial figures spreadsheet: one labelled row per period/line item.
#[derive(Debug, Clone, PartialEq)]
pub struct FiguresTable {
    pub label_header: String,
    pub columns: Vec<String>,
    pub rows: Vec<FigureRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigureRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl FiguresTable {
    /// Sum of each numeric column, ignoring missing cells.
    pub fn column_totals(&self) -> Vec<Option<f64>> {
        (0..self.columns.len())
            .map(|idx| {
                let cells: Vec<f64> = self
                    .rows
                    .iter()
                    .filter_map(|r| r.values.get(idx).copied().flatten())
                    .collect();
                if cells.is_empty() { None } else { Some(cells.iter().sum()) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_empty_term_and_regions() {
        assert_eq!(
            TrendQuery::new("  ", ["DE-BY"], Timeframe::FiveYears).unwrap_err().exit_code(),
            2
        );
        let none: [&str; 0] = [];
        assert!(TrendQuery::new("bowl", none, Timeframe::FiveYears).is_err());
        assert!(TrendQuery::new("bowl", ["", " "], Timeframe::FiveYears).is_err());
    }

    #[test]
    fn distinct_regions_keep_request_order() {
        let q = TrendQuery::new("bowl", ["DE-BY", "DE-BE", "DE-BY"], Timeframe::ThreeMonths).unwrap();
        assert_eq!(q.regions().len(), 3);
        assert_eq!(q.distinct_regions(), vec!["DE-BY", "DE-BE"]);
    }

    #[test]
    fn date_grid_is_union_of_regions() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        let mut series = TrendSeries::default();
        series.insert("A", vec![TrendPoint { date: d(1), interest: Some(1) }, TrendPoint { date: d(8), interest: None }]);
        series.insert("B", vec![TrendPoint { date: d(8), interest: Some(3) }, TrendPoint { date: d(15), interest: Some(4) }]);
        assert_eq!(series.date_grid(), vec![d(1), d(8), d(15)]);
        assert_eq!(series.get("A").unwrap().latest_interest(), Some(1));
        assert_eq!(series.get("B").unwrap().mean_interest(), Some(3.5));
    }

    #[test]
    fn figures_totals_skip_missing_cells() {
        let table = FiguresTable {
            label_header: "month".to_string(),
            columns: vec!["revenue".to_string(), "cost".to_string()],
            rows: vec![
                FigureRow { label: "Jan".to_string(), values: vec![Some(10.0), None] },
                FigureRow { label: "Feb".to_string(), values: vec![Some(5.5), None] },
            ],
        };
        assert_eq!(table.column_totals(), vec![Some(15.5), None]);
    }
}
