//! Reporting utilities: review aggregation and filters.
//!
//! Text formatting lives in [`format`]; this module only computes.

use crate::domain::ReviewRow;

pub mod format;

pub use format::*;

/// Per-location review statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSummary {
    pub location: String,
    pub count: usize,
    pub average_rating: f64,
    /// Count of 1..=5 star ratings (index 0 is one star).
    pub histogram: [usize; 5],
}

/// Which reviews to show: optional location plus minimum star rating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub location: Option<String>,
    pub min_rating: u8,
}

impl ReviewFilter {
    pub fn matches(&self, row: &ReviewRow) -> bool {
        if row.rating < self.min_rating {
            return false;
        }
        match &self.location {
            Some(location) => row.location == *location,
            None => true,
        }
    }

    pub fn apply<'a>(&self, rows: &'a [ReviewRow]) -> Vec<&'a ReviewRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Summaries in first-seen location order.
pub fn summarize_reviews<'a>(rows: impl IntoIterator<Item = &'a ReviewRow>) -> Vec<LocationSummary> {
    let mut out: Vec<LocationSummary> = Vec::new();
    let mut sums: Vec<u64> = Vec::new();

    for row in rows {
        let idx = match out.iter().position(|s| s.location == row.location) {
            Some(idx) => idx,
            None => {
                out.push(LocationSummary {
                    location: row.location.clone(),
                    count: 0,
                    average_rating: 0.0,
                    histogram: [0; 5],
                });
                sums.push(0);
                out.len() - 1
            }
        };
        let summary = &mut out[idx];
        summary.count += 1;
        sums[idx] += u64::from(row.rating);
        if let Some(slot) = (row.rating as usize).checked_sub(1).and_then(|i| summary.histogram.get_mut(i)) {
            *slot += 1;
        }
    }

    for (summary, sum) in out.iter_mut().zip(sums) {
        summary.average_rating = sum as f64 / summary.count as f64;
    }
    out
}
