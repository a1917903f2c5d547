//! Google Trends integration (interest over time, one region per call).
//!
//! The public web endpoints work in two steps:
//!
//! 1. `explore` returns a set of widgets; the `TIMESERIES` widget carries a
//!    signed token and the request payload for the time series
//! 2. `widgetdata/multiline` returns `timelineData` for that widget
//!
//! Both responses start with an anti-JSON-hijacking prefix (`)]}'`) that has
//! to be stripped before parsing.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::domain::Timeframe;
use crate::error::AppError;
use crate::trends::{ProviderError, TrendsProvider, UpstreamRow, UpstreamSeries};

pub const DEFAULT_BASE_URL: &str = "https://trends.google.com";
pub const DEFAULT_HL: &str = "de-DE";
pub const DEFAULT_TZ_OFFSET_MINUTES: i32 = 60;

const EXPLORE_PATH: &str = "/trends/api/explore";
const MULTILINE_PATH: &str = "/trends/api/widgetdata/multiline";
const TIMESERIES_WIDGET: &str = "TIMESERIES";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Blocking Google Trends client. Construct once and reuse: the cookie store
/// holds the session cookie the endpoints expect.
pub struct GoogleTrendsClient {
    client: Client,
    base_url: String,
    hl: String,
    tz_offset_minutes: i32,
    cookies_primed: OnceLock<()>,
}

impl GoogleTrendsClient {
    pub fn new(hl: impl Into<String>, tz_offset_minutes: i32) -> Result<Self, AppError> {
        Self::with_base_url(DEFAULT_BASE_URL, hl, tz_offset_minutes)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        hl: impl Into<String>,
        tz_offset_minutes: i32,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("trend-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            hl: hl.into(),
            tz_offset_minutes,
            cookies_primed: OnceLock::new(),
        })
    }

    /// Visit the homepage once so the cookie store holds a session cookie.
    /// Failure here is not fatal; the data calls report their own errors.
    fn prime_cookies(&self) {
        self.cookies_primed.get_or_init(|| {
            let url = format!("{}/", self.base_url);
            match self.client.get(&url).query(&[("geo", geo_from_hl(&self.hl))]).send() {
                Ok(resp) => debug!("primed trends cookies (status {})", resp.status()),
                Err(e) => warn!("could not prime trends cookies: {e}"),
            }
        });
    }

    fn explore(&self, term: &str, region: &str, timeframe: Timeframe) -> Result<Widget, ProviderError> {
        let req = serde_json::json!({
            "comparisonItem": [{
                "keyword": term,
                "time": timeframe.provider_code(),
                "geo": region,
            }],
            "category": 0,
            "property": "",
        })
        .to_string();
        let tz = self.tz_offset_minutes.to_string();

        let resp = self
            .client
            .get(format!("{}{EXPLORE_PATH}", self.base_url))
            .query(&[("hl", self.hl.as_str()), ("tz", tz.as_str()), ("req", req.as_str())])
            .send()
            .map_err(|e| ProviderError::Transport(format!("explore request failed: {e}")))?;
        let body = read_body(resp)?;

        let explore: ExploreResponse = serde_json::from_str(strip_json_prefix(&body)?)
            .map_err(|e| ProviderError::Parse(format!("explore response: {e}")))?;

        explore
            .widgets
            .into_iter()
            .find(|w| w.id == TIMESERIES_WIDGET)
            .ok_or_else(|| ProviderError::Parse("explore response has no TIMESERIES widget".to_string()))
    }

    fn multiline(&self, widget: &Widget) -> Result<UpstreamSeries, ProviderError> {
        let token = widget
            .token
            .as_deref()
            .ok_or_else(|| ProviderError::Parse("TIMESERIES widget has no token".to_string()))?;
        let req = widget.request.to_string();
        let tz = self.tz_offset_minutes.to_string();

        let resp = self
            .client
            .get(format!("{}{MULTILINE_PATH}", self.base_url))
            .query(&[
                ("hl", self.hl.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
                ("token", token),
            ])
            .send()
            .map_err(|e| ProviderError::Transport(format!("timeline request failed: {e}")))?;
        let body = read_body(resp)?;

        parse_timeline(&body)
    }
}

impl TrendsProvider for GoogleTrendsClient {
    fn interest_over_time(
        &self,
        term: &str,
        region: &str,
        timeframe: Timeframe,
    ) -> Result<UpstreamSeries, ProviderError> {
        self.prime_cookies();
        let widget = self.explore(term, region, timeframe)?;
        self.multiline(&widget)
    }
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<Widget>,
}

#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: MultilineData,
}

#[derive(Debug, Deserialize)]
struct MultilineData {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelinePoint {
    time: String,
    #[serde(default)]
    value: Vec<i64>,
    #[serde(default)]
    has_data: Vec<bool>,
    #[serde(default)]
    is_partial: bool,
}

fn read_body(resp: Response) -> Result<String, ProviderError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        return Err(ProviderError::Transport(format!("HTTP status {status}")));
    }
    resp.text()
        .map_err(|e| ProviderError::Transport(format!("failed to read response body: {e}")))
}

fn strip_json_prefix(body: &str) -> Result<&str, ProviderError> {
    body.find('{')
        .map(|idx| &body[idx..])
        .ok_or_else(|| ProviderError::Parse("response contains no JSON object".to_string()))
}

fn parse_timeline(body: &str) -> Result<UpstreamSeries, ProviderError> {
    let parsed: MultilineResponse = serde_json::from_str(strip_json_prefix(body)?)
        .map_err(|e| ProviderError::Parse(format!("timeline response: {e}")))?;

    let mut rows = Vec::with_capacity(parsed.default.timeline_data.len());
    for point in parsed.default.timeline_data {
        let date = parse_unix_date(&point.time)?;
        let has_data = point.has_data.first().copied().unwrap_or(true);
        let interest = if has_data {
            point.value.first().map(|v| (*v).clamp(0, 100) as u8)
        } else {
            None
        };
        rows.push(UpstreamRow {
            date,
            interest,
            is_partial: point.is_partial,
        });
    }

    Ok(UpstreamSeries { rows })
}

fn parse_unix_date(raw: &str) -> Result<NaiveDate, ProviderError> {
    let secs = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ProviderError::Parse(format!("invalid timeline time '{raw}': {e}")))?;
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ProviderError::Parse(format!("timeline time out of range: {secs}")))
}

/// `de-DE` -> `DE`; anything shorter falls back to `US`.
fn geo_from_hl(hl: &str) -> String {
    hl.rsplit('-')
        .next()
        .filter(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "US".to_string())
}
