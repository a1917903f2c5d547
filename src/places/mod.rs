//! Google Places integration: reviews per named location.
//!
//! For each location we run a text search, take the first hit, and request its
//! details with the `reviews` field. Google returns at most five reviews per
//! place through this endpoint.

use chrono::{DateTime, NaiveDateTime};
use log::{info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{DEFAULT_AUTHOR, ReviewRow};
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";
const DETAILS_PATH: &str = "/maps/api/place/details/json";
const DETAILS_FIELDS: &str = "name,rating,reviews";

pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// A location that could not be collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationError {
    pub location: String,
    pub message: String,
}

/// Rows for all locations that worked, errors for the rest.
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    pub rows: Vec<ReviewRow>,
    pub errors: Vec<LocationError>,
    /// Locations for which the search matched nothing.
    pub not_found: Vec<String>,
    /// Aggregate rating reported by Places, per location that was found.
    pub place_ratings: Vec<(String, Option<f64>)>,
}

impl PlacesClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("PLACES_API_KEY")
            .map_err(|_| AppError::usage("Missing PLACES_API_KEY in environment (.env)."))?;
        Ok(Self::with_base_url(DEFAULT_BASE_URL, api_key))
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Collect reviews for every location. One location's failure never stops
    /// the others.
    pub fn collect_reviews(&self, locations: &[String]) -> CollectOutcome {
        let mut outcome = CollectOutcome::default();

        for location in locations {
            match self.reviews_for(location) {
                Ok(Some(place)) => {
                    info!("{location}: {} review(s) from '{}'", place.reviews.len(), place.name);
                    outcome.place_ratings.push((location.clone(), place.rating));
                    outcome.rows.extend(flatten_reviews(location, place.reviews));
                }
                Ok(None) => {
                    warn!("{location}: no places found");
                    outcome.not_found.push(location.clone());
                }
                Err(message) => {
                    warn!("{location}: {message}");
                    outcome.errors.push(LocationError {
                        location: location.clone(),
                        message,
                    });
                }
            }
        }

        outcome
    }

    fn reviews_for(&self, location: &str) -> Result<Option<PlaceDetails>, String> {
        let search: TextSearchResponse = self.get_json(TEXT_SEARCH_PATH, &[("query", location)])?;
        match search.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            other => return Err(api_error("text search", other, search.error_message.as_deref())),
        }
        let Some(first) = search.results.into_iter().next() else {
            return Ok(None);
        };

        let details: DetailsResponse = self.get_json(
            DETAILS_PATH,
            &[("place_id", first.place_id.as_str()), ("fields", DETAILS_FIELDS)],
        )?;
        if details.status != "OK" {
            return Err(api_error("details", &details.status, details.error_message.as_deref()));
        }
        details
            .result
            .map(Some)
            .ok_or_else(|| "details response has no result".to_string())
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, String> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(|e| format!("Places request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("Places request failed with status {}.", resp.status()));
        }

        resp.json().map_err(|e| format!("Failed to parse Places response: {e}"))
    }
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    name: String,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Debug, Deserialize)]
struct PlaceReview {
    #[serde(default)]
    author_name: Option<String>,
    rating: u8,
    #[serde(default)]
    text: String,
    time: i64,
}

fn flatten_reviews(location: &str, reviews: Vec<PlaceReview>) -> Vec<ReviewRow> {
    reviews
        .into_iter()
        .filter_map(|r| {
            let Some(timestamp) = unix_to_datetime(r.time) else {
                warn!("{location}: skipping review with invalid time {}", r.time);
                return None;
            };
            Some(ReviewRow {
                location: location.to_string(),
                text: r.text,
                rating: r.rating.clamp(1, 5),
                timestamp,
                author: r
                    .author_name
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            })
        })
        .collect()
}

fn unix_to_datetime(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn api_error(call: &str, status: &str, message: Option<&str>) -> String {
    match message {
        Some(m) => format!("Places {call} returned {status}: {m}"),
        None => format!("Places {call} returned {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn locations(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn collects_and_flattens_reviews() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", TEXT_SEARCH_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "Kaspar Schmauser Essen".into()),
                Matcher::UrlEncoded("key".into(), "k".into()),
            ]))
            .with_body(r#"{"status":"OK","results":[{"place_id":"p1"},{"place_id":"p2"}]}"#)
            .create();
        server
            .mock("GET", DETAILS_PATH)
            .match_query(Matcher::UrlEncoded("place_id".into(), "p1".into()))
            .with_body(
                r#"{"status":"OK","result":{"name":"Kaspar Schmauser","rating":4.6,"reviews":[
                    {"author_name":"Jo","rating":5,"text":"Lecker","time":1700000000},
                    {"rating":3,"text":"ok","time":1700003600}
                ]}}"#,
            )
            .create();

        let client = PlacesClient::with_base_url(server.url(), "k");
        let outcome = client.collect_reviews(&locations(&["Kaspar Schmauser Essen"]));

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].author, "Jo");
        assert_eq!(outcome.rows[0].rating, 5);
        assert_eq!(outcome.rows[0].timestamp.to_string(), "2023-11-14 22:13:20");
        assert_eq!(outcome.rows[1].author, DEFAULT_AUTHOR);
        assert_eq!(outcome.place_ratings, vec![("Kaspar Schmauser Essen".to_string(), Some(4.6))]);
    }

    #[test]
    fn one_location_failing_does_not_stop_the_batch() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", TEXT_SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("query".into(), "Broken".into()))
            .with_body(r#"{"status":"REQUEST_DENIED","error_message":"bad key"}"#)
            .create();
        server
            .mock("GET", TEXT_SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("query".into(), "Nowhere".into()))
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create();
        server
            .mock("GET", TEXT_SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("query".into(), "Berlin".into()))
            .with_body(r#"{"status":"OK","results":[{"place_id":"b"}]}"#)
            .create();
        server
            .mock("GET", DETAILS_PATH)
            .match_query(Matcher::UrlEncoded("place_id".into(), "b".into()))
            .with_body(r#"{"status":"OK","result":{"name":"B","reviews":[{"rating":4,"text":"gut","time":1700000000}]}}"#)
            .create();

        let client = PlacesClient::with_base_url(server.url(), "k");
        let outcome = client.collect_reviews(&locations(&["Broken", "Nowhere", "Berlin"]));

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].location, "Broken");
        assert!(outcome.errors[0].message.contains("bad key"));
        assert_eq!(outcome.not_found, vec!["Nowhere".to_string()]);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].location, "Berlin");
    }
}
