//! Page `<title>` lookup.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::error::AppError;

/// Fetch `url` and return its trimmed `<title>` text, `None` if the page has none.
pub fn page_title(url: &str) -> Result<Option<String>, AppError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::runtime(format!("Request to '{url}' failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(AppError::runtime(format!(
            "Request to '{url}' failed with status {}.",
            resp.status()
        )));
    }
    let body = resp
        .text()
        .map_err(|e| AppError::runtime(format!("Failed to read body of '{url}': {e}")))?;
    debug!("fetched {} byte(s) from {url}", body.len());

    Ok(extract_title(&body))
}

fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = doc.select(&selector).next()?.text().collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() { None } else { Some(title) }
}
