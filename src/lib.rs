//! `trend-board` library crate.
//!
//! The binary (`tb`) is a thin wrapper around this library so that:
//!
//! - the fetch/retry/pacing logic is testable without spawning processes
//! - the CLI and the dashboard share one pipeline

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod places;
pub mod plot;
pub mod report;
pub mod scrape;
pub mod trends;
pub mod tui;
