//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - trend queries and their outcomes (`TrendQuery`, `TrendSeries`, `FetchOutcome`)
//! - review rows collected from places or loaded from CSV (`ReviewRow`)
//! - the financial figures table (`FiguresTable`)

pub mod types;

pub use types::*;
