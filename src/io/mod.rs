//! Input/output helpers.
//!
//! - reviews CSV ingest + validation (`reviews`)
//! - financial figures spreadsheet ingest (`figures`)
//! - trends/reviews CSV exports (`export`)

pub mod export;
pub mod figures;
pub mod reviews;

pub use export::*;
pub use figures::*;
pub use reviews::*;
