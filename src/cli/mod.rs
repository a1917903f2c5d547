//! Command-line parsing for `tb`.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching, ingest and rendering. Dispatch lives in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Timeframe;
use crate::trends::google::{DEFAULT_HL, DEFAULT_TZ_OFFSET_MINUTES};

pub const DEFAULT_TERM: &str = "Kaspar Schmauser";
pub const DEFAULT_REGIONS: [&str; 4] = ["DE-BY", "DE-SN", "DE-NW", "DE-BE"];

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about = "Search-interest, reviews and figures board")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch search interest per region, print a summary and optionally plot/export.
    Trends(TrendsArgs),
    /// Collect reviews from Google Places or inspect a reviews CSV.
    #[command(subcommand)]
    Reviews(ReviewsCommand),
    /// Print a financial figures spreadsheet (CSV) with column totals.
    Figures(FiguresArgs),
    /// Print the `<title>` of a web page.
    Title(TitleArgs),
    /// Launch the interactive dashboard (default when no subcommand is given).
    Dashboard(DashboardArgs),
}

/// Which trends to request.
#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    /// Search term.
    #[arg(short = 't', long, default_value = DEFAULT_TERM)]
    pub term: String,

    /// Region codes, comma separated (e.g. DE-BY,DE-BE).
    #[arg(
        short = 'r',
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_REGIONS.map(String::from)
    )]
    pub regions: Vec<String>,

    /// Lookback window.
    #[arg(long, value_enum, default_value_t = Timeframe::FiveYears)]
    pub timeframe: Timeframe,
}

/// Rate-limit and provider tuning shared by `trends` and `dashboard`.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Pause between two regions (milliseconds).
    #[arg(long, default_value_t = 5_000)]
    pub pacing_ms: u64,

    /// Backoff before the first retry (milliseconds); doubles per retry.
    #[arg(long, default_value_t = 10_000)]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff wait (milliseconds).
    #[arg(long, default_value_t = 60_000)]
    pub backoff_max_ms: u64,

    /// Attempts per region, including the first.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Interface language sent to Google Trends.
    #[arg(long, default_value = DEFAULT_HL)]
    pub hl: String,

    /// Timezone offset in minutes sent to Google Trends.
    #[arg(long, default_value_t = DEFAULT_TZ_OFFSET_MINUTES, allow_hyphen_values = true)]
    pub tz: i32,

    /// How long a complete outcome stays cached (seconds, 0 disables).
    #[arg(long, default_value_t = 600)]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Args)]
pub struct TrendsArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the successful regions to CSV (one column per region).
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ReviewsCommand {
    /// Collect reviews for named locations from Google Places (needs PLACES_API_KEY).
    Collect(CollectArgs),
    /// Summarise a reviews CSV per location.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Location names as you would type them into Maps.
    #[arg(required = true)]
    pub locations: Vec<String>,

    /// Output CSV.
    #[arg(short = 'o', long, default_value = "reviews.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Reviews CSV (location,text,rating,timestamp[,author]).
    #[arg(value_name = "CSV")]
    pub path: PathBuf,

    /// Only this location.
    #[arg(long)]
    pub location: Option<String>,

    /// Only reviews with at least this many stars.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub min_rating: u8,
}

#[derive(Debug, Args)]
pub struct FiguresArgs {
    /// Figures CSV: first column labels, other columns numbers.
    #[arg(value_name = "CSV")]
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct TitleArgs {
    pub url: String,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Reviews CSV shown in the Reviews tab.
    #[arg(long)]
    pub reviews: Option<PathBuf>,

    /// Figures CSV shown in the Figures tab.
    #[arg(long)]
    pub figures: Option<PathBuf>,

    /// Do not fetch trends on startup (press `f` to fetch).
    #[arg(long)]
    pub no_fetch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trends_defaults_and_region_list() {
        let cli = Cli::parse_from(["tb", "trends", "-r", "DE-HH,DE-BY", "--timeframe", "3m"]);
        let Command::Trends(args) = cli.command else {
            panic!("expected trends");
        };
        assert_eq!(args.query.term, DEFAULT_TERM);
        assert_eq!(args.query.regions, vec!["DE-HH".to_string(), "DE-BY".to_string()]);
        assert_eq!(args.query.timeframe, Timeframe::ThreeMonths);
        assert_eq!(args.fetch.pacing_ms, 5_000);
        assert_eq!(args.fetch.max_attempts, 3);
    }

    #[test]
    fn negative_timezone_is_accepted() {
        let cli = Cli::parse_from(["tb", "dashboard", "--tz", "-300"]);
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.fetch.tz, -300);
        assert_eq!(args.query.regions.len(), DEFAULT_REGIONS.len());
    }

    #[test]
    fn min_rating_is_range_checked() {
        assert!(Cli::try_parse_from(["tb", "reviews", "show", "r.csv", "--min-rating", "6"]).is_err());
    }
}
