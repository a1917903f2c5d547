//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - runs the requested command (trends, reviews, figures, title, dashboard)
//! - prints reports/plots and writes optional exports

use clap::Parser;
use log::{info, warn};

use crate::cli::{CollectArgs, Command, FiguresArgs, ReviewsCommand, ShowArgs, TitleArgs, TrendsArgs};
use crate::error::AppError;
use crate::logging::{LogTarget, setup_logging};
use crate::report::{ReviewFilter, summarize_reviews};

pub mod pipeline;

/// Entry point for the `tb` binary.
pub fn run() -> Result<(), AppError> {
    // `tb` and `tb --term X` behave like `tb dashboard ...`. Clap requires a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let target = match cli.command {
        Command::Dashboard(_) => LogTarget::FileOnly,
        _ => LogTarget::Console,
    };
    setup_logging(target)?;

    match cli.command {
        Command::Trends(args) => handle_trends(args),
        Command::Reviews(ReviewsCommand::Collect(args)) => handle_collect(args),
        Command::Reviews(ReviewsCommand::Show(args)) => handle_show(args),
        Command::Figures(args) => handle_figures(args),
        Command::Title(args) => handle_title(args),
        Command::Dashboard(args) => crate::tui::run(args),
    }
}

fn handle_trends(args: TrendsArgs) -> Result<(), AppError> {
    let query = pipeline::query_from_args(&args.query)?;
    let config = pipeline::fetch_config_from_args(&args.fetch);
    let mut fetcher = pipeline::build_fetcher(&config)?;

    let outcome = fetcher.fetch(&query);
    println!("{}", crate::report::format_trends_summary(&query, &outcome));

    if outcome.series.is_empty() {
        return Err(AppError::no_data(format!(
            "No region returned data for '{}'.",
            query.term()
        )));
    }

    if !args.no_plot {
        println!(
            "{}",
            crate::plot::render_trend_plot(&outcome.series, args.width, args.height)
        );
    }

    if let Some(path) = &args.export {
        crate::io::export::write_trends_csv(path, &outcome)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_collect(args: CollectArgs) -> Result<(), AppError> {
    let client = crate::places::PlacesClient::from_env()?;
    let outcome = client.collect_reviews(&args.locations);
    println!("{}", crate::report::format_collect_summary(&outcome));

    if outcome.rows.is_empty() {
        return Err(AppError::no_data("No reviews collected."));
    }
    crate::io::export::write_reviews_csv(&args.out, &outcome.rows)?;
    println!("Saved {} review(s) to {}", outcome.rows.len(), args.out.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let loaded = crate::io::reviews::load_reviews(&args.path)?;
    print!("{}", crate::report::format_review_ingest(&loaded));

    let filter = ReviewFilter {
        location: args.location,
        min_rating: args.min_rating,
    };
    let kept = filter.apply(&loaded.rows);
    if kept.is_empty() {
        warn!("filter matched no reviews");
        return Err(AppError::no_data("No reviews match the filter."));
    }

    println!();
    println!("{}", crate::report::format_review_summary(&summarize_reviews(kept)));
    Ok(())
}

fn handle_figures(args: FiguresArgs) -> Result<(), AppError> {
    let table = crate::io::figures::load_figures(&args.path)?;
    println!("{}", crate::report::format_figures(&table));
    Ok(())
}

fn handle_title(args: TitleArgs) -> Result<(), AppError> {
    match crate::scrape::page_title(&args.url)? {
        Some(title) => println!("{title}"),
        None => return Err(AppError::no_data(format!("'{}' has no <title>.", args.url))),
    }
    Ok(())
}

/// Rewrite argv so `tb` defaults to `tb dashboard`.
///
/// Rules:
/// - `tb`                      -> `tb dashboard`
/// - `tb --term X ...`         -> `tb dashboard --term X ...`
/// - `tb --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "trends" | "reviews" | "figures" | "title" | "dashboard"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "dashboard flags".
    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
