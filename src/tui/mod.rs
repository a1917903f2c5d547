//! Ratatui-based dashboard.
//!
//! Three tabs: search interest per region (Plotters chart), reviews (filtered
//! table with per-location averages) and financial figures. Fetching is
//! blocking; a status line is drawn before the call so the user sees that the
//! board is waiting on the network.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
};

use crate::app::pipeline::{self, BoardFetcher};
use crate::cli::DashboardArgs;
use crate::domain::{FetchOutcome, FiguresTable, ReviewRow, Timeframe, TrendQuery, TrendSeries};
use crate::error::AppError;
use crate::io::reviews::LoadedReviews;
use crate::plot::ascii::day_number;
use crate::report::format::truncate;
use crate::report::{ReviewFilter, summarize_reviews};

mod plotters_chart;

use plotters_chart::{ChartLine, PALETTE, TrendPlottersChart};

/// Start the dashboard.
pub fn run(args: DashboardArgs) -> Result<(), AppError> {
    // Reject a bad term/region list before taking over the terminal.
    pipeline::query_from_args(&args.query)?;
    let config = pipeline::fetch_config_from_args(&args.fetch);
    let fetcher = pipeline::build_fetcher(&config)?;
    let mut app = App::new(&args, fetcher);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    if !args.no_fetch {
        app.fetch(&mut terminal, false)?;
    }
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Trends,
    Reviews,
    Figures,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Trends, Tab::Reviews, Tab::Figures];

    fn title(self) -> &'static str {
        match self {
            Tab::Trends => "Trends",
            Tab::Reviews => "Reviews",
            Tab::Figures => "Figures",
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Trends => 0,
            Tab::Reviews => 1,
            Tab::Figures => 2,
        }
    }

    fn next(self) -> Self {
        match self {
            Tab::Trends => Tab::Reviews,
            Tab::Reviews => Tab::Figures,
            Tab::Figures => Tab::Trends,
        }
    }
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Fetch { bypass_cache: bool },
}

/// Loaded reviews plus the active filter.
#[derive(Debug, Default)]
struct ReviewsView {
    loaded: Option<LoadedReviews>,
    locations: Vec<String>,
    filter: ReviewFilter,
}

impl ReviewsView {
    fn new(loaded: Option<LoadedReviews>) -> Self {
        let locations = loaded.as_ref().map(LoadedReviews::locations).unwrap_or_default();
        Self {
            loaded,
            locations,
            filter: ReviewFilter {
                location: None,
                min_rating: 1,
            },
        }
    }

    /// All locations -> first -> ... -> last -> all locations.
    fn cycle_location(&mut self) {
        let next = match &self.filter.location {
            None => self.locations.first(),
            Some(current) => self
                .locations
                .iter()
                .position(|l| l == current)
                .and_then(|idx| self.locations.get(idx + 1)),
        };
        self.filter.location = next.cloned();
    }

    fn raise_min_rating(&mut self) {
        self.filter.min_rating = (self.filter.min_rating + 1).min(5);
    }

    fn lower_min_rating(&mut self) {
        self.filter.min_rating = self.filter.min_rating.saturating_sub(1).max(1);
    }

    fn visible(&self) -> Vec<&ReviewRow> {
        match &self.loaded {
            Some(loaded) => self.filter.apply(&loaded.rows),
            None => Vec::new(),
        }
    }

    fn location_label(&self) -> &str {
        self.filter.location.as_deref().unwrap_or("all")
    }
}

struct App {
    tab: Tab,
    term: String,
    regions: Vec<String>,
    timeframe: Timeframe,
    /// `Some` while the term is being edited.
    term_input: Option<String>,
    fetcher: BoardFetcher,
    last: Option<(TrendQuery, FetchOutcome)>,
    reviews: ReviewsView,
    figures: Option<FiguresTable>,
    status: String,
}

impl App {
    fn new(args: &DashboardArgs, fetcher: BoardFetcher) -> Self {
        let mut problems = Vec::new();

        let reviews = args.reviews.as_deref().and_then(|path| {
            crate::io::reviews::load_reviews(path)
                .inspect(|loaded| {
                    info!("loaded {} review(s) from {}", loaded.rows.len(), path.display());
                })
                .map_err(|e| {
                    warn!("reviews not loaded: {e}");
                    problems.push(format!("reviews: {e}"));
                })
                .ok()
        });
        let figures = args.figures.as_deref().and_then(|path| {
            crate::io::figures::load_figures(path)
                .map_err(|e| {
                    warn!("figures not loaded: {e}");
                    problems.push(format!("figures: {e}"));
                })
                .ok()
        });

        let status = if problems.is_empty() {
            "Ready.".to_string()
        } else {
            problems.join(" | ")
        };

        Self {
            tab: Tab::Trends,
            term: args.query.term.trim().to_string(),
            regions: args.query.regions.clone(),
            timeframe: args.query.timeframe,
            term_input: None,
            fetcher,
            last: None,
            reviews: ReviewsView::new(reviews),
            figures,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.handle_key(key.code) {
                        Action::Quit => break,
                        Action::Fetch { bypass_cache } => self.fetch(terminal, bypass_cache)?,
                        Action::None => {}
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        if self.term_input.is_some() {
            return self.handle_term_edit(code);
        }

        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('/') => {
                self.term_input = Some(self.term.clone());
                self.status = "Editing term. Enter to fetch, Esc to cancel.".to_string();
            }
            KeyCode::Char('t') => {
                self.timeframe = self.timeframe.next();
                self.status = format!("timeframe: {} (f to fetch)", self.timeframe.display_name());
            }
            KeyCode::Char('f') => return Action::Fetch { bypass_cache: false },
            KeyCode::Char('F') => return Action::Fetch { bypass_cache: true },
            KeyCode::Char('l') => {
                self.reviews.cycle_location();
                self.status = format!("location: {}", self.reviews.location_label());
            }
            KeyCode::Char('+') => {
                self.reviews.raise_min_rating();
                self.status = format!("min rating: {}", self.reviews.filter.min_rating);
            }
            KeyCode::Char('-') => {
                self.reviews.lower_min_rating();
                self.status = format!("min rating: {}", self.reviews.filter.min_rating);
            }
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
        Action::None
    }

    fn handle_term_edit(&mut self, code: KeyCode) -> Action {
        let Some(input) = self.term_input.as_mut() else {
            return Action::None;
        };
        match code {
            KeyCode::Esc => {
                self.term_input = None;
                self.status = "Term edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let term = input.trim().to_string();
                self.term_input = None;
                if term.is_empty() {
                    self.status = "Search term must not be empty.".to_string();
                } else {
                    self.term = term;
                    return Action::Fetch { bypass_cache: false };
                }
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
        Action::None
    }

    fn fetch<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        bypass_cache: bool,
    ) -> Result<(), AppError> {
        let query = match TrendQuery::new(self.term.as_str(), self.regions.iter().map(String::as_str), self.timeframe) {
            Ok(query) => query,
            Err(e) => {
                self.status = e.message().to_string();
                return Ok(());
            }
        };

        self.tab = Tab::Trends;
        self.status = format!(
            "Fetching '{}' ({}) for {} region(s)...",
            query.term(),
            query.timeframe().display_name(),
            query.distinct_regions().len()
        );
        terminal
            .draw(|f| self.draw(f))
            .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;

        let outcome = if bypass_cache {
            self.fetcher.refresh(&query)
        } else {
            self.fetcher.fetch(&query)
        };

        let requested = query.distinct_regions().len();
        self.status = if outcome.is_complete() {
            format!("Fetched {requested} region(s).")
        } else {
            format!(
                "Fetched {} of {requested} region(s); {} failed.",
                outcome.series.len(),
                outcome.failed_regions.len()
            )
        };
        self.last = Some((query, outcome));
        Ok(())
    }

    fn export(&mut self) {
        let result = match self.tab {
            Tab::Trends => match &self.last {
                Some((query, outcome)) => {
                    let path = export_path("trends", query.term(), Some(query.timeframe()));
                    crate::io::export::write_trends_csv(&path, outcome).map(|_| path)
                }
                None => {
                    self.status = "Nothing to export yet (press f).".to_string();
                    return;
                }
            },
            Tab::Reviews => {
                if self.reviews.loaded.is_none() {
                    self.status = "No reviews loaded.".to_string();
                    return;
                }
                let rows: Vec<ReviewRow> = self.reviews.visible().into_iter().cloned().collect();
                let path = export_path("reviews", self.reviews.location_label(), None);
                crate::io::export::write_reviews_csv(&path, &rows).map(|_| path)
            }
            Tab::Figures => match &self.figures {
                Some(table) => {
                    let path = export_path("figures", &table.label_header, None);
                    crate::io::export::write_figures_csv(&path, table).map(|_| path)
                }
                None => {
                    self.status = "No figures loaded.".to_string();
                    return;
                }
            },
        };

        self.status = match result {
            Ok(path) => {
                info!("exported {}", path.display());
                format!("Exported {}", path.display())
            }
            Err(e) => format!("Export failed: {e}"),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        match self.tab {
            Tab::Trends => self.draw_trends(frame, chunks[1]),
            Tab::Reviews => self.draw_reviews(frame, chunks[1]),
            Tab::Figures => self.draw_figures(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(" tb ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
            .select(self.tab.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, rows[0]);

        let term = match &self.term_input {
            Some(input) => Span::styled(format!("term: {input}_"), Style::default().fg(Color::Yellow)),
            None => Span::raw(format!("term: {}", self.term)),
        };
        let info = Line::from(vec![
            term,
            Span::styled(
                format!(
                    " | timeframe: {} | regions: {}",
                    self.timeframe.display_name(),
                    self.regions.join(",")
                ),
                Style::default().fg(Color::Gray),
            ),
        ]);
        frame.render_widget(Paragraph::new(info), rows[1]);
    }

    fn draw_trends(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some((query, outcome)) = &self.last else {
            render_hint(frame, area, "Search interest", "Press f to fetch search interest.");
            return;
        };

        let mut constraints = Vec::new();
        if !outcome.errors.is_empty() {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(0));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        if !outcome.errors.is_empty() {
            let failed: Vec<String> = outcome
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.region, e.kind.label()))
                .collect();
            let banner = Paragraph::new(format!(
                "No data for {} region(s): {}. Showing the rest.",
                failed.len(),
                failed.join(", ")
            ))
            .style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" warning "));
            frame.render_widget(banner, chunks[0]);
        }
        let chart_area = chunks[chunks.len() - 1];

        let title = format!(" {} | {} ", query.term(), query.timeframe().display_name());
        let Some(data) = chart_data(&outcome.series) else {
            render_hint(frame, chart_area, &title, "No region returned data for this term.");
            return;
        };

        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(chart_area);
        frame.render_widget(block, chart_area);
        frame.render_widget(Clear, inner);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let widget = TrendPlottersChart {
            lines: data
                .lines
                .iter()
                .enumerate()
                .map(|(idx, (_, segments))| ChartLine {
                    segments,
                    color: PALETTE[idx % PALETTE.len()],
                })
                .collect(),
            x_bounds: data.x_bounds,
            y_bounds: [0.0, 100.0],
            y_label: "interest",
            fmt_x: fmt_axis_date,
        };
        frame.render_widget(widget, parts[0]);

        let legend: Vec<Span> = data
            .lines
            .iter()
            .enumerate()
            .map(|(idx, (region, _))| {
                let (r, g, b) = PALETTE[idx % PALETTE.len()];
                Span::styled(format!("■ {region}  "), Style::default().fg(Color::Rgb(r, g, b)))
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(legend)), parts[1]);
    }

    fn draw_reviews(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(loaded) = &self.reviews.loaded else {
            render_hint(frame, area, "Reviews", "No reviews loaded. Start with --reviews <CSV>.");
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        let visible = self.reviews.visible();
        let rows: Vec<Row> = visible
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(r.timestamp.format("%Y-%m-%d").to_string()),
                    Cell::from(truncate(&r.location, 24)),
                    Cell::from(format!("{:<5}", "*".repeat(usize::from(r.rating)))),
                    Cell::from(truncate(&r.author, 14)),
                    Cell::from(r.text.replace('\n', " ")),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(10),
                Constraint::Length(24),
                Constraint::Length(5),
                Constraint::Length(14),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec!["date", "location", "stars", "author", "text"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} of {} review(s) | location: {} | min {}* ",
            visible.len(),
            loaded.rows.len(),
            self.reviews.location_label(),
            self.reviews.filter.min_rating
        )));
        frame.render_widget(table, chunks[0]);

        let summary_rows: Vec<Row> = summarize_reviews(visible.iter().copied())
            .into_iter()
            .map(|s| {
                Row::new(vec![
                    truncate(&s.location, 24),
                    s.count.to_string(),
                    format!("{:.2}", s.average_rating),
                ])
            })
            .collect();
        let summary = Table::new(
            summary_rows,
            [Constraint::Min(12), Constraint::Length(5), Constraint::Length(5)],
        )
        .header(
            Row::new(vec!["location", "n", "avg"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(" per location "));
        frame.render_widget(summary, chunks[1]);
    }

    fn draw_figures(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(table) = &self.figures else {
            render_hint(frame, area, "Figures", "No figures loaded. Start with --figures <CSV>.");
            return;
        };

        let fmt = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());

        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .map(|r| {
                let mut cells = vec![Cell::from(r.label.clone())];
                cells.extend(r.values.iter().map(|v| Cell::from(Text::from(fmt(*v)).right_aligned())));
                Row::new(cells)
            })
            .collect();
        let mut totals = vec![Cell::from("total")];
        totals.extend(
            table
                .column_totals()
                .into_iter()
                .map(|v| Cell::from(Text::from(fmt(v)).right_aligned())),
        );
        rows.push(Row::new(totals).style(Style::default().add_modifier(Modifier::BOLD)));

        let mut widths = vec![Constraint::Length(16)];
        widths.extend(table.columns.iter().map(|_| Constraint::Length(14)));

        let mut header = vec![table.label_header.clone()];
        header.extend(table.columns.iter().cloned());

        let widget = Table::new(rows, widths)
            .header(Row::new(header).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title(" Figures "));
        frame.render_widget(widget, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab tabs  / term  t timeframe  f fetch  F refetch  l location  +/- rating  e export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn render_hint(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, message: &str) {
    let p = Paragraph::new(message)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().title(format!(" {} ", title.trim())).borders(Borders::ALL));
    frame.render_widget(p, area);
}

/// Chart-ready series: per region, contiguous runs of present samples.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    lines: Vec<(String, Vec<Vec<(f64, f64)>>)>,
    x_bounds: [f64; 2],
}

/// `None` when no region has any sample date.
fn chart_data(series: &TrendSeries) -> Option<ChartData> {
    let dates = series.date_grid();
    let x0 = day_number(*dates.first()?);
    let x1 = day_number(*dates.last()?).max(x0 + 1.0);

    let lines = series
        .iter()
        .map(|region| {
            let mut segments = Vec::new();
            let mut current = Vec::new();
            for p in &region.points {
                match p.interest {
                    Some(v) => current.push((day_number(p.date), f64::from(v))),
                    None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                    None => {}
                }
            }
            if !current.is_empty() {
                segments.push(current);
            }
            (region.region.clone(), segments)
        })
        .collect();

    Some(ChartData {
        lines,
        x_bounds: [x0, x1],
    })
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%d.%m.%y").to_string())
        .unwrap_or_default()
}

/// `trends_kaspar-schmauser_5y.csv` style file name in the working directory.
fn export_path(kind: &str, label: &str, timeframe: Option<Timeframe>) -> PathBuf {
    let mut slug = String::new();
    for ch in label.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "export" } else { slug };

    let name = match timeframe {
        Some(tf) => format!("{kind}_{slug}_{}.csv", timeframe_tag(tf)),
        None => format!("{kind}_{slug}.csv"),
    };
    PathBuf::from(name)
}

fn timeframe_tag(tf: Timeframe) -> &'static str {
    match tf {
        Timeframe::FiveYears => "5y",
        Timeframe::TwelveMonths => "12m",
        Timeframe::ThreeMonths => "3m",
    }
}
