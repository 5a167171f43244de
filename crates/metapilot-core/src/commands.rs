use std::io::{self, Write};
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::calendar::month_counts;
use crate::category::Category;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{CalendarDay, parse_day_expr, parse_month_expr};
use crate::filter::{TaskFilter, TxFilter};
use crate::pager::Pager;
use crate::provider::DataProvider;
use crate::render::Renderer;
use crate::seed::SeedData;
use crate::stats::{HistorySummary, ScheduleSummary};
use crate::task::ScheduledTask;
use crate::view::{HistoryView, ScheduleView};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "history", "schedule", "calendar", "toggle", "stats", "export", "init", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if token.is_empty() {
        return None;
    }
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv, tz))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    tz: Tz,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        "dispatching command"
    );

    match command {
        "history" => cmd_history(
            resolve_provider(store)?,
            cfg,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
        ),
        "schedule" => cmd_schedule(resolve_provider(store)?, renderer, &inv.filter_terms, tz),
        "calendar" => cmd_calendar(
            resolve_provider(store)?,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
        ),
        "toggle" => cmd_toggle(store, &inv.filter_terms, &inv.command_args, now, tz),
        "stats" => cmd_stats(resolve_provider(store)?, renderer),
        "export" => cmd_export(
            resolve_provider(store)?,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
        ),
        "init" => cmd_init(store, &inv.command_args),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// The datastore, or the built-in seed tables while the store is empty.
fn resolve_provider(store: &DataStore) -> anyhow::Result<&dyn DataProvider> {
    if store.is_empty()? {
        warn!(
            data_dir = %store.data_dir.display(),
            "datastore is empty; showing seed data (run `metapilot init` to persist it)"
        );
        return Ok(&SeedData);
    }
    Ok(store)
}

#[instrument(skip(provider, cfg, renderer, filter_terms, args, now, tz))]
fn cmd_history(
    provider: &dyn DataProvider,
    cfg: &Config,
    renderer: &Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command history");

    let records = provider.list_transactions()?;
    let filter = TxFilter::parse(filter_terms, now, &tz)?;
    let page = parse_page_arg(args)?;
    if !filter.is_default() {
        debug!(?filter, "history narrowed by filter");
    }

    let mut view = HistoryView::new(Pager::new(cfg.page_size()?), tz);
    view.set_filter(filter);
    view.go_to(page);

    let visible = view.visible(&records);
    debug!(
        total = visible.total_items,
        pages = visible.total_pages,
        page,
        "history page computed"
    );
    renderer.write_history_page(io::stdout().lock(), &visible)
}

#[instrument(skip(provider, renderer, filter_terms, tz))]
fn cmd_schedule(
    provider: &dyn DataProvider,
    renderer: &Renderer,
    filter_terms: &[String],
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command schedule");

    let tasks = provider.list_scheduled_tasks()?;
    let mut view = ScheduleView::new(tz);
    view.set_filter(TaskFilter::parse(filter_terms)?);

    renderer.write_schedule(io::stdout().lock(), &view.visible(&tasks))
}

#[instrument(skip(provider, renderer, filter_terms, args, now, tz))]
fn cmd_calendar(
    provider: &dyn DataProvider,
    renderer: &Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command calendar");

    let all = provider.list_scheduled_tasks()?;
    let mut view = ScheduleView::new(tz);
    view.set_filter(TaskFilter::parse(filter_terms)?);
    let tasks: Vec<ScheduledTask> = view.visible(&all).into_iter().cloned().collect();

    let target = parse_calendar_arg(args, now, &tz)?;
    let (year, month) = match target {
        CalendarTarget::Month(year, month) => (year, month),
        CalendarTarget::Day(day) => {
            view.select_day(Some(day));
            (day.year(), day.month())
        }
    };

    let counts = month_counts(&tasks, year, month, &tz);
    let mut out = io::stdout().lock();
    renderer.write_month(&mut out, year, month, &counts)?;

    if let Some(day) = view.selected_day() {
        writeln!(out)?;
        renderer.write_agenda(&mut out, day, &view.agenda(&tasks))?;
    }
    Ok(())
}

#[instrument(skip(store, filter_terms, args, now, tz))]
fn cmd_toggle(
    store: &DataStore,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command toggle");

    if !filter_terms.is_empty() {
        warn!(filter = ?filter_terms, "toggle ignores filter terms");
    }
    let id = match args {
        [id] => id.as_str(),
        [] => return Err(anyhow!("toggle requires a task id")),
        _ => return Err(anyhow!("toggle takes exactly one task id")),
    };

    if store.is_empty()? {
        return Err(anyhow!(
            "datastore at {} is empty; run `metapilot init` first",
            store.data_dir.display()
        ));
    }

    let mut tasks = store.load_scheduled_tasks()?;
    let status = ScheduleView::new(tz).toggle(&mut tasks, id, now)?;
    store
        .save_scheduled_tasks(&tasks)
        .with_context(|| format!("failed to persist toggle of {id}"))?;

    info!(id, status = %status, "task toggled");
    println!("{id} is now {status}");
    Ok(())
}

#[instrument(skip(provider, renderer))]
fn cmd_stats(provider: &dyn DataProvider, renderer: &Renderer) -> anyhow::Result<()> {
    info!("command stats");

    let records = provider.list_transactions()?;
    let tasks = provider.list_scheduled_tasks()?;

    let mut out = io::stdout().lock();
    renderer.write_history_summary(&mut out, &HistorySummary::compute(&records))?;
    writeln!(out)?;
    renderer.write_schedule_summary(&mut out, &ScheduleSummary::compute(&tasks))?;
    Ok(())
}

#[instrument(skip(provider, filter_terms, args, now, tz))]
fn cmd_export(
    provider: &dyn DataProvider,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command export");

    let range = parse_export_range(args)?;
    let records = provider.list_transactions()?;
    let filter = TxFilter::parse(filter_terms, now, &tz)?;
    let since = range.since(now);

    let rows: Vec<_> = filter
        .apply(&records, &tz)
        .into_iter()
        .filter(|record| since.is_none_or(|start| record.date >= start))
        .collect();

    debug!(count = rows.len(), ?range, "exporting transactions");
    let out = serde_json::to_string(&rows)?;
    println!("{out}");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_init(store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command init");

    let force = args.iter().any(|arg| arg == "force");
    if !store.is_empty()? && !force {
        return Err(anyhow!(
            "datastore at {} already has data; use `metapilot init force` to overwrite it",
            store.data_dir.display()
        ));
    }

    let (records, tasks) = store.seed(&SeedData)?;
    println!(
        "Seeded {records} transactions and {tasks} scheduled tasks into {}",
        store.data_dir.display()
    );
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "usage: metapilot [-v|-q] [--rc KEY=VALUE] [--config PATH] [--data DIR] [FILTER...] COMMAND [ARGS...]"
    )?;
    writeln!(out)?;
    writeln!(out, "commands:")?;
    writeln!(out, "  history [page:N]          paged transaction history")?;
    writeln!(out, "  schedule                  scheduled tasks")?;
    writeln!(out, "  calendar [DAY|YYYY-MM]    month grid and day agenda")?;
    writeln!(out, "  toggle ID                 pause or resume a task")?;
    writeln!(out, "  stats                     summary counts")?;
    writeln!(out, "  export [range:R]          transactions as JSON (all, last7, last30, last90)")?;
    writeln!(out, "  init [force]              seed the datastore")?;
    writeln!(out)?;
    writeln!(out, "history filters: search:TEXT category:KIND network:NAME date:DAY status:TAB")?;
    writeln!(out, "schedule filters: category:KIND recurrence:EVERY status:active|paused")?;
    let kinds: Vec<&str> = Category::ALL.iter().map(Category::as_key).collect();
    writeln!(out, "kinds: {}", kinds.join(", "))?;
    Ok(())
}

/// `page:N`, 1-based. Defaults to the first page.
fn parse_page_arg(args: &[String]) -> anyhow::Result<usize> {
    let mut page = 1;
    for arg in args {
        let Some(raw) = arg.strip_prefix("page:") else {
            return Err(anyhow!("unexpected history argument: {arg}"));
        };
        page = raw
            .parse::<usize>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| anyhow!("page must be a positive integer, got: {raw}"))?;
    }
    Ok(page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalendarTarget {
    Month(i32, u32),
    Day(CalendarDay),
}

/// No argument selects today. `YYYY-MM` shows a month without an agenda.
fn parse_calendar_arg(
    args: &[String],
    now: DateTime<Utc>,
    tz: &Tz,
) -> anyhow::Result<CalendarTarget> {
    match args {
        [] => Ok(CalendarTarget::Day(CalendarDay::of(now, tz))),
        [arg] => {
            if let Ok((year, month)) = parse_month_expr(arg) {
                return Ok(CalendarTarget::Month(year, month));
            }
            Ok(CalendarTarget::Day(parse_day_expr(arg, now, tz)?))
        }
        _ => Err(anyhow!("calendar takes at most one day or month")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ExportRange {
    #[default]
    All,
    Last7,
    Last30,
    Last90,
}

impl ExportRange {
    fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Self::All => return None,
            Self::Last7 => 7,
            Self::Last30 => 30,
            Self::Last90 => 90,
        };
        Some(now - Duration::days(days))
    }
}

impl FromStr for ExportRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "last7" => Ok(Self::Last7),
            "last30" => Ok(Self::Last30),
            "last90" => Ok(Self::Last90),
            other => Err(anyhow!(
                "unknown export range: {other} (expected all, last7, last30, last90)"
            )),
        }
    }
}

fn parse_export_range(args: &[String]) -> anyhow::Result<ExportRange> {
    let mut range = ExportRange::default();
    for arg in args {
        let raw = arg
            .strip_prefix("range:")
            .ok_or_else(|| anyhow!("unexpected export argument: {arg}"))?;
        range = raw.parse()?;
    }
    Ok(range)
}
