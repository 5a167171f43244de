use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{CalendarDay, DatePattern, format_day, format_instant};
use crate::pager::Page;
use crate::stats::{HistorySummary, ScheduleSummary};
use crate::task::{ScheduledTask, TaskState};
use crate::transaction::{TransactionRecord, TxStatus};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config, tz: Tz) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self { color, tz })
    }

    #[tracing::instrument(skip_all, fields(page = page.number))]
    pub fn write_history_page<W: Write>(
        &self,
        mut out: W,
        page: &Page<&TransactionRecord>,
    ) -> anyhow::Result<()> {
        if page.total_items == 0 {
            writeln!(out, "No transactions match the current filters.")?;
            return Ok(());
        }

        let Some((first, last)) = page.showing() else {
            writeln!(
                out,
                "Page {} is past the end ({} pages, {} transactions).",
                page.number, page.total_pages, page.total_items
            )?;
            return Ok(());
        };

        let headers = vec![
            "Date".to_string(),
            "Type".to_string(),
            "Description".to_string(),
            "Status".to_string(),
            "Network".to_string(),
            "Gas".to_string(),
            "Saved".to_string(),
            "Hash".to_string(),
        ];

        let mut rows = Vec::with_capacity(page.items.len());
        let mut notes = Vec::new();

        for record in &page.items {
            let saved = match record.savings_percent() {
                Some(pct) if record.saved_gas > 0.0 => {
                    format!("{:.4} ({pct:.0}%)", record.saved_gas)
                }
                _ => "-".to_string(),
            };

            rows.push(vec![
                self.paint(
                    &format_instant(record.date, DatePattern::LongWithTime, &self.tz),
                    "2",
                ),
                record.category.label().to_string(),
                record.description.clone(),
                self.paint_status(record.status()),
                record.network.clone(),
                format!("{:.4}", record.gas),
                saved,
                record.short_hash(),
            ]);

            if let Some(error) = record.error() {
                notes.push(format!("{}: {}", record.id, self.paint(error, "31")));
            } else if let Some(reason) = record.pending_reason() {
                notes.push(format!("{}: {}", record.id, self.paint(reason, "33")));
            }
        }

        write_table(&mut out, headers, rows)?;
        for note in notes {
            writeln!(out, "  {note}")?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "Showing {first}-{last} of {} transactions (page {}/{})",
            page.total_items, page.number, page.total_pages
        )?;

        let mut nav = Vec::new();
        if page.has_previous() {
            nav.push(format!("previous: history page:{}", page.number - 1));
        }
        if page.has_next() {
            nav.push(format!("next: history page:{}", page.number + 1));
        }
        if !nav.is_empty() {
            writeln!(out, "{}", self.paint(&nav.join("  "), "2"))?;
        }
        Ok(())
    }

    pub fn write_history_summary<W: Write>(
        &self,
        mut out: W,
        summary: &HistorySummary,
    ) -> anyhow::Result<()> {
        writeln!(out, "transactions  {}", summary.total)?;
        writeln!(
            out,
            "succeeded     {}",
            self.paint(&summary.succeeded.to_string(), "32")
        )?;
        writeln!(
            out,
            "pending       {}",
            self.paint(&summary.pending.to_string(), "33")
        )?;
        writeln!(
            out,
            "failed        {}",
            self.paint(&summary.failed.to_string(), "31")
        )?;
        writeln!(out, "success rate  {}%", summary.success_rate)?;
        writeln!(out, "gas saved     {:.4}", summary.saved_gas)?;
        Ok(())
    }

    pub fn write_schedule_summary<W: Write>(
        &self,
        mut out: W,
        summary: &ScheduleSummary,
    ) -> anyhow::Result<()> {
        writeln!(out, "tasks         {}", summary.total)?;
        writeln!(out, "active        {}", summary.active)?;
        writeln!(out, "paused        {}", summary.paused)?;
        let next = summary
            .next_run
            .map(|at| format_instant(at, DatePattern::LongWithTime, &self.tz))
            .unwrap_or_else(|| "-".to_string());
        writeln!(out, "next run      {next}")?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
    pub fn write_schedule<W: Write>(
        &self,
        mut out: W,
        tasks: &[&ScheduledTask],
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No scheduled tasks match the current filters.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Type".to_string(),
            "Schedule".to_string(),
            "Status".to_string(),
            "Next run".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let (status, next) = match task.state {
                    TaskState::Active { next_execution } => (
                        self.paint("active", "32"),
                        format_instant(next_execution, DatePattern::LongWithTime, &self.tz),
                    ),
                    TaskState::Paused => (self.paint("paused", "33"), "-".to_string()),
                };
                vec![
                    self.paint(&task.id, "36"),
                    task.name.clone(),
                    task.category.label().to_string(),
                    task.schedule.describe(),
                    status,
                    next,
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Tasks of one day, already in time order.
    pub fn write_agenda<W: Write>(
        &self,
        mut out: W,
        day: CalendarDay,
        tasks: &[&ScheduledTask],
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&format_day(day, DatePattern::Long), "1"))?;
        if tasks.is_empty() {
            writeln!(out, "  no tasks scheduled")?;
            return Ok(());
        }

        for task in tasks {
            let at = task
                .next_execution()
                .map(|at| format_instant(at, DatePattern::Time, &self.tz))
                .unwrap_or_default();
            writeln!(
                out,
                "  {:>8}  {}  [{}]  {}",
                at,
                task.name,
                task.category.label(),
                self.paint(&task.id, "36")
            )?;
        }
        Ok(())
    }

    /// Month grid, Monday first. Days with events carry their count.
    pub fn write_month<W: Write>(
        &self,
        mut out: W,
        year: i32,
        month: u32,
        counts: &BTreeMap<CalendarDay, usize>,
    ) -> anyhow::Result<()> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| anyhow!("invalid month: {year}-{month:02}"))?;

        writeln!(
            out,
            "{}",
            self.paint(&format_day(CalendarDay::from_date(first), DatePattern::MonthYear), "1")
        )?;
        writeln!(out, "Mo    Tu    We    Th    Fr    Sa    Su")?;

        let lead = first.weekday().num_days_from_monday() as usize;
        let mut cells: Vec<String> = vec![String::new(); lead];
        for date in first.iter_days().take_while(|date| date.month() == month) {
            let cell = match counts.get(&CalendarDay::from_date(date)) {
                Some(count) => self.paint(&format!("{}[{count}]", date.day()), "36"),
                None => date.day().to_string(),
            };
            cells.push(cell);
        }

        for week in cells.chunks(7) {
            let line = week
                .iter()
                .map(|cell| {
                    let width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                    format!("{cell}{}", " ".repeat(6usize.saturating_sub(width)))
                })
                .collect::<String>();
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    fn paint_status(&self, status: TxStatus) -> String {
        let code = match status {
            TxStatus::Succeeded => "32",
            TxStatus::Pending => "33",
            TxStatus::Failed => "31",
        };
        self.paint(status.as_key(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(widths.iter().copied()) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in widths.iter().copied() {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
