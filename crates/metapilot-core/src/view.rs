//! State containers behind the history and schedule pages.
//!
//! The views own filter state, the current page and the selected day, and
//! hand the pure functions in `filter`, `calendar` and `pager` their inputs.

use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::calendar::{index_events, tasks_for_day};
use crate::category::Category;
use crate::datetime::CalendarDay;
use crate::filter::{Selector, TaskFilter, TxFilter};
use crate::pager::{Page, Pager};
use crate::task::{Recurrence, ScheduledTask, TaskStatus};
use crate::transaction::{TransactionRecord, TxStatus};

/// Transaction history: filters plus a 1-based current page. Every filter
/// change sends the view back to page 1.
#[derive(Debug, Clone)]
pub struct HistoryView {
    filter: TxFilter,
    page: usize,
    pager: Pager,
    tz: Tz,
}

impl HistoryView {
    pub fn new(pager: Pager, tz: Tz) -> Self {
        Self {
            filter: TxFilter::default(),
            page: 1,
            pager,
            tz,
        }
    }

    pub fn filter(&self) -> &TxFilter {
        &self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.reset_page();
    }

    pub fn set_category(&mut self, category: Selector<Category>) {
        self.filter.category = category;
        self.reset_page();
    }

    pub fn set_network(&mut self, network: Selector<String>) {
        self.filter.network = network;
        self.reset_page();
    }

    pub fn set_date(&mut self, date: Option<CalendarDay>) {
        self.filter.date = date;
        self.reset_page();
    }

    pub fn set_status_tab(&mut self, status: Selector<TxStatus>) {
        self.filter.status = status;
        self.reset_page();
    }

    pub fn set_filter(&mut self, filter: TxFilter) {
        self.filter = filter;
        self.reset_page();
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(TxFilter::default());
    }

    /// Jumps to `page` as given. Pages past the end render empty.
    pub fn go_to(&mut self, page: usize) {
        self.page = page;
    }

    pub fn next_page(&mut self, records: &[TransactionRecord]) {
        let total = self.pager.total_pages(self.filtered(records).len());
        if self.page < total {
            self.page += 1;
        }
    }

    /// Steps back one page; from a page past the end, lands on the last page.
    pub fn prev_page(&mut self, records: &[TransactionRecord]) {
        let total = self.pager.total_pages(self.filtered(records).len());
        self.page = self.page.saturating_sub(1).min(total).max(1);
    }

    pub fn filtered<'a>(&self, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
        self.filter.apply(records, &self.tz)
    }

    pub fn visible<'a>(&self, records: &'a [TransactionRecord]) -> Page<&'a TransactionRecord> {
        let filtered = self.filtered(records);
        self.pager.page(&filtered, self.page)
    }

    fn reset_page(&mut self) {
        if self.page != 1 {
            debug!(from = self.page, "filter changed, resetting to first page");
        }
        self.page = 1;
    }
}

/// Task schedule: list filters, calendar events and the selected day.
#[derive(Debug, Clone)]
pub struct ScheduleView {
    filter: TaskFilter,
    selected_day: Option<CalendarDay>,
    tz: Tz,
}

impl ScheduleView {
    pub fn new(tz: Tz) -> Self {
        Self {
            filter: TaskFilter::default(),
            selected_day: None,
            tz,
        }
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn selected_day(&self) -> Option<CalendarDay> {
        self.selected_day
    }

    pub fn set_category(&mut self, category: Selector<Category>) {
        self.filter.category = category;
    }

    pub fn set_recurrence(&mut self, recurrence: Selector<Recurrence>) {
        self.filter.recurrence = recurrence;
    }

    pub fn set_status(&mut self, status: Selector<TaskStatus>) {
        self.filter.status = status;
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn select_day(&mut self, day: Option<CalendarDay>) {
        self.selected_day = day;
    }

    pub fn visible<'a>(&self, tasks: &'a [ScheduledTask]) -> Vec<&'a ScheduledTask> {
        self.filter.apply(tasks)
    }

    pub fn events<'a>(
        &self,
        tasks: &'a [ScheduledTask],
    ) -> BTreeMap<CalendarDay, Vec<&'a ScheduledTask>> {
        index_events(tasks, &self.tz)
    }

    /// Tasks of the selected day, earliest first; empty with no selection.
    pub fn agenda<'a>(&self, tasks: &'a [ScheduledTask]) -> Vec<&'a ScheduledTask> {
        match self.selected_day {
            Some(day) => tasks_for_day(tasks, day, &self.tz),
            None => Vec::new(),
        }
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn toggle(
        &self,
        tasks: &mut [ScheduledTask],
        id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<TaskStatus> {
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("scheduled task not found: {id}"))?;
        task.toggle(now, &self.tz)
    }
}
