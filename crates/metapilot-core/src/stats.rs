use chrono::{DateTime, Utc};

use crate::task::ScheduledTask;
use crate::transaction::{TransactionRecord, TxStatus};

/// Summary cards of the history page, over the unfiltered set.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    pub succeeded: usize,
    pub pending: usize,
    pub failed: usize,
    /// Rounded percentage of succeeded records; 0 when there are none.
    pub success_rate: u32,
    pub saved_gas: f64,
}

impl HistorySummary {
    pub fn compute(records: &[TransactionRecord]) -> Self {
        let count = |status: TxStatus| records.iter().filter(|r| r.status() == status).count();

        let total = records.len();
        let succeeded = count(TxStatus::Succeeded);
        let success_rate = if total == 0 {
            0
        } else {
            (succeeded as f64 / total as f64 * 100.0).round() as u32
        };

        Self {
            total,
            succeeded,
            pending: count(TxStatus::Pending),
            failed: count(TxStatus::Failed),
            success_rate,
            saved_gas: records.iter().map(|r| r.saved_gas).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSummary {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub next_run: Option<DateTime<Utc>>,
}

impl ScheduleSummary {
    pub fn compute(tasks: &[ScheduledTask]) -> Self {
        let active = tasks.iter().filter(|t| t.is_active()).count();
        Self {
            total: tasks.len(),
            active,
            paused: tasks.len() - active,
            next_run: tasks.iter().filter_map(ScheduledTask::next_execution).min(),
        }
    }
}
