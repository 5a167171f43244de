use crate::task::ScheduledTask;
use crate::transaction::TransactionRecord;

/// Source of the records the history and schedule views work on.
pub trait DataProvider {
    fn list_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>>;

    fn list_scheduled_tasks(&self) -> anyhow::Result<Vec<ScheduledTask>>;
}
