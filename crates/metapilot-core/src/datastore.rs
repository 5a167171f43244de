use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::provider::DataProvider;
use crate::task::ScheduledTask;
use crate::transaction::TransactionRecord;

/// Data directory with one JSON object per line per collection.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub transactions_path: PathBuf,
    pub schedule_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let transactions_path = data_dir.join("transactions.data");
        let schedule_path = data_dir.join("schedule.data");

        if !transactions_path.exists() {
            fs::write(&transactions_path, "")?;
        }
        if !schedule_path.exists() {
            fs::write(&schedule_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            transactions = %transactions_path.display(),
            schedule = %schedule_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            transactions_path,
            schedule_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>> {
        load_jsonl(&self.transactions_path).context("failed to load transactions.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_scheduled_tasks(&self) -> anyhow::Result<Vec<ScheduledTask>> {
        load_jsonl(&self.schedule_path).context("failed to load schedule.data")
    }

    #[tracing::instrument(skip(self, records))]
    pub fn save_transactions(&self, records: &[TransactionRecord]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.transactions_path, records)
            .context("failed to save transactions.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_scheduled_tasks(&self, tasks: &[ScheduledTask]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.schedule_path, tasks).context("failed to save schedule.data")
    }

    /// Neither collection holds any record yet.
    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(is_blank(&self.transactions_path)? && is_blank(&self.schedule_path)?)
    }

    /// Copies every record of `source` into the store, replacing what is there.
    #[tracing::instrument(skip(self, source))]
    pub fn seed(&self, source: &dyn DataProvider) -> anyhow::Result<(usize, usize)> {
        let records = source.list_transactions()?;
        let tasks = source.list_scheduled_tasks()?;
        self.save_transactions(&records)?;
        self.save_scheduled_tasks(&tasks)?;
        info!(
            transactions = records.len(),
            tasks = tasks.len(),
            "seeded datastore"
        );
        Ok((records.len(), tasks.len()))
    }
}

impl DataProvider for DataStore {
    fn list_transactions(&self) -> anyhow::Result<Vec<TransactionRecord>> {
        self.load_transactions()
    }

    fn list_scheduled_tasks(&self) -> anyhow::Result<Vec<ScheduledTask>> {
        self.load_scheduled_tasks()
    }
}

fn is_blank(path: &Path) -> anyhow::Result<bool> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    Ok(raw.trim().is_empty())
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::DataStore;

    #[test]
    fn reports_line_of_bad_record() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        fs::write(&store.transactions_path, "\n{\"id\": 1}\n").expect("write");

        let err = store.load_transactions().unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("line 2"), "{chain}");
    }

    #[test]
    fn fresh_store_is_empty() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");
        assert!(store.is_empty().expect("check empty"));
        assert!(store.load_scheduled_tasks().expect("load").is_empty());
    }
}
