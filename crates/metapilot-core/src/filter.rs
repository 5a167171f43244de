use chrono::{
  DateTime,
  Utc
};
use chrono_tz::Tz;
use tracing::trace;

use crate::category::Category;
use crate::datetime::{
  CalendarDay,
  parse_day_expr
};
use crate::task::{
  Recurrence,
  ScheduledTask,
  TaskStatus
};
use crate::transaction::{
  TransactionRecord,
  TxStatus
};

/// One filter dimension: either
/// everything, or a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector<T> {
  All,
  Only(T)
}

impl<T> Default for Selector<T> {
  fn default() -> Self {
    Self::All
  }
}

impl<T> Selector<T> {
  pub fn is_all(&self) -> bool {
    matches!(self, Self::All)
  }

  /// `all` (or an empty value) selects
  /// everything; anything else goes
  /// through `parse`.
  pub fn parse_with<F>(
    raw: &str,
    parse: F
  ) -> anyhow::Result<Self>
  where
    F: FnOnce(&str) -> anyhow::Result<T>
  {
    let trimmed = raw.trim();
    if trimmed.is_empty()
      || trimmed
        .eq_ignore_ascii_case("all")
    {
      return Ok(Self::All);
    }
    parse(trimmed).map(Self::Only)
  }
}

impl<T: PartialEq> Selector<T> {
  pub fn admits(
    &self,
    value: &T
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(expected) => {
        expected == value
      }
    }
  }
}

impl Selector<String> {
  fn admits_ignore_case(
    &self,
    value: &str
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(expected) => {
        expected
          .eq_ignore_ascii_case(value)
      }
    }
  }
}

/// Filter state of the transaction
/// history page.
#[derive(
  Debug, Clone, Default, PartialEq,
)]
pub struct TxFilter {
  pub query:    String,
  pub category: Selector<Category>,
  pub network:  Selector<String>,
  pub date:     Option<CalendarDay>,
  pub status:   Selector<TxStatus>
}

impl TxFilter {
  /// Builds a filter from `key:value`
  /// terms. Words without a recognised
  /// key join into the free-text query.
  #[tracing::instrument(skip(
    terms, now, tz
  ))]
  pub fn parse(
    terms: &[String],
    now: DateTime<Utc>,
    tz: &Tz
  ) -> anyhow::Result<Self> {
    let mut filter = Self::default();
    let mut words = Vec::new();

    for term in terms {
      let Some((key, value)) =
        split_attribute(term)
      else {
        words.push(term.clone());
        continue;
      };

      match key.as_str() {
        | "search" | "q" => {
          words.push(value.to_string())
        }
        | "category" | "type"
        | "cat" => {
          filter.category =
            Selector::parse_with(
              value,
              str::parse
            )?;
        }
        | "network" | "net" => {
          filter.network =
            Selector::parse_with(
              value,
              |v| Ok(v.to_string())
            )?;
        }
        | "date" | "day" => {
          filter.date = if value
            .trim()
            .eq_ignore_ascii_case("all")
          {
            None
          } else {
            Some(parse_day_expr(
              value, now, tz
            )?)
          };
        }
        | "status" | "tab" => {
          filter.status =
            Selector::parse_with(
              value,
              str::parse
            )?;
        }
        | other => {
          return Err(anyhow::anyhow!(
            "unknown history filter \
             attribute: {other}"
          ));
        }
      }
    }

    filter.query = words.join(" ");
    trace!(?filter, "parsed history filter");
    Ok(filter)
  }

  /// True when the record passes every
  /// active dimension.
  pub fn matches(
    &self,
    record: &TransactionRecord,
    tz: &Tz
  ) -> bool {
    self.matches_query(record)
      && self
        .category
        .admits(&record.category)
      && self
        .network
        .admits_ignore_case(
          &record.network
        )
      && self.date.is_none_or(|day| {
        CalendarDay::of(record.date, tz)
          == day
      })
      && self
        .status
        .admits(&record.status())
  }

  pub fn apply<'a>(
    &self,
    records: &'a [TransactionRecord],
    tz: &Tz
  ) -> Vec<&'a TransactionRecord> {
    records
      .iter()
      .filter(|record| {
        self.matches(record, tz)
      })
      .collect()
  }

  /// No dimension is narrowing the
  /// result.
  pub fn is_default(&self) -> bool {
    self.query.trim().is_empty()
      && self.category.is_all()
      && self.network.is_all()
      && self.date.is_none()
      && self.status.is_all()
  }

  fn matches_query(
    &self,
    record: &TransactionRecord
  ) -> bool {
    let needle =
      self.query.trim().to_lowercase();
    if needle.is_empty() {
      return true;
    }

    [
      record.description.as_str(),
      record.task.as_str(),
      record.tx_hash.as_str()
    ]
    .iter()
    .any(|haystack| {
      haystack
        .to_lowercase()
        .contains(&needle)
    })
  }
}

/// Filter state of the schedule page.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TaskFilter {
  pub category:   Selector<Category>,
  pub recurrence: Selector<Recurrence>,
  pub status:     Selector<TaskStatus>
}

impl TaskFilter {
  #[tracing::instrument(skip(terms))]
  pub fn parse(
    terms: &[String]
  ) -> anyhow::Result<Self> {
    let mut filter = Self::default();

    for term in terms {
      let (key, value) =
        split_attribute(term)
          .ok_or_else(|| {
            anyhow::anyhow!(
              "expected key:value \
               schedule filter, got: \
               {term}"
            )
          })?;

      match key.as_str() {
        | "category" | "type"
        | "cat" => {
          filter.category =
            Selector::parse_with(
              value,
              str::parse
            )?;
        }
        | "recurrence" | "schedule"
        | "every" => {
          filter.recurrence =
            Selector::parse_with(
              value,
              str::parse
            )?;
        }
        | "status" => {
          filter.status =
            Selector::parse_with(
              value,
              str::parse
            )?;
        }
        | other => {
          return Err(anyhow::anyhow!(
            "unknown schedule filter \
             attribute: {other}"
          ));
        }
      }
    }

    trace!(?filter, "parsed schedule filter");
    Ok(filter)
  }

  pub fn matches(
    &self,
    task: &ScheduledTask
  ) -> bool {
    self.category.admits(&task.category)
      && self
        .recurrence
        .admits(&task.schedule.recurrence)
      && self.status.admits(&task.status())
  }

  pub fn apply<'a>(
    &self,
    tasks: &'a [ScheduledTask]
  ) -> Vec<&'a ScheduledTask> {
    tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect()
  }

  pub fn is_default(&self) -> bool {
    self.category.is_all()
      && self.recurrence.is_all()
      && self.status.is_all()
  }
}

/// Splits `key:value` when the key is a
/// plain word, so text such as `10:15`
/// stays a search term.
fn split_attribute(
  term: &str
) -> Option<(String, &str)> {
  let (key, value) =
    term.split_once(':')?;
  if key.is_empty()
    || !key
      .chars()
      .all(|c| c.is_ascii_alphabetic())
  {
    return None;
  }
  Some((key.to_ascii_lowercase(), value))
}
