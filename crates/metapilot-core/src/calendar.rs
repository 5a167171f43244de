use std::collections::BTreeMap;

use chrono_tz::Tz;
use tracing::trace;

use crate::datetime::CalendarDay;
use crate::task::ScheduledTask;

/// Day -> active tasks whose next run
/// falls on that day, in input order.
#[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
pub fn index_events<'a>(
  tasks: &'a [ScheduledTask],
  tz: &Tz
) -> BTreeMap<CalendarDay, Vec<&'a ScheduledTask>>
{
  let mut events: BTreeMap<
    CalendarDay,
    Vec<&'a ScheduledTask>
  > = BTreeMap::new();

  for task in tasks {
    if !task.is_active() {
      continue;
    }
    let Some(next) =
      task.next_execution()
    else {
      continue;
    };

    events
      .entry(CalendarDay::of(next, tz))
      .or_default()
      .push(task);
  }

  trace!(
    days = events.len(),
    "indexed calendar events"
  );
  events
}

/// Tasks due on `day`, earliest first.
/// Equal instants keep their input order.
pub fn tasks_for_day<'a>(
  tasks: &'a [ScheduledTask],
  day: CalendarDay,
  tz: &Tz
) -> Vec<&'a ScheduledTask> {
  let mut due: Vec<&'a ScheduledTask> =
    tasks
      .iter()
      .filter(|task| {
        task.next_execution().is_some_and(
          |next| {
            CalendarDay::of(next, tz)
              == day
          }
        )
      })
      .collect();

  due.sort_by_key(|task| {
    task.next_execution()
  });
  due
}

/// Event count per day of one month, for
/// the calendar badges. Days without
/// events are omitted.
pub fn month_counts(
  tasks: &[ScheduledTask],
  year: i32,
  month: u32,
  tz: &Tz
) -> BTreeMap<CalendarDay, usize> {
  index_events(tasks, tz)
    .into_iter()
    .filter(|(day, _)| {
      day.year() == year
        && day.month() == month
    })
    .map(|(day, events)| {
      (day, events.len())
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    index_events,
    month_counts,
    tasks_for_day
  };
  use crate::datetime::CalendarDay;
  use crate::seed::SeedData;
  use crate::task::{
    ScheduledTask,
    TaskState
  };

  fn day(y: i32, m: u32, d: u32) -> CalendarDay {
    CalendarDay::from_ymd(y, m, d)
      .unwrap()
  }

  #[test]
  fn paused_tasks_never_indexed() {
    let tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    let events = index_events(
      &tasks,
      &chrono_tz::UTC
    );

    let indexed: usize =
      events.values().map(Vec::len).sum();
    assert_eq!(indexed, 7);
    assert!(
      events
        .values()
        .flatten()
        .all(|task| task.id != "task-s5")
    );
  }

  #[test]
  fn groups_by_day_in_insertion_order()
  {
    let tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    let events = index_events(
      &tasks,
      &chrono_tz::UTC
    );

    let ids: Vec<&str> = events
      [&day(2025, 5, 14)]
      .iter()
      .map(|t| t.id.as_str())
      .collect();
    assert_eq!(
      ids,
      vec![
        "task-s6", "task-s7", "task-s8"
      ]
    );

    let keys: Vec<String> = events
      .keys()
      .map(ToString::to_string)
      .collect();
    assert_eq!(
      keys,
      vec![
        "2025-05-14",
        "2025-05-16",
        "2025-05-20",
        "2025-05-21",
        "2025-06-01"
      ]
    );
  }

  #[test]
  fn day_keys_follow_display_timezone() {
    let tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    // 20:00 UTC on the 16th is the 17th
    // in Tokyo.
    let events = index_events(
      &tasks,
      &chrono_tz::Asia::Tokyo
    );
    assert!(
      events
        .contains_key(&day(2025, 5, 17))
    );
    assert!(
      !events
        .contains_key(&day(2025, 5, 16))
    );
  }

  #[test]
  fn day_agenda_sorted_by_time() {
    let tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    let agenda = tasks_for_day(
      &tasks,
      day(2025, 5, 14),
      &chrono_tz::UTC
    );
    let ids: Vec<&str> = agenda
      .iter()
      .map(|t| t.id.as_str())
      .collect();
    assert_eq!(
      ids,
      vec![
        "task-s8", "task-s7", "task-s6"
      ]
    );

    assert!(
      tasks_for_day(
        &tasks,
        day(2025, 5, 15),
        &chrono_tz::UTC
      )
      .is_empty()
    );
  }

  #[test]
  fn equal_instants_keep_input_order() {
    let mut tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    let nine = Utc
      .with_ymd_and_hms(
        2025, 5, 14, 9, 0, 0
      )
      .unwrap();
    for task in tasks.iter_mut() {
      if task.id == "task-s6"
        || task.id == "task-s7"
      {
        task.state = TaskState::Active {
          next_execution: nine
        };
      }
    }

    let agenda = tasks_for_day(
      &tasks,
      day(2025, 5, 14),
      &chrono_tz::UTC
    );
    let ids: Vec<&str> = agenda
      .iter()
      .map(|t| t.id.as_str())
      .collect();
    assert_eq!(
      ids,
      vec![
        "task-s6", "task-s7", "task-s8"
      ]
    );
  }

  #[test]
  fn counts_one_month() {
    let tasks =
      SeedData::scheduled_tasks()
        .unwrap();
    let may = month_counts(
      &tasks,
      2025,
      5,
      &chrono_tz::UTC
    );
    assert_eq!(may.len(), 4);
    assert_eq!(
      may[&day(2025, 5, 14)],
      3
    );
    assert!(
      !may.contains_key(&day(2025, 6, 1))
    );

    let empty: Vec<ScheduledTask> =
      Vec::new();
    assert!(
      month_counts(
        &empty,
        2025,
        5,
        &chrono_tz::UTC
      )
      .is_empty()
    );
  }
}
