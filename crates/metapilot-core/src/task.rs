use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::datetime::{
    month_day_clamped, next_weekday_date, parse_clock_time, parse_weekday_name,
    to_utc_from_local,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Paused,
}

impl TaskStatus {
    pub fn as_key(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Paused => "paused",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TaskStatus::Active),
            "paused" => Ok(TaskStatus::Paused),
            other => Err(anyhow!("unknown task status: {other}")),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Recurrence {
    pub fn as_key(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Biweekly => "biweekly",
            Recurrence::Monthly => "monthly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recurrence::Daily => "Daily",
            Recurrence::Weekly => "Weekly",
            Recurrence::Biweekly => "Bi-weekly",
            Recurrence::Monthly => "Monthly",
        }
    }
}

impl FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "biweekly" | "bi-weekly" => Ok(Recurrence::Biweekly),
            "monthly" => Ok(Recurrence::Monthly),
            other => Err(anyhow!("unknown recurrence: {other}")),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Recurrence plus an optional weekday (weekly kinds) or day of month
/// (monthly), and a wall-clock time such as `10:00 AM`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    #[serde(rename = "type")]
    pub recurrence: Recurrence,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    pub time: String,
}

impl Schedule {
    pub fn describe(&self) -> String {
        let day = self.day.as_deref().map(str::trim).filter(|d| !d.is_empty());
        match (self.recurrence, day) {
            (Recurrence::Daily, _) => format!("Daily at {}", self.time),
            (Recurrence::Weekly, Some(day)) => format!("Every {day} at {}", self.time),
            (Recurrence::Biweekly, Some(day)) => format!("Every other {day} at {}", self.time),
            (Recurrence::Monthly, Some(day)) => match day.parse::<u32>() {
                Ok(n) => format!("{} of each month at {}", ordinal(n), self.time),
                Err(_) => format!("Monthly on {day} at {}", self.time),
            },
            (recurrence, None) => format!("{} at {}", recurrence.label(), self.time),
        }
    }

    /// First run strictly after `now`, evaluated on the wall clock of `tz`.
    ///
    /// Bi-weekly schedules carry no anchor week, so their first run is the
    /// next matching weekday.
    pub fn next_after(&self, now: DateTime<Utc>, tz: &Tz) -> anyhow::Result<DateTime<Utc>> {
        let (hour, minute) = parse_clock_time(&self.time)
            .ok_or_else(|| anyhow!("invalid schedule time: {}", self.time))?;
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("invalid schedule time: {}", self.time))?;

        let local_now = now.with_timezone(tz).naive_local();
        let today = local_now.date();

        let date = match self.recurrence {
            Recurrence::Daily => {
                if today.and_time(at) > local_now {
                    today
                } else {
                    today
                        .succ_opt()
                        .ok_or_else(|| anyhow!("date overflow after {today}"))?
                }
            }
            Recurrence::Weekly | Recurrence::Biweekly => {
                let weekday = self
                    .day
                    .as_deref()
                    .and_then(parse_weekday_name)
                    .ok_or_else(|| anyhow!("{} schedule needs a weekday", self.recurrence))?;
                if today.weekday() == weekday && today.and_time(at) > local_now {
                    today
                } else {
                    next_weekday_date(today, weekday)
                        .ok_or_else(|| anyhow!("date overflow after {today}"))?
                }
            }
            Recurrence::Monthly => {
                let day_of_month = self
                    .day
                    .as_deref()
                    .and_then(|d| d.trim().parse::<u32>().ok())
                    .filter(|d| (1..=31).contains(d))
                    .ok_or_else(|| anyhow!("monthly schedule needs a day of month"))?;
                let this_month = month_day_clamped(today.year(), today.month(), day_of_month)
                    .ok_or_else(|| anyhow!("invalid month for {today}"))?;
                if this_month.and_time(at) > local_now {
                    this_month
                } else {
                    let (year, month) = if today.month() == 12 {
                        (today.year() + 1, 1)
                    } else {
                        (today.year(), today.month() + 1)
                    };
                    month_day_clamped(year, month, day_of_month)
                        .ok_or_else(|| anyhow!("invalid month {year}-{month}"))?
                }
            }
        };

        to_utc_from_local(date.and_time(at), tz, &self.describe())
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Lifecycle of a scheduled task. Only an active task has a next run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Active {
        #[serde(rename = "nextExecution")]
        next_execution: DateTime<Utc>,
    },
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub category: Category,

    pub description: String,

    #[serde(flatten)]
    pub state: TaskState,

    pub schedule: Schedule,
}

impl ScheduledTask {
    pub fn status(&self) -> TaskStatus {
        match self.state {
            TaskState::Active { .. } => TaskStatus::Active,
            TaskState::Paused => TaskStatus::Paused,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == TaskStatus::Active
    }

    pub fn next_execution(&self) -> Option<DateTime<Utc>> {
        match self.state {
            TaskState::Active { next_execution } => Some(next_execution),
            TaskState::Paused => None,
        }
    }

    /// Flips active and paused. Resuming schedules the next run after `now`.
    #[tracing::instrument(skip(self, now, tz), fields(id = %self.id))]
    pub fn toggle(&mut self, now: DateTime<Utc>, tz: &Tz) -> anyhow::Result<TaskStatus> {
        self.state = match self.state {
            TaskState::Active { .. } => TaskState::Paused,
            TaskState::Paused => TaskState::Active {
                next_execution: self.schedule.next_after(now, tz)?,
            },
        };
        tracing::debug!(status = %self.status(), next = ?self.next_execution(), "toggled task");
        Ok(self.status())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Recurrence, Schedule, ScheduledTask, TaskState, TaskStatus};
    use crate::category::Category;

    fn schedule(recurrence: Recurrence, day: Option<&str>, time: &str) -> Schedule {
        Schedule {
            recurrence,
            day: day.map(str::to_string),
            time: time.to_string(),
        }
    }

    #[test]
    fn describes_each_recurrence() {
        assert_eq!(
            schedule(Recurrence::Daily, None, "4:00 AM").describe(),
            "Daily at 4:00 AM"
        );
        assert_eq!(
            schedule(Recurrence::Weekly, Some("Monday"), "10:00 AM").describe(),
            "Every Monday at 10:00 AM"
        );
        assert_eq!(
            schedule(Recurrence::Biweekly, Some("Wednesday"), "3:00 PM").describe(),
            "Every other Wednesday at 3:00 PM"
        );
        assert_eq!(
            schedule(Recurrence::Monthly, Some("1"), "12:00 PM").describe(),
            "1st of each month at 12:00 PM"
        );
        assert_eq!(
            schedule(Recurrence::Monthly, Some("22"), "12:00 PM").describe(),
            "22nd of each month at 12:00 PM"
        );
        assert_eq!(
            schedule(Recurrence::Monthly, Some("11"), "9:00 AM").describe(),
            "11th of each month at 9:00 AM"
        );
    }

    #[test]
    fn next_run_for_each_recurrence() {
        // Wednesday 2025-05-14 12:00 UTC
        let now = Utc.with_ymd_and_hms(2025, 5, 14, 12, 0, 0).unwrap();
        let tz = chrono_tz::UTC;

        let daily_later = schedule(Recurrence::Daily, None, "1:00 PM");
        assert_eq!(
            daily_later.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 14, 13, 0, 0).unwrap()
        );

        let daily_earlier = schedule(Recurrence::Daily, None, "9:00 AM");
        assert_eq!(
            daily_earlier.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 15, 9, 0, 0).unwrap()
        );

        let weekly = schedule(Recurrence::Weekly, Some("Monday"), "10:00 AM");
        assert_eq!(
            weekly.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 19, 10, 0, 0).unwrap()
        );

        let same_day = schedule(Recurrence::Biweekly, Some("Wednesday"), "6:00 PM");
        assert_eq!(
            same_day.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 14, 18, 0, 0).unwrap()
        );

        let monthly = schedule(Recurrence::Monthly, Some("1"), "12:00 PM");
        assert_eq!(
            monthly.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn monthly_clamps_short_months_and_wraps_year() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let tz = chrono_tz::UTC;
        let monthly = schedule(Recurrence::Monthly, Some("31"), "9:00 AM");
        assert_eq!(
            monthly.next_after(now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap()
        );

        let feb = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            monthly.next_after(feb, &tz).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn weekly_without_day_is_an_error() {
        let now = Utc.with_ymd_and_hms(2025, 5, 14, 12, 0, 0).unwrap();
        let broken = schedule(Recurrence::Weekly, None, "10:00 AM");
        assert!(broken.next_after(now, &chrono_tz::UTC).is_err());
    }

    #[test]
    fn toggle_keeps_next_execution_in_step_with_status() {
        let now = Utc.with_ymd_and_hms(2025, 5, 14, 12, 0, 0).unwrap();
        let tz = chrono_tz::UTC;
        let mut task = ScheduledTask {
            id: "task-s5".to_string(),
            name: "Daily Gas Price Check".to_string(),
            category: Category::YieldMove,
            description: "Check gas prices".to_string(),
            state: TaskState::Paused,
            schedule: schedule(Recurrence::Daily, None, "4:00 AM"),
        };

        assert_eq!(task.next_execution(), None);

        assert_eq!(task.toggle(now, &tz).unwrap(), TaskStatus::Active);
        assert_eq!(
            task.next_execution(),
            Some(Utc.with_ymd_and_hms(2025, 5, 15, 4, 0, 0).unwrap())
        );

        assert_eq!(task.toggle(now, &tz).unwrap(), TaskStatus::Paused);
        assert_eq!(task.next_execution(), None);
    }

    #[test]
    fn paused_task_serializes_without_next_execution() {
        let task = ScheduledTask {
            id: "task-s5".to_string(),
            name: "Daily Gas Price Check".to_string(),
            category: Category::YieldMove,
            description: "Check gas prices".to_string(),
            state: TaskState::Paused,
            schedule: schedule(Recurrence::Daily, None, "4:00 AM"),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "paused");
        assert!(value.get("nextExecution").is_none());
        assert!(value["schedule"].get("day").is_none());

        let back: ScheduledTask = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }
}
