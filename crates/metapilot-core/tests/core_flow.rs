use std::num::NonZeroUsize;

use chrono::{TimeZone, Utc};
use metapilot_core::datastore::DataStore;
use metapilot_core::datetime::CalendarDay;
use metapilot_core::filter::{Selector, TaskFilter, TxFilter};
use metapilot_core::pager::Pager;
use metapilot_core::provider::DataProvider;
use metapilot_core::seed::SeedData;
use metapilot_core::task::TaskStatus;
use metapilot_core::transaction::TxStatus;
use metapilot_core::view::{HistoryView, ScheduleView};
use tempfile::tempdir;

#[test]
fn seeded_store_roundtrip_and_filtering() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    assert!(store.is_empty().expect("check empty"));

    let (records, tasks) = store.seed(&SeedData).expect("seed datastore");
    assert_eq!((records, tasks), (8, 8));
    assert!(!store.is_empty().expect("check empty"));

    let provider: &dyn DataProvider = &store;
    let records = provider.list_transactions().expect("load transactions");
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["tx-1", "tx-2", "tx-3", "tx-4", "tx-5", "tx-6", "tx-7", "tx-8"]
    );

    let now = Utc.with_ymd_and_hms(2025, 5, 12, 10, 0, 0).unwrap();
    let tz = chrono_tz::UTC;
    let terms = vec!["status:failed".to_string()];
    let filter = TxFilter::parse(&terms, now, &tz).expect("parse filter");

    let mut view = HistoryView::new(Pager::new(NonZeroUsize::new(5).unwrap()), tz);
    view.go_to(2);
    view.set_filter(filter);
    assert_eq!(view.page(), 1);

    let page = view.visible(&records);
    assert_eq!(page.total_items, 2);
    assert!(page.items.iter().all(|r| r.status() == TxStatus::Failed));
    assert!(page.items.iter().all(|r| r.error().is_some()));
}

#[test]
fn toggle_persists_across_reopen() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    store.seed(&SeedData).expect("seed datastore");

    let now = Utc.with_ymd_and_hms(2025, 5, 14, 7, 0, 0).unwrap();
    let tz = chrono_tz::UTC;
    let view = ScheduleView::new(tz);

    let mut tasks = store.load_scheduled_tasks().expect("load tasks");
    let status = view
        .toggle(&mut tasks, "task-s5", now)
        .expect("toggle paused task");
    assert_eq!(status, TaskStatus::Active);
    store.save_scheduled_tasks(&tasks).expect("save tasks");

    let reopened = DataStore::open(temp.path()).expect("reopen datastore");
    let tasks = reopened.load_scheduled_tasks().expect("reload tasks");
    let resumed = tasks
        .iter()
        .find(|task| task.id == "task-s5")
        .expect("task-s5 present");
    assert!(resumed.is_active());
    assert!(resumed.next_execution().is_some_and(|next| next > now));

    let filter = TaskFilter {
        status: Selector::Only(TaskStatus::Paused),
        ..TaskFilter::default()
    };
    assert!(filter.apply(&tasks).is_empty());

    let mut view = ScheduleView::new(tz);
    view.select_day(Some(CalendarDay::from_ymd(2025, 5, 14).expect("day")));
    let agenda: Vec<&str> = view.agenda(&tasks).iter().map(|t| t.id.as_str()).collect();
    assert_eq!(agenda, vec!["task-s8", "task-s7", "task-s6"]);
}
