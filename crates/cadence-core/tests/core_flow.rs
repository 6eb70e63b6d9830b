use cadence_core::filter::FilterSet;
use cadence_core::policy::can_edit;
use cadence_core::storage::{BlobStorage, FileStorage};
use cadence_core::store::{STORAGE_KEY, TaskStore};
use cadence_core::task::{Horizon, Priority, Status, TaskDraft, TaskPatch, TimeSlot};
use cadence_core::views::{Quadrant, daily_view, matrix_view, weekly_view};
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn file_store_roundtrip_and_views() {
    let temp = tempdir().expect("tempdir");
    let now = Utc
        .with_ymd_and_hms(2025, 12, 7, 10, 0, 0)
        .single()
        .expect("valid now");

    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::load(storage);
    assert!(store.is_empty());

    let mut run = TaskDraft::new("morning run", Horizon::Daily, date(2025, 12, 8));
    run.time_slot = Some(TimeSlot::EarlyMorning);
    run.priority = Some(Priority::High);
    store.add(run.into_task(now).expect("valid draft"));

    let review = TaskDraft::new("weekly review", Horizon::Weekly, date(2025, 12, 12));
    store.add(review.into_task(now).expect("valid draft"));
    let review_id = store.tasks()[1].id.clone();

    assert!(store.set_status(&review_id, Status::InProgress, now));
    let moved = TaskPatch {
        date: Some(date(2025, 12, 10)),
        ..TaskPatch::default()
    };
    assert!(store.update(&review_id, &moved, now).expect("valid patch"));

    let path = store.storage().path_for(STORAGE_KEY);
    assert!(path.ends_with("splendid_todo_tasks.json"));
    let raw = store
        .storage()
        .get(STORAGE_KEY)
        .expect("read blob")
        .expect("blob written");
    assert!(raw.contains("\"type\":\"weekly\""));
    assert!(raw.contains("\"timeSlot\":\"06:00-08:00\""));

    let reopened = TaskStore::load(FileStorage::open(temp.path()).expect("reopen storage"));
    assert_eq!(reopened.tasks(), store.tasks());

    let day = daily_view(reopened.tasks(), date(2025, 12, 8), &FilterSet::default());
    assert_eq!(day.total(), 1);
    assert_eq!(day.slots[0].tasks[0].title, "morning run");

    let week = weekly_view(reopened.tasks(), date(2025, 12, 8), &FilterSet::default());
    assert_eq!(week.week_number, 50);
    assert_eq!(week.days[2].tasks[0].status, Status::InProgress);

    let matrix = matrix_view(reopened.tasks(), date(2025, 12, 7), &FilterSet::default());
    assert_eq!(matrix.group(Quadrant::ImportantUrgent).len(), 1);

    let local_now = date(2025, 12, 7).and_hms_opt(10, 0, 0).expect("valid time");
    assert!(can_edit(date(2025, 12, 8), Horizon::Daily, local_now));
}

#[test]
fn corrupt_file_loads_empty_and_is_replaced_on_save() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open storage");
    storage.set(STORAGE_KEY, "{not json").expect("write corrupt blob");

    let mut store = TaskStore::load(storage);
    assert!(store.is_empty());

    store.save().expect("save");
    let raw = store
        .storage()
        .get(STORAGE_KEY)
        .expect("read blob")
        .expect("blob written");
    assert_eq!(raw, "[]");
}
