use cadence_core::calendar::{iso_week_number, monday_of, week_days};
use cadence_core::filter::FilterSet;
use cadence_core::policy::{can_edit, commit_deadline};
use cadence_core::storage::MemoryStorage;
use cadence_core::store::TaskStore;
use cadence_core::task::{Category, Horizon, Priority, Status, Task, TaskDraft, TimeSlot};
use cadence_core::views::{daily_view, monthly_view};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use proptest::prelude::*;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    // 2020-01-01 ..= 2030-12-31
    (0i64..4018).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date") + chrono::Duration::days(offset)
    })
}

fn arb_datetime() -> impl Strategy<Value = NaiveDateTime> {
    (arb_date(), 0u32..86_400).prop_map(|(date, secs)| {
        date.and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60)
            .expect("valid time")
    })
}

fn arb_horizon() -> impl Strategy<Value = Horizon> {
    prop::sample::select(Horizon::ALL.to_vec())
}

fn arb_slot() -> impl Strategy<Value = Option<TimeSlot>> {
    prop::option::of(prop::sample::select(TimeSlot::ALL.to_vec()))
}

fn arb_task() -> impl Strategy<Value = Task> {
    arb_task_within(arb_date())
}

fn arb_week_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..7).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2025, 12, 8).expect("valid date") + chrono::Days::new(offset)
    })
}

fn arb_task_within(dates: impl Strategy<Value = NaiveDate>) -> impl Strategy<Value = Task> {
    (
        "[a-z ]{1,16}",
        arb_horizon(),
        dates,
        arb_slot(),
        prop::sample::select(Priority::ALL.to_vec()),
        prop::sample::select(Category::ALL.to_vec()),
        prop::sample::select(Status::ALL.to_vec()),
    )
        .prop_map(|(title, horizon, date, slot, priority, category, status)| {
            let now = Utc
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .expect("valid now");
            let mut draft = TaskDraft::new(format!("t {title}"), horizon, date);
            draft.time_slot = slot;
            draft.priority = Some(priority);
            draft.category = Some(category);
            draft.status = Some(status);
            draft.into_task(now).expect("valid draft")
        })
}

fn arb_filters() -> impl Strategy<Value = FilterSet> {
    (
        prop::option::of(prop::sample::select(Category::ALL.to_vec())),
        prop::option::of(prop::sample::select(Status::ALL.to_vec())),
        prop::option::of(prop::sample::select(Priority::ALL.to_vec())),
        any::<bool>(),
    )
        .prop_map(|(category, status, priority, hide_completed)| FilterSet {
            category,
            status,
            priority,
            hide_completed,
        })
}

proptest! {
    #[test]
    fn week_days_are_monday_through_sunday(date in arb_date()) {
        let days: Vec<NaiveDate> = week_days(date).collect();
        prop_assert_eq!(days.len(), 7);
        prop_assert_eq!(days[0], monday_of(date));
        prop_assert_eq!(days[0].weekday(), Weekday::Mon);
        prop_assert_eq!(days[6].weekday(), Weekday::Sun);
        prop_assert!(days.contains(&date));
        for day in &days {
            prop_assert_eq!(iso_week_number(*day), iso_week_number(date));
        }
    }

    #[test]
    fn can_edit_matches_the_deadline(target in arb_date(), horizon in arb_horizon(), now in arb_datetime()) {
        let editable = can_edit(target, horizon, now);
        prop_assert_eq!(editable, can_edit(target, horizon, now));
        prop_assert_eq!(editable, now <= commit_deadline(target, horizon));
    }

    #[test]
    fn store_roundtrip_keeps_order(tasks in prop::collection::vec(arb_task(), 0..12)) {
        let mut store = TaskStore::load(MemoryStorage::new());
        for task in &tasks {
            store.add(task.clone());
        }

        let reloaded = TaskStore::load(store.into_storage());
        prop_assert_eq!(reloaded.tasks(), tasks.as_slice());
    }

    #[test]
    fn daily_groups_hold_every_filtered_task_once(
        tasks in prop::collection::vec(arb_task_within(arb_week_date()), 0..24),
        day in arb_week_date(),
        filters in arb_filters(),
    ) {
        let view = daily_view(&tasks, day, &filters);
        let expected = filters
            .apply(tasks.iter().filter(|task| task.horizon == Horizon::Daily && task.date == day))
            .len();
        prop_assert_eq!(view.total(), expected);
        prop_assert_eq!(view.slots.len(), TimeSlot::ALL.len());

        let mut seen: Vec<&str> = view
            .slots
            .iter()
            .flat_map(|group| group.tasks.iter())
            .chain(view.unscheduled.iter())
            .map(|task| task.id.as_str())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), expected);
    }

    #[test]
    fn monthly_groups_hold_every_goal_of_the_month(tasks in prop::collection::vec(arb_task(), 0..24), day in arb_date()) {
        let view = monthly_view(&tasks, day, &FilterSet::default());
        let expected = tasks
            .iter()
            .filter(|task| {
                task.horizon == Horizon::Monthly
                    && task.date.year() == day.year()
                    && task.date.month() == day.month()
            })
            .count();
        prop_assert_eq!(view.total(), expected);
    }
}
