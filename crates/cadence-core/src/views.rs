use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::calendar::{iso_week_number, month_days, monday_of, same_month, week_days, week_end, week_start};
use crate::filter::FilterSet;
use crate::task::{Horizon, Priority, Task, TimeSlot};

/// Whole days from `today` up to a task's date at or below which the task
/// counts as urgent. Overdue tasks are urgent too.
pub const URGENT_WITHIN_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGroup<'a> {
    pub slot: TimeSlot,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyView<'a> {
    pub date: NaiveDate,
    pub slots: Vec<SlotGroup<'a>>,
    pub unscheduled: Vec<&'a Task>,
}

impl DailyView<'_> {
    pub fn total(&self) -> usize {
        self.slots.iter().map(|group| group.tasks.len()).sum::<usize>() + self.unscheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyView<'a> {
    pub week_number: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub days: Vec<DayGroup<'a>>,
    /// Monthly goals pinned to this ISO week.
    pub monthly_goals: Vec<&'a Task>,
}

impl WeeklyView<'_> {
    pub fn total(&self) -> usize {
        self.days.iter().map(|group| group.tasks.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGroup<'a> {
    pub week_number: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyView<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<WeekGroup<'a>>,
}

impl MonthlyView<'_> {
    pub fn total(&self) -> usize {
        self.weeks.iter().map(|group| group.tasks.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    ImportantUrgent,
    ImportantNotUrgent,
    UrgentNotImportant,
    NeitherUrgentNorImportant,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::ImportantUrgent,
        Quadrant::ImportantNotUrgent,
        Quadrant::UrgentNotImportant,
        Quadrant::NeitherUrgentNorImportant,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Quadrant::ImportantUrgent => "important & urgent",
            Quadrant::ImportantNotUrgent => "important, not urgent",
            Quadrant::UrgentNotImportant => "urgent, not important",
            Quadrant::NeitherUrgentNorImportant => "neither",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadrantGroup<'a> {
    pub quadrant: Quadrant,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixView<'a> {
    pub today: NaiveDate,
    pub quadrants: Vec<QuadrantGroup<'a>>,
}

impl<'a> MatrixView<'a> {
    pub fn group(&self, quadrant: Quadrant) -> &[&'a Task] {
        self.quadrants
            .iter()
            .find(|group| group.quadrant == quadrant)
            .map(|group| group.tasks.as_slice())
            .unwrap_or_default()
    }
}

/// Daily tasks dated `date`, filtered, bucketed into the eight time slots
/// in order plus an unscheduled bucket.
#[tracing::instrument(skip(tasks, filters))]
pub fn daily_view<'a>(tasks: &'a [Task], date: NaiveDate, filters: &FilterSet) -> DailyView<'a> {
    let selected = filters.apply(
        tasks
            .iter()
            .filter(|task| task.horizon == Horizon::Daily && task.date == date),
    );

    let slots = TimeSlot::ALL
        .into_iter()
        .map(|slot| SlotGroup {
            slot,
            tasks: selected
                .iter()
                .copied()
                .filter(|task| task.time_slot == Some(slot))
                .collect(),
        })
        .collect();
    let unscheduled = selected
        .iter()
        .copied()
        .filter(|task| task.time_slot.is_none())
        .collect();

    let view = DailyView {
        date,
        slots,
        unscheduled,
    };
    trace!(total = view.total(), "built daily view");
    view
}

/// Weekly tasks of the week containing `reference`, filtered, one column
/// per day Monday..Sunday. Each task lands in the column of its own date.
#[tracing::instrument(skip(tasks, filters))]
pub fn weekly_view<'a>(tasks: &'a [Task], reference: NaiveDate, filters: &FilterSet) -> WeeklyView<'a> {
    let monday = monday_of(reference);
    let week_number = iso_week_number(reference);

    let selected = filters.apply(
        tasks
            .iter()
            .filter(|task| task.horizon == Horizon::Weekly && monday_of(task.date) == monday),
    );

    let days = week_days(reference)
        .map(|date| DayGroup {
            date,
            tasks: selected
                .iter()
                .copied()
                .filter(|task| task.date == date)
                .collect(),
        })
        .collect();

    let iso_year = reference.iso_week().year();
    let monthly_goals = filters.apply(tasks.iter().filter(|task| {
        task.horizon == Horizon::Monthly
            && task.week_number == Some(week_number)
            && task.date.iso_week().year() == iso_year
    }));

    let view = WeeklyView {
        week_number,
        start: week_start(reference),
        end: week_end(reference),
        days,
        monthly_goals,
    };
    trace!(total = view.total(), goals = view.monthly_goals.len(), "built weekly view");
    view
}

/// Monthly tasks of `reference`'s month, filtered, grouped by every ISO
/// week that overlaps the month, in calendar order.
///
/// A task joins the group named by its stored week number; when that is
/// missing or names no week of this month, the ISO week of its date is
/// used instead so no task drops out of the view.
#[tracing::instrument(skip(tasks, filters))]
pub fn monthly_view<'a>(tasks: &'a [Task], reference: NaiveDate, filters: &FilterSet) -> MonthlyView<'a> {
    let selected = filters.apply(
        tasks
            .iter()
            .filter(|task| task.horizon == Horizon::Monthly && same_month(task.date, reference)),
    );

    let mut weeks: Vec<WeekGroup<'a>> = Vec::new();
    for day in month_days(reference) {
        let week_number = iso_week_number(day);
        if weeks.last().is_some_and(|group| group.week_number == week_number) {
            continue;
        }
        weeks.push(WeekGroup {
            week_number,
            start: week_start(day),
            end: week_end(day),
            tasks: Vec::new(),
        });
    }

    for task in selected {
        let stored = task
            .week_number
            .filter(|number| weeks.iter().any(|group| group.week_number == *number));
        let key = stored.unwrap_or_else(|| iso_week_number(task.date));
        if let Some(group) = weeks.iter_mut().find(|group| group.week_number == key) {
            group.tasks.push(task);
        }
    }

    let view = MonthlyView {
        year: reference.year(),
        month: reference.month(),
        weeks,
    };
    trace!(total = view.total(), "built monthly view");
    view
}

pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    date.signed_duration_since(today).num_days()
}

pub fn is_urgent(task: &Task, today: NaiveDate) -> bool {
    days_until(task.date, today) <= URGENT_WITHIN_DAYS
}

pub fn classify(task: &Task, today: NaiveDate) -> Quadrant {
    let important = task.priority == Priority::High;
    match (important, is_urgent(task, today)) {
        (true, true) => Quadrant::ImportantUrgent,
        (true, false) => Quadrant::ImportantNotUrgent,
        (false, true) => Quadrant::UrgentNotImportant,
        (false, false) => Quadrant::NeitherUrgentNorImportant,
    }
}

/// Every task, whatever its horizon, filtered and sorted into the four
/// priority x urgency quadrants.
#[tracing::instrument(skip(tasks, filters))]
pub fn matrix_view<'a>(tasks: &'a [Task], today: NaiveDate, filters: &FilterSet) -> MatrixView<'a> {
    let selected = filters.apply(tasks);

    let quadrants = Quadrant::ALL
        .into_iter()
        .map(|quadrant| QuadrantGroup {
            quadrant,
            tasks: selected
                .iter()
                .copied()
                .filter(|task| classify(task, today) == quadrant)
                .collect(),
        })
        .collect();

    MatrixView { today, quadrants }
}
