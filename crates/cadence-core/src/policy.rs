//! Edit windows per planning horizon.
//!
//! Each horizon closes before the period it plans begins: tomorrow's
//! daily plan by the end of today, a week's plan by Friday 23:00 of that
//! week, a month's plan by the 25th at 23:00. Nothing here reads the wall
//! clock; `now` is always the caller's local time.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::calendar::{add_days, at_time, monday_of};
use crate::task::Horizon;

pub const WEEKLY_DEADLINE_WEEKDAY_OFFSET: i64 = 4;
pub const MONTHLY_DEADLINE_DAY: u32 = 25;
pub const DEADLINE_HOUR: u32 = 23;

pub fn can_edit(target: NaiveDate, horizon: Horizon, now: NaiveDateTime) -> bool {
    let today = now.date();

    match horizon {
        Horizon::Daily => target > today,
        Horizon::Weekly => {
            let target_week = monday_of(target);
            let current_week = monday_of(today);

            if target_week < current_week {
                false
            } else if target_week == current_week {
                now <= commit_deadline(target, Horizon::Weekly)
            } else {
                true
            }
        }
        Horizon::Monthly => {
            let target_month = (target.year(), target.month());
            let current_month = (today.year(), today.month());

            if target_month < current_month {
                false
            } else if target_month == current_month {
                now <= commit_deadline(target, Horizon::Monthly)
            } else {
                true
            }
        }
    }
}

/// Last instant at which the window containing `target` is still
/// editable. `can_edit(target, h, now)` holds exactly when
/// `now <= commit_deadline(target, h)`.
pub fn commit_deadline(target: NaiveDate, horizon: Horizon) -> NaiveDateTime {
    match horizon {
        Horizon::Daily => {
            let eve = add_days(target, -1);
            let last_instant = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
                .unwrap_or(NaiveTime::MIN);
            eve.and_time(last_instant)
        }
        Horizon::Weekly => at_time(
            add_days(monday_of(target), WEEKLY_DEADLINE_WEEKDAY_OFFSET),
            DEADLINE_HOUR,
            0,
            0,
        ),
        Horizon::Monthly => {
            let day = target.with_day(MONTHLY_DEADLINE_DAY).unwrap_or(target);
            at_time(day, DEADLINE_HOUR, 0, 0)
        }
    }
}
