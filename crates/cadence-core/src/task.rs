use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::iso_week_number;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Personal,
    Hobby,
    Work,
    Certification,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Personal,
        Category::Hobby,
        Category::Work,
        Category::Certification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Hobby => "hobby",
            Category::Work => "work",
            Category::Certification => "certification",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    InProgress,
    Completed,
    Postponed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Completed,
        Status::Postponed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Postponed => "postponed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Planning horizon of a task. Serialized as the task's `type` field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Daily,
    Weekly,
    Monthly,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Daily, Horizon::Weekly, Horizon::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Horizon::Daily => "daily",
            Horizon::Weekly => "weekly",
            Horizon::Monthly => "monthly",
        }
    }
}

/// The eight fixed two-hour bands between 06:00 and 22:00.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSlot {
    #[serde(rename = "06:00-08:00")]
    EarlyMorning,
    #[serde(rename = "08:00-10:00")]
    Morning,
    #[serde(rename = "10:00-12:00")]
    LateMorning,
    #[serde(rename = "12:00-14:00")]
    Midday,
    #[serde(rename = "14:00-16:00")]
    Afternoon,
    #[serde(rename = "16:00-18:00")]
    LateAfternoon,
    #[serde(rename = "18:00-20:00")]
    Evening,
    #[serde(rename = "20:00-22:00")]
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 8] = [
        TimeSlot::EarlyMorning,
        TimeSlot::Morning,
        TimeSlot::LateMorning,
        TimeSlot::Midday,
        TimeSlot::Afternoon,
        TimeSlot::LateAfternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn start_hour(self) -> u32 {
        match self {
            TimeSlot::EarlyMorning => 6,
            TimeSlot::Morning => 8,
            TimeSlot::LateMorning => 10,
            TimeSlot::Midday => 12,
            TimeSlot::Afternoon => 14,
            TimeSlot::LateAfternoon => 16,
            TimeSlot::Evening => 18,
            TimeSlot::Night => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::EarlyMorning => "06:00-08:00",
            TimeSlot::Morning => "08:00-10:00",
            TimeSlot::LateMorning => "10:00-12:00",
            TimeSlot::Midday => "12:00-14:00",
            TimeSlot::Afternoon => "14:00-16:00",
            TimeSlot::LateAfternoon => "16:00-18:00",
            TimeSlot::Evening => "18:00-20:00",
            TimeSlot::Night => "20:00-22:00",
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|value| value.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown category: {s} (expected personal, hobby, work or certification)"))
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('-', "_");
        Status::ALL
            .into_iter()
            .find(|value| value.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown status: {s} (expected not_started, in_progress, completed or postponed)"))
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|value| value.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown priority: {s} (expected high, medium or low)"))
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Horizon::ALL
            .into_iter()
            .find(|value| value.as_str() == lower)
            .ok_or_else(|| anyhow!("unknown horizon: {s} (expected daily, weekly or monthly)"))
    }
}

impl FromStr for TimeSlot {
    type Err = anyhow::Error;

    /// Accepts the band label (`08:00-10:00`) or its start hour (`8`, `08`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(slot) = TimeSlot::ALL.into_iter().find(|slot| slot.label() == trimmed) {
            return Ok(slot);
        }

        let hour = trimmed
            .strip_suffix(":00")
            .unwrap_or(trimmed)
            .parse::<u32>()
            .map_err(|_| anyhow!("unknown time slot: {s}"))?;
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.start_hour() == hour)
            .ok_or_else(|| anyhow!("no time slot starts at {hour}:00 (bands run 06:00-22:00 in two-hour steps)"))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub category: Category,

    pub status: Status,

    pub priority: Priority,

    #[serde(rename = "type")]
    pub horizon: Horizon,

    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<TimeSlot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_number: Option<u32>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Re-derives the horizon-dependent fields: only daily tasks keep a
    /// time slot, only weekly and monthly tasks carry a week number.
    pub fn normalize(&mut self) {
        match self.horizon {
            Horizon::Daily => {
                self.week_number = None;
            }
            Horizon::Weekly | Horizon::Monthly => {
                self.time_slot = None;
                self.week_number = Some(iso_week_number(self.date));
            }
        }
    }

    /// Bumps `updated_at`, never moving it before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

/// User-entered values for a task that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub horizon: Option<Horizon>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, horizon: Horizon, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            horizon: Some(horizon),
            date: Some(date),
            ..Self::default()
        }
    }

    /// Validates the draft and builds a task with a fresh id.
    ///
    /// A blank title or a missing date is rejected here so that nothing
    /// invalid ever reaches the store.
    pub fn into_task(self, now: DateTime<Utc>) -> anyhow::Result<Task> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            bail!("task title is required");
        }
        let Some(date) = self.date else {
            bail!("task date is required");
        };

        let mut task = Task {
            id: Task::generate_id(),
            title,
            description: self.description.trim().to_string(),
            category: self.category.unwrap_or(Category::Personal),
            status: self.status.unwrap_or(Status::NotStarted),
            priority: self.priority.unwrap_or(Priority::Medium),
            horizon: self.horizon.unwrap_or(Horizon::Daily),
            date,
            time_slot: self.time_slot,
            week_number: None,
            created_at: now,
            updated_at: now,
        };
        task.normalize();
        Ok(task)
    }
}

/// Partial update merged into an existing task. `None` leaves a field as
/// is; `time_slot: Some(None)` clears the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub horizon: Option<Horizon>,
    pub date: Option<NaiveDate>,
    pub time_slot: Option<Option<TimeSlot>>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            bail!("task title cannot be empty");
        }
        Ok(())
    }

    /// Merges the patch into `task` and refreshes its derived fields.
    /// The id and creation time are never touched.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.trim().to_string();
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(horizon) = self.horizon {
            task.horizon = horizon;
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(time_slot) = self.time_slot {
            task.time_slot = time_slot;
        }

        task.normalize();
        task.touch(now);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn draft_requires_title_and_date() {
        let now = Utc::now();

        let blank = TaskDraft::new("   ", Horizon::Daily, date(2025, 12, 8));
        assert!(blank.into_task(now).is_err());

        let undated = TaskDraft {
            title: "read".to_string(),
            ..TaskDraft::default()
        };
        assert!(undated.into_task(now).is_err());
    }

    #[test]
    fn draft_fills_defaults_and_derived_fields() {
        let now = Utc
            .with_ymd_and_hms(2025, 12, 7, 10, 0, 0)
            .single()
            .expect("valid now");

        let mut draft = TaskDraft::new("  plan sprint ", Horizon::Weekly, date(2025, 12, 10));
        draft.time_slot = Some(TimeSlot::Morning);
        let task = draft.into_task(now).expect("valid draft");

        assert_eq!(task.title, "plan sprint");
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.status, Status::NotStarted);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.time_slot, None);
        assert_eq!(task.week_number, Some(50));
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn daily_draft_keeps_slot_and_drops_week() {
        let mut draft = TaskDraft::new("gym", Horizon::Daily, date(2025, 12, 8));
        draft.time_slot = Some(TimeSlot::Evening);
        let task = draft.into_task(Utc::now()).expect("valid draft");

        assert_eq!(task.time_slot, Some(TimeSlot::Evening));
        assert_eq!(task.week_number, None);
    }

    #[test]
    fn patch_merges_and_renormalizes() {
        let created = Utc
            .with_ymd_and_hms(2025, 12, 1, 9, 0, 0)
            .single()
            .expect("valid created");
        let mut draft = TaskDraft::new("write", Horizon::Daily, date(2025, 12, 8));
        draft.time_slot = Some(TimeSlot::Midday);
        let mut task = draft.into_task(created).expect("valid draft");
        let id = task.id.clone();

        let later = created + chrono::Duration::hours(3);
        let patch = TaskPatch {
            horizon: Some(Horizon::Monthly),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        };
        patch.apply(&mut task, later);

        assert_eq!(task.id, id);
        assert_eq!(task.horizon, Horizon::Monthly);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.time_slot, None);
        assert_eq!(task.week_number, Some(50));
        assert_eq!(task.created_at, created);
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn touch_never_precedes_creation() {
        let created = Utc
            .with_ymd_and_hms(2025, 12, 1, 9, 0, 0)
            .single()
            .expect("valid created");
        let mut task = TaskDraft::new("x", Horizon::Daily, date(2025, 12, 8))
            .into_task(created)
            .expect("valid draft");

        TaskPatch::status(Status::Completed).apply(&mut task, created - chrono::Duration::days(1));
        assert_eq!(task.updated_at, created);
    }

    #[test]
    fn patch_rejects_blank_title() {
        let patch = TaskPatch {
            title: Some(" ".to_string()),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_err());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("in_progress".parse::<Status>().expect("status"), Status::InProgress);
        assert_eq!("in-progress".parse::<Status>().expect("status"), Status::InProgress);
        assert_eq!("WORK".parse::<Category>().expect("category"), Category::Work);
        assert_eq!("08:00-10:00".parse::<TimeSlot>().expect("slot"), TimeSlot::Morning);
        assert_eq!("20".parse::<TimeSlot>().expect("slot"), TimeSlot::Night);
        assert!("07".parse::<TimeSlot>().is_err());
        assert!("yearly".parse::<Horizon>().is_err());
    }

    #[test]
    fn serializes_with_camel_case_and_wire_values() {
        let now = Utc
            .with_ymd_and_hms(2025, 12, 7, 10, 0, 0)
            .single()
            .expect("valid now");
        let mut draft = TaskDraft::new("study", Horizon::Daily, date(2025, 12, 8));
        draft.category = Some(Category::Certification);
        draft.time_slot = Some(TimeSlot::EarlyMorning);
        let task = draft.into_task(now).expect("valid draft");

        let value = serde_json::to_value(&task).expect("serialize");
        assert_eq!(value["type"], "daily");
        assert_eq!(value["category"], "certification");
        assert_eq!(value["status"], "not_started");
        assert_eq!(value["timeSlot"], "06:00-08:00");
        assert_eq!(value["date"], "2025-12-08");
        assert!(value.get("weekNumber").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn reads_browser_style_records() {
        let raw = r#"{
            "id": "1733565600000-abc123def",
            "title": "monthly review",
            "description": "",
            "category": "work",
            "status": "postponed",
            "priority": "low",
            "type": "monthly",
            "date": "2025-12-01",
            "weekNumber": 49,
            "createdAt": "2025-12-07T10:00:00.000Z",
            "updatedAt": "2025-12-07T10:00:00.000Z"
        }"#;

        let task: Task = serde_json::from_str(raw).expect("parse record");
        assert_eq!(task.horizon, Horizon::Monthly);
        assert_eq!(task.status, Status::Postponed);
        assert_eq!(task.week_number, Some(49));
        assert_eq!(task.time_slot, None);
        assert_eq!(task.short_id(), "17335656");
    }
}
