use std::io::{self, IsTerminal, Write};

use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::calendar::week_label;
use crate::config::Config;
use crate::task::{Priority, Status, Task};
use crate::views::{DailyView, MatrixView, MonthlyView, WeeklyView};

const EMPTY_BUCKET: &str = "  (no tasks)";

/// Whether the view being printed may still be changed, and until when.
#[derive(Debug, Clone, Copy)]
pub struct EditState {
    pub editable: bool,
    pub deadline: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: color_enabled(cfg, io::stdout().is_terminal()),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_daily<W: Write>(&self, out: &mut W, view: &DailyView<'_>, state: EditState) -> anyhow::Result<()> {
        writeln!(out, "{} (daily)  {}", view.date.format("%Y-%m-%d %a"), self.edit_banner(state))?;

        for group in &view.slots {
            writeln!(out, "{}", self.paint(group.slot.label(), "1"))?;
            self.write_bucket(out, &group.tasks)?;
        }
        if !view.unscheduled.is_empty() {
            writeln!(out, "{}", self.paint("unscheduled", "1"))?;
            self.write_bucket(out, &view.unscheduled)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_weekly<W: Write>(&self, out: &mut W, view: &WeeklyView<'_>, state: EditState) -> anyhow::Result<()> {
        writeln!(
            out,
            "{} ({} .. {})  {}",
            week_label(view.start.date()),
            view.start.format("%Y-%m-%d"),
            view.end.format("%Y-%m-%d"),
            self.edit_banner(state)
        )?;

        for group in &view.days {
            writeln!(out, "{}", self.paint(&group.date.format("%a %m-%d").to_string(), "1"))?;
            self.write_bucket(out, &group.tasks)?;
        }

        if !view.monthly_goals.is_empty() {
            writeln!(out, "{}", self.paint("monthly goals this week", "1"))?;
            self.write_bucket(out, &view.monthly_goals)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_monthly<W: Write>(&self, out: &mut W, view: &MonthlyView<'_>, state: EditState) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}-{:02} (monthly)  {}",
            view.year,
            view.month,
            self.edit_banner(state)
        )?;

        for group in &view.weeks {
            let title = format!(
                "W{:02}  {} .. {}",
                group.week_number,
                group.start.format("%m-%d"),
                group.end.format("%m-%d")
            );
            writeln!(out, "{}", self.paint(&title, "1"))?;
            self.write_bucket(out, &group.tasks)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_matrix<W: Write>(&self, out: &mut W, view: &MatrixView<'_>) -> anyhow::Result<()> {
        writeln!(out, "priority matrix as of {} (urgent = due within 3 days)", view.today)?;
        for group in &view.quadrants {
            let title = format!("{} [{}]", group.quadrant.title(), group.tasks.len());
            writeln!(out, "{}", self.paint(&title, "1"))?;
            self.write_bucket(out, &group.tasks)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_info<W: Write>(&self, out: &mut W, task: &Task, state: EditState) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        if !task.description.is_empty() {
            writeln!(out, "description {}", task.description)?;
        }
        writeln!(out, "horizon     {}", task.horizon)?;
        writeln!(out, "date        {}", task.date)?;
        if let Some(slot) = task.time_slot {
            writeln!(out, "time slot   {slot}")?;
        }
        if let Some(week) = task.week_number {
            writeln!(out, "week        {week}")?;
        }
        writeln!(out, "category    {}", task.category)?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(out, "status      {}", task.status)?;
        writeln!(out, "created     {}", task.created_at.to_rfc3339())?;
        writeln!(out, "updated     {}", task.updated_at.to_rfc3339())?;
        writeln!(out, "{}", self.edit_banner(state))?;
        Ok(())
    }

    fn write_bucket<W: Write>(&self, out: &mut W, tasks: &[&Task]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "{EMPTY_BUCKET}")?;
            return Ok(());
        }

        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    format!("  {}", self.paint(task.short_id(), "33")),
                    self.paint_status(task.status),
                    self.paint_priority(task.priority),
                    task.category.to_string(),
                    task.title.clone(),
                ]
            })
            .collect();
        write_table(out, rows)
    }

    fn edit_banner(&self, state: EditState) -> String {
        if state.editable {
            format!("editable until {}", state.deadline.format("%Y-%m-%d %H:%M"))
        } else {
            self.paint("read-only", "2")
        }
    }

    fn paint_status(&self, status: Status) -> String {
        let code = match status {
            Status::NotStarted => "37",
            Status::InProgress => "34",
            Status::Completed => "32",
            Status::Postponed => "33",
        };
        self.paint(status.as_str(), code)
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "37",
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn color_enabled(cfg: &Config, is_terminal: bool) -> bool {
    cfg.get_bool("color").unwrap_or(true) && is_terminal
}

fn write_table<W: Write>(writer: &mut W, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = rows.first().map(Vec::len).unwrap_or(0);
    let mut widths = vec![0usize; column_count];

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding));
            line.push(' ');
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
