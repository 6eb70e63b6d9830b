use std::io::{self, Write};

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::calendar::{Moment, month_label, parse_date_expr, week_label};
use crate::cli::{AddArgs, CanEditArgs, Command, DeleteArgs, EditArgs, ShowArgs, StatusArgs, ViewArgs};
use crate::policy::{can_edit, commit_deadline};
use crate::render::{EditState, Renderer};
use crate::storage::BlobStorage;
use crate::store::TaskStore;
use crate::task::{Horizon, Status, Task, TaskDraft, TaskPatch};
use crate::views::{daily_view, matrix_view, monthly_view, weekly_view};

#[instrument(skip_all)]
pub fn dispatch<S: BlobStorage, W: Write>(
    store: &mut TaskStore<S>,
    renderer: &Renderer,
    out: &mut W,
    command: Option<Command>,
    now: Moment,
) -> anyhow::Result<()> {
    let command = command.unwrap_or_else(|| Command::Day(ViewArgs::default()));
    debug!(?command, local_now = %now.local, "dispatching");

    match command {
        Command::Add(args) => cmd_add(store, out, args, now),
        Command::Day(args) => cmd_view(store, renderer, out, Horizon::Daily, args, now),
        Command::Week(args) => cmd_view(store, renderer, out, Horizon::Weekly, args, now),
        Command::Month(args) => cmd_view(store, renderer, out, Horizon::Monthly, args, now),
        Command::Matrix(args) => {
            let view = matrix_view(store.tasks(), now.today(), &args.to_filter_set());
            renderer.print_matrix(out, &view)
        }
        Command::Status(args) => cmd_status(store, out, args, now),
        Command::Edit(args) => cmd_edit(store, out, args, now),
        Command::Delete(args) => cmd_delete(store, out, args, now),
        Command::CanEdit(args) => cmd_can_edit(out, args, now),
        Command::Show(args) => cmd_show(store, renderer, out, args, now),
    }
}

/// Resolves a full id or an unambiguous id prefix.
pub fn resolve_id<S: BlobStorage>(store: &TaskStore<S>, token: &str) -> anyhow::Result<String> {
    let token = token.trim();
    if token.is_empty() {
        bail!("task id cannot be empty");
    }
    if let Some(task) = store.get(token) {
        return Ok(task.id.clone());
    }

    let mut matches = store.tasks().iter().filter(|task| task.id.starts_with(token));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id {token}"))?;
    if matches.next().is_some() {
        bail!("task id {token} is ambiguous; type more characters");
    }
    Ok(first.id.clone())
}

fn edit_state(date: NaiveDate, horizon: Horizon, now: Moment) -> EditState {
    EditState {
        editable: can_edit(date, horizon, now.local),
        deadline: commit_deadline(date, horizon),
    }
}

fn ensure_editable(date: NaiveDate, horizon: Horizon, now: Moment, force: bool) -> anyhow::Result<()> {
    if can_edit(date, horizon, now.local) {
        return Ok(());
    }

    let deadline = commit_deadline(date, horizon);
    if force {
        warn!(%date, %horizon, %deadline, "editing a closed window because --force was given");
        return Ok(());
    }
    Err(anyhow!(
        "the {horizon} plan for {date} is read-only (closed at {})",
        deadline.format("%Y-%m-%d %H:%M")
    ))
    .context("pass --force to change it anyway")
}

fn ensure_slot_fits(has_slot: bool, horizon: Horizon) -> anyhow::Result<()> {
    if has_slot && horizon != Horizon::Daily {
        bail!("--slot only applies to daily tasks, not {horizon}");
    }
    Ok(())
}

fn parse_reference_date(raw: Option<&str>, now: Moment) -> anyhow::Result<NaiveDate> {
    match raw {
        Some(raw) => parse_date_expr(raw, now.today()),
        None => Ok(now.today()),
    }
}

#[instrument(skip(store, out, args, now))]
fn cmd_add<S: BlobStorage, W: Write>(
    store: &mut TaskStore<S>,
    out: &mut W,
    args: AddArgs,
    now: Moment,
) -> anyhow::Result<()> {
    info!("command add");
    ensure_slot_fits(args.slot.is_some(), args.horizon)?;

    let date = args
        .date
        .as_deref()
        .map(|raw| parse_date_expr(raw, now.today()))
        .transpose()?;
    let draft = TaskDraft {
        title: args.title.join(" "),
        description: args.description.unwrap_or_default(),
        category: args.category,
        status: None,
        priority: args.priority,
        horizon: Some(args.horizon),
        date,
        time_slot: args.slot,
    };
    let task = draft.into_task(now.utc)?;
    ensure_editable(task.date, task.horizon, now, args.force)?;

    writeln!(out, "Created task {}.", task.short_id())?;
    store.add(task);
    Ok(())
}

#[instrument(skip(store, renderer, out, args, now))]
fn cmd_view<S: BlobStorage, W: Write>(
    store: &TaskStore<S>,
    renderer: &Renderer,
    out: &mut W,
    horizon: Horizon,
    args: ViewArgs,
    now: Moment,
) -> anyhow::Result<()> {
    let date = parse_reference_date(args.date.as_deref(), now)?;
    let filters = args.filters.to_filter_set();
    let state = edit_state(date, horizon, now);

    match horizon {
        Horizon::Daily => renderer.print_daily(out, &daily_view(store.tasks(), date, &filters), state),
        Horizon::Weekly => renderer.print_weekly(out, &weekly_view(store.tasks(), date, &filters), state),
        Horizon::Monthly => renderer.print_monthly(out, &monthly_view(store.tasks(), date, &filters), state),
    }
}

#[instrument(skip(store, out, args, now))]
fn cmd_status<S: BlobStorage, W: Write>(
    store: &mut TaskStore<S>,
    out: &mut W,
    args: StatusArgs,
    now: Moment,
) -> anyhow::Result<()> {
    info!(status = %args.status, "command status");

    let id = resolve_id(store, &args.id)?;
    let task = lookup(store, &id)?;
    ensure_editable(task.date, task.horizon, now, args.force)?;
    let short_id = task.short_id().to_string();

    if !store.set_status(&id, args.status, now.utc) {
        bail!("task {id} disappeared before it could be updated");
    }
    writeln!(out, "Task {short_id} is now {}.", args.status)?;
    if args.status == Status::Postponed {
        writeln!(out, "Use `cadence edit {short_id}` to move it to a new date.")?;
    }
    Ok(())
}

#[instrument(skip(store, out, args, now))]
fn cmd_edit<S: BlobStorage, W: Write>(
    store: &mut TaskStore<S>,
    out: &mut W,
    args: EditArgs,
    now: Moment,
) -> anyhow::Result<()> {
    info!("command edit");

    let id = resolve_id(store, &args.id)?;
    let current = lookup(store, &id)?;
    let (old_date, old_horizon) = (current.date, current.horizon);
    let short_id = current.short_id().to_string();

    let date = args
        .date
        .as_deref()
        .map(|raw| parse_date_expr(raw, now.today()))
        .transpose()?;
    let time_slot = if args.clear_slot {
        Some(None)
    } else {
        args.slot.map(Some)
    };
    let patch = TaskPatch {
        title: args.title,
        description: args.description,
        category: args.category,
        status: args.status,
        priority: args.priority,
        horizon: args.horizon,
        date,
        time_slot,
    };
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field option");
    }

    ensure_editable(old_date, old_horizon, now, args.force)?;
    let new_date = patch.date.unwrap_or(old_date);
    let new_horizon = patch.horizon.unwrap_or(old_horizon);
    ensure_slot_fits(args.slot.is_some(), new_horizon)?;
    if (new_date, new_horizon) != (old_date, old_horizon) {
        ensure_editable(new_date, new_horizon, now, args.force)?;
    }

    if !store.update(&id, &patch, now.utc)? {
        bail!("task {id} disappeared before it could be updated");
    }
    writeln!(out, "Modified task {short_id}.")?;
    Ok(())
}

#[instrument(skip(store, out, args, now))]
fn cmd_delete<S: BlobStorage, W: Write>(
    store: &mut TaskStore<S>,
    out: &mut W,
    args: DeleteArgs,
    now: Moment,
) -> anyhow::Result<()> {
    info!("command delete");

    let id = resolve_id(store, &args.id)?;
    let task = lookup(store, &id)?;
    ensure_editable(task.date, task.horizon, now, args.force)?;
    let short_id = task.short_id().to_string();

    store.delete(&id);
    writeln!(out, "Deleted task {short_id}.")?;
    Ok(())
}

fn cmd_can_edit<W: Write>(out: &mut W, args: CanEditArgs, now: Moment) -> anyhow::Result<()> {
    let date = parse_date_expr(&args.date, now.today())?;
    let state = edit_state(date, args.horizon, now);
    let verdict = if state.editable { "editable" } else { "read-only" };
    let period = match args.horizon {
        Horizon::Daily => date.to_string(),
        Horizon::Weekly => week_label(date),
        Horizon::Monthly => month_label(date),
    };
    writeln!(
        out,
        "{} {period}: {verdict} (deadline {})",
        args.horizon,
        state.deadline.format("%Y-%m-%d %H:%M:%S")
    )?;
    Ok(())
}

fn cmd_show<S: BlobStorage, W: Write>(
    store: &TaskStore<S>,
    renderer: &Renderer,
    out: &mut W,
    args: ShowArgs,
    now: Moment,
) -> anyhow::Result<()> {
    let id = resolve_id(store, &args.id)?;
    let task = lookup(store, &id)?;
    renderer.print_task_info(out, task, edit_state(task.date, task.horizon, now))
}

fn lookup<'a, S: BlobStorage>(store: &'a TaskStore<S>, id: &str) -> anyhow::Result<&'a Task> {
    store.get(id).ok_or_else(|| anyhow!("no task with id {id}"))
}

/// Runs `command` against `store`, writing to stdout.
pub fn dispatch_to_stdout<S: BlobStorage>(
    store: &mut TaskStore<S>,
    renderer: &Renderer,
    command: Option<Command>,
    now: Moment,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    dispatch(store, renderer, &mut out, command, now)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;

    use super::*;
    use crate::cli::GlobalCli;
    use crate::storage::MemoryStorage;

    fn moment(raw: &str) -> Moment {
        let local = crate::calendar::parse_local_datetime(raw).expect("valid local time");
        Moment::from_local(local, chrono_tz::UTC).expect("valid moment")
    }

    fn run(store: &mut TaskStore<MemoryStorage>, args: &[&str], now: &str) -> anyhow::Result<String> {
        let cli = GlobalCli::try_parse_from(std::iter::once("cadence").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        dispatch(store, &Renderer::plain(), &mut out, cli.command, moment(now))?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn add_then_view_tomorrow() {
        let mut store = TaskStore::load(MemoryStorage::new());
        run(&mut store, &["add", "review", "notes", "--date", "tomorrow", "--slot", "10"], "2025-12-07T10:00").expect("add");

        assert_eq!(store.len(), 1);
        let task = &store.tasks()[0];
        assert_eq!(task.date, NaiveDate::from_ymd_opt(2025, 12, 8).expect("valid date"));
        assert_eq!(task.title, "review notes");

        let text = run(&mut store, &["day", "2025-12-08"], "2025-12-07T10:00").expect("day view");
        assert!(text.contains("review notes"));
        assert!(text.contains("editable until 2025-12-07 23:59"));
    }

    #[test]
    fn add_refuses_closed_window_without_force() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let err = run(&mut store, &["add", "today", "--date", "today"], "2025-12-08T00:01").expect_err("closed window");
        assert!(format!("{err:#}").contains("read-only"));
        assert!(store.is_empty());

        run(&mut store, &["add", "today", "--date", "today", "--force"], "2025-12-08T00:01").expect("forced add");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_requires_a_date() {
        let mut store = TaskStore::load(MemoryStorage::new());
        assert!(run(&mut store, &["add", "undated"], "2025-12-07T10:00").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn status_by_prefix_and_postponed_hint() {
        let mut store = TaskStore::load(MemoryStorage::new());
        run(&mut store, &["add", "plan", "-t", "weekly", "-d", "2025-12-11"], "2025-12-10T10:00").expect("add");
        let prefix = store.tasks()[0].id[..6].to_string();

        let short_id = store.tasks()[0].short_id().to_string();
        let text = run(&mut store, &["status", &prefix, "postponed"], "2025-12-10T11:00").expect("status");
        assert!(text.contains(&format!("Task {short_id} is now postponed.")));
        assert!(text.contains("cadence edit"));
        assert_eq!(store.tasks()[0].status, Status::Postponed);

        let err = run(&mut store, &["status", &prefix, "completed"], "2025-12-13T09:00").expect_err("week closed");
        assert!(format!("{err:#}").contains("--force"));
    }

    #[test]
    fn edit_checks_target_window() {
        let mut store = TaskStore::load(MemoryStorage::new());
        run(&mut store, &["add", "goal", "-t", "monthly", "-d", "2026-01-10"], "2025-12-20T10:00").expect("add");
        let id = store.tasks()[0].id.clone();

        assert!(run(&mut store, &["edit", &id, "--date", "2025-12-01"], "2025-12-26T10:00").is_err());
        run(&mut store, &["edit", &id, "--date", "2026-02-03", "--priority", "high"], "2025-12-26T10:00").expect("edit");

        let task = &store.tasks()[0];
        assert_eq!(task.week_number, Some(6));
        assert_eq!(task.priority, crate::task::Priority::High);
    }

    #[test]
    fn delete_and_can_edit() {
        let mut store = TaskStore::load(MemoryStorage::new());
        run(&mut store, &["add", "x", "-d", "2025-12-09"], "2025-12-07T10:00").expect("add");
        let id = store.tasks()[0].id.clone();
        run(&mut store, &["delete", &id], "2025-12-07T10:00").expect("delete");
        assert!(store.is_empty());

        let text = run(&mut store, &["can-edit", "monthly", "2025-12-03"], "2025-12-25T23:00:01").expect("can-edit");
        assert_eq!(text.trim(), "monthly 2025-12: read-only (deadline 2025-12-25 23:00:00)");
    }

    #[test]
    fn slot_is_rejected_outside_daily_plans() {
        let mut store = TaskStore::load(MemoryStorage::new());
        let err = run(&mut store, &["add", "plan", "-t", "weekly", "-d", "2025-12-11", "--slot", "8"], "2025-12-10T10:00")
            .expect_err("slot on weekly task");
        assert!(format!("{err:#}").contains("daily"));
        assert!(store.is_empty());

        run(&mut store, &["add", "plan", "-t", "weekly", "-d", "2025-12-11"], "2025-12-10T10:00").expect("add");
        let id = store.tasks()[0].id.clone();
        assert!(run(&mut store, &["edit", &id, "--slot", "8"], "2025-12-10T10:00").is_err());

        run(&mut store, &["edit", &id, "-t", "daily", "--slot", "8"], "2025-12-10T10:00").expect("edit to daily");
        assert_eq!(store.tasks()[0].time_slot, Some(crate::task::TimeSlot::Morning));
    }

    #[test]
    fn unknown_id_is_reported() {
        let mut store = TaskStore::load(MemoryStorage::new());
        assert!(run(&mut store, &["show", "nope"], "2025-12-07T10:00").is_err());
    }
}
