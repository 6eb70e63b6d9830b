use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::FilterSet;
use crate::task::{Category, Horizon, Priority, Status, TimeSlot};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cadence",
    version,
    about = "Cadence: daily, weekly and monthly planning with edit deadlines",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "planrc", global = true)]
    pub planrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Pretend the local time is this moment (YYYY-MM-DDTHH:MM[:SS]).
    #[arg(long = "now", global = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task.
    Add(AddArgs),
    /// Show one day's plan grouped by time slot.
    Day(ViewArgs),
    /// Show one week's plan grouped by day.
    Week(ViewArgs),
    /// Show one month's goals grouped by ISO week.
    Month(ViewArgs),
    /// Show every task by priority and urgency.
    Matrix(FilterArgs),
    /// Change a task's status.
    Status(StatusArgs),
    /// Change any field of a task.
    Edit(EditArgs),
    /// Remove a task.
    Delete(DeleteArgs),
    /// Tell whether a horizon is still editable for a date.
    CanEdit(CanEditArgs),
    /// Print every field of a task.
    Show(ShowArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub status: Option<Status>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long = "hide-completed")]
    pub hide_completed: bool,
}

impl FilterArgs {
    pub fn to_filter_set(&self) -> FilterSet {
        FilterSet {
            category: self.category,
            status: self.status,
            priority: self.priority,
            hide_completed: self.hide_completed,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Reference date; defaults to today.
    pub date: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: Vec<String>,

    #[arg(long, short = 'd')]
    pub date: Option<String>,

    #[arg(long = "horizon", short = 't', default_value = "daily")]
    pub horizon: Horizon,

    #[arg(long)]
    pub slot: Option<TimeSlot>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub description: Option<String>,

    /// Ignore the edit window.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    pub id: String,

    pub status: Status,

    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, short = 'd')]
    pub date: Option<String>,

    #[arg(long = "horizon", short = 't')]
    pub horizon: Option<Horizon>,

    #[arg(long, conflicts_with = "clear_slot")]
    pub slot: Option<TimeSlot>,

    #[arg(long = "clear-slot")]
    pub clear_slot: bool,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub status: Option<Status>,

    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: String,

    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CanEditArgs {
    pub horizon: Horizon,

    pub date: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    pub id: String,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
