pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod policy;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli = cli::GlobalCli::parse_from(
    raw_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting cadence"
  );

  let mut cfg = config::Config::load(
    cli.planrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let tz = cfg.timezone();
  let now = match cli.now.as_deref() {
    | Some(raw) => {
      let local =
        calendar::parse_local_datetime(
          raw
        )
        .context("invalid --now value")?;
      calendar::Moment::from_local(
        local, tz
      )?
    }
    | None => {
      calendar::Moment::from_utc(
        Utc::now(),
        tz
      )
    }
  };
  debug!(timezone = %tz, local_now = %now.local, "resolved clock");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    storage::FileStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at {}",
        data_dir.display()
      )
    })?;
  let mut store =
    store::TaskStore::load(storage);

  let renderer =
    render::Renderer::new(&cfg);

  commands::dispatch_to_stdout(
    &mut store,
    &renderer,
    cli.command,
    now
  )?;

  info!("done");
  Ok(())
}
