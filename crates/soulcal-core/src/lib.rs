pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod event;
pub mod grid;
pub mod lanes;
pub mod layout;
pub mod presentation;
pub mod render;
pub mod source;
pub mod span;
pub mod view;

use std::ffi::OsString;

use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting soulcal CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  debug!(
    files = ?cfg.loaded_files,
    overrides = cli.overrides.len(),
    "loaded config"
  );
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let renderer =
    render::Renderer::new(&cfg);

  commands::dispatch(
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
