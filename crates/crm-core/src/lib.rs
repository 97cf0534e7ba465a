pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod render;
pub mod seed;
pub mod session;
pub mod stats;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

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
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting crm CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.crmrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let mut session =
    session::Session::from_config(&cfg)
      .context(
        "failed to build session from \
         configuration"
      )?;

  let renderer =
    render::Renderer::new(&cfg);
  let inv = cli::Invocation::from_os_args(
    &cfg, cli.rest
  )?;

  let stdout = io::stdout();
  let mut out = stdout.lock();
  commands::dispatch(
    &mut session,
    &cfg,
    &renderer,
    inv,
    Utc::now(),
    &mut out
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
