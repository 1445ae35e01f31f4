pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod persist;
pub mod render;
pub mod session;
pub mod signal;
pub mod storage;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
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
    "starting todo runner"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.todorc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

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
    storage::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at \
         {}",
        data_dir.display()
      )
    })?;

  let mut session =
    session::Session::open(
      storage,
      Box::new(clock::SystemClock)
    );
  let mut renderer =
    render::Renderer::stdout(
      &cfg,
      session.dark_mode()
    );
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let outcome = commands::dispatch(
    &mut session,
    &cfg,
    &mut renderer,
    inv,
    datetime::today_local()
  );
  session.close();

  outcome?;
  info!("done");
  Ok(())
}
