use crate::cli;
use crate::commands::load_job;
use anyhow::Result;
use glaunch::config::Config;
use glaunch::core::executor::{Executor, LocalExecutor};

/// Execution step: errors before the command starts become nonzero exits,
/// afterwards the command's own exit code is passed through untouched.
pub(crate) fn handle_run(config: &Config, args: cli::RunArgs) -> Result<i32> {
    let spec = load_job(config, &args.job, &cli::OverrideArgs::default())?;
    let outcome = LocalExecutor::new().execute(&spec)?;
    Ok(outcome.code)
}
