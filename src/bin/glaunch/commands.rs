use crate::cli::{Commands, GLaunch, OverrideArgs};
use anyhow::{Context, Result};
use glaunch::config::{load_config, Config};
use glaunch::core::job::JobSpec;
use std::path::Path;

mod completions;
mod import;
mod new;
mod render;
mod run;
mod show;
mod submit;

/// Dispatch a command; the returned value is the process exit code.
pub fn handle_commands(args: GLaunch) -> Result<i32> {
    let config = load_config(args.config.as_ref()).context("Failed to load configuration")?;

    match args.commands {
        Commands::Render(render_args) => render::handle_render(&config, render_args),
        Commands::Submit(submit_args) => submit::handle_submit(&config, submit_args),
        Commands::Run(run_args) => run::handle_run(&config, run_args),
        Commands::Show(show_args) => show::handle_show(&config, show_args),
        Commands::New(new_args) => new::handle_new(&config, new_args),
        Commands::Import(import_args) => import::handle_import(&config, import_args),
        Commands::Completions(completions_args) => {
            completions::handle_completions(completions_args)
        }
    }
}

/// Load a job file and apply command-line resource overrides.
pub(crate) fn load_job(config: &Config, path: &Path, overrides: &OverrideArgs) -> Result<JobSpec> {
    let spec = JobSpec::load(path, config.defaults.account.as_deref())
        .with_context(|| format!("Failed to load job file {}", path.display()))?;
    apply_overrides(spec, overrides)
}

pub(crate) fn apply_overrides(spec: JobSpec, overrides: &OverrideArgs) -> Result<JobSpec> {
    let mut builder = spec.to_builder();
    if let Some(account) = &overrides.account {
        builder = builder.account(account);
    }
    if let Some(gpus) = overrides.gpus {
        builder = builder.gpus(gpus);
    }
    if let Some(cpus) = overrides.cpus_per_task {
        builder = builder.cpus_per_task(cpus);
    }
    if let Some(time) = &overrides.time {
        let limit: glaunch::utils::parsers::TimeLimit = time
            .parse()
            .with_context(|| format!("Invalid --time value '{time}'"))?;
        builder = builder.time_limit(limit.as_duration());
    }
    if let Some(name) = &overrides.job_name {
        builder = builder.job_name(name);
    }
    builder.build().context("Invalid job after applying overrides")
}
