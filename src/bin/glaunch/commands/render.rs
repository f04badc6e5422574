use crate::cli;
use crate::commands::load_job;
use anyhow::Result;
use glaunch::config::Config;
use glaunch::scheduler::build_scheduler;

pub(crate) fn handle_render(config: &Config, args: cli::RenderArgs) -> Result<i32> {
    let spec = load_job(config, &args.job, &args.overrides)?;
    let scheduler = build_scheduler(args.backend.unwrap_or(config.defaults.backend), config);
    print!("{}", scheduler.render(&spec));
    Ok(0)
}
