use crate::cli;
use crate::commands::load_job;
use anyhow::Result;
use glaunch::config::Config;
use glaunch::core::job::JobSpec;

pub(crate) fn handle_show(config: &Config, args: cli::ShowArgs) -> Result<i32> {
    let spec = load_job(config, &args.job, &args.overrides)?;
    print_job_details(&spec);
    Ok(0)
}

fn print_job_details(spec: &JobSpec) {
    println!("Job Details:");
    if let Some(name) = spec.job_name() {
        println!("  Name:          {}", name);
    }
    println!("  Account:       {}", spec.account());

    println!("\nResources:");
    println!("  GPUs:          {}", spec.gpus());
    println!("  CPUs:          {}", spec.cpus_per_task());
    println!("  Time limit:    {}", spec.time_limit());

    println!("\nExecution:");
    println!("  Working dir:   {}", spec.work_dir().display());
    println!("  Program:       {}", spec.command().program().display());
    println!("  Arguments:     {}", spec.command().args().join(" "));
}
