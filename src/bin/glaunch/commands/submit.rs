use crate::cli;
use crate::commands::load_job;
use anyhow::{Context, Result};
use glaunch::config::Config;
use glaunch::scheduler::{build_scheduler, submit_job, Submission};

pub(crate) fn handle_submit(config: &Config, args: cli::SubmitArgs) -> Result<i32> {
    let spec = load_job(config, &args.job, &args.overrides)?;
    let backend = args.backend.unwrap_or(config.defaults.backend);
    let scheduler = build_scheduler(backend, config);

    let submission = submit_job(scheduler.as_ref(), &spec)
        .with_context(|| format!("Failed to submit {} to {backend}", args.job.display()))?;

    match &submission {
        Submission::Queued {
            job_id,
            cluster: Some(cluster),
        } => println!("Submitted batch job {job_id} on cluster {cluster}"),
        Submission::Queued { job_id, .. } => println!("Submitted batch job {job_id}"),
        Submission::Completed(outcome) if outcome.timed_out => {
            tracing::warn!("Job hit its time limit of {}", spec.time_limit());
        }
        Submission::Completed(_) => {}
    }
    Ok(submission.exit_code())
}
