//! Scheduler backends.
//!
//! A backend decides how a [`JobSpec`] reaches the hardware: queued on a
//! cluster through `sbatch`, or run right here. The job's command never
//! depends on the backend.

mod local;
mod slurm;

pub use local::LocalScheduler;
pub use slurm::{parse_submission_output, SlurmScheduler};

use crate::config::Config;
use crate::core::directives::render_directives;
use crate::core::executor::ExitOutcome;
use crate::core::job::JobSpec;
use crate::error::LaunchError;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    #[default]
    Slurm,
    Local,
}

/// Result of handing a job to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Accepted by a queueing scheduler
    Queued {
        job_id: u64,
        cluster: Option<String>,
    },
    /// Already ran to completion
    Completed(ExitOutcome),
}

impl Submission {
    /// Exit code the submitting process should end with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Queued { .. } => 0,
            Self::Completed(outcome) => outcome.code,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Scheduler {
    fn name(&self) -> &'static str;

    /// Batch script this backend would run for `spec`.
    fn render(&self, spec: &JobSpec) -> String;

    fn submit(&self, spec: &JobSpec) -> Result<Submission, LaunchError>;
}

pub fn build_scheduler(backend: Backend, config: &Config) -> Box<dyn Scheduler> {
    match backend {
        Backend::Slurm => Box::new(SlurmScheduler::from_config(&config.slurm)),
        Backend::Local => Box::new(LocalScheduler::new(
            &config.slurm.shell,
            Duration::from_millis(config.local.poll_interval_ms),
        )),
    }
}

/// Validate `spec` and hand it to `scheduler`.
pub fn submit_job(scheduler: &dyn Scheduler, spec: &JobSpec) -> Result<Submission, LaunchError> {
    spec.validate()?;
    tracing::info!(
        "Submitting job to {} (account={}, gpus={}, cpus={}, time={})",
        scheduler.name(),
        spec.account(),
        spec.gpus(),
        spec.cpus_per_task(),
        spec.time_limit()
    );
    let submission = scheduler.submit(spec)?;
    tracing::debug!("Submission result: {:?}", submission);
    Ok(submission)
}

/// Batch script: shebang, resource directives, then the execution step.
///
/// The `cd` is guarded so a missing working directory ends the job with a
/// nonzero status before the command runs.
pub fn render_script(spec: &JobSpec, shell: &str) -> String {
    let mut lines = vec![format!("#!{shell}")];
    lines.extend(render_directives(spec).iter().map(ToString::to_string));
    lines.push(format!(
        "cd {} || exit 1",
        escape(&spec.work_dir().to_string_lossy())
    ));
    let command: Vec<Cow<'_, str>> = spec
        .command()
        .argv()
        .into_iter()
        .map(|word| shell_escape::unix::escape(Cow::Owned(word)))
        .collect();
    lines.push(command.join(" "));

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

fn escape(word: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::tests::heatmap_spec;
    use proptest::prelude::*;

    #[test]
    fn renders_reference_script() {
        let script = render_script(&heatmap_spec(), "/bin/bash");
        assert_eq!(
            script,
            "#!/bin/bash\n\
             #SBATCH --account=def-seals\n\
             #SBATCH --gres=gpu:2\n\
             #SBATCH --cpus-per-task=64\n\
             #SBATCH --time=0-03:00\n\
             cd /home/user/heatmap || exit 1\n\
             /home/user/venv/bin/python -m create_heatmap --chunks 4\n"
        );
    }

    #[test]
    fn rendered_script_escapes_words() {
        let spec = heatmap_spec()
            .to_builder()
            .work_dir("/data/seal runs")
            .args(vec!["-c".into(), "print('hi')".into()])
            .build()
            .unwrap();
        let script = render_script(&spec, "/bin/sh");
        assert!(script.contains("cd '/data/seal runs' || exit 1\n"));
        assert!(script.contains(r"-c 'print('\''hi'\'')'"));
    }

    #[test]
    fn rendered_script_imports_back() {
        let spec = heatmap_spec()
            .to_builder()
            .work_dir("/data/seal runs")
            .job_name("seal heatmap")
            .build()
            .unwrap();
        let script = render_script(&spec, "/bin/bash");
        let imported = crate::core::directives::parse_batch_script(&script)
            .unwrap()
            .into_spec(None)
            .unwrap();
        assert_eq!(imported, spec);
    }

    #[cfg(unix)]
    #[test]
    fn rendered_script_stops_before_command_when_work_dir_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let spec = heatmap_spec()
            .to_builder()
            .work_dir(dir.path().join("does-not-exist"))
            .program("touch")
            .args(vec![marker.to_string_lossy().into_owned()])
            .build()
            .unwrap();

        let script = dir.path().join("job.sh");
        std::fs::write(&script, render_script(&spec, "/bin/sh")).unwrap();
        let status = std::process::Command::new("/bin/sh")
            .arg(&script)
            .current_dir(dir.path())
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();

        assert!(!status.success());
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn rendered_script_runs_command_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let spec = heatmap_spec()
            .to_builder()
            .work_dir(dir.path())
            .program("sh")
            .args(vec!["-c".into(), "pwd > where.txt; exit 3".into()])
            .build()
            .unwrap();

        let script = dir.path().join("job.sh");
        std::fs::write(&script, render_script(&spec, "/bin/sh")).unwrap();
        let status = std::process::Command::new("/bin/sh")
            .arg(&script)
            .status()
            .unwrap();

        assert_eq!(status.code(), Some(3));
        let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            std::fs::canonicalize(recorded.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn backend_names_parse_and_display() {
        assert_eq!("slurm".parse::<Backend>().unwrap(), Backend::Slurm);
        assert_eq!("local".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!(Backend::Local.to_string(), "local");
        assert!("pbs".parse::<Backend>().is_err());
    }

    #[test]
    fn submit_job_validates_then_delegates() {
        let spec = heatmap_spec();
        let mut scheduler = MockScheduler::new();
        scheduler.expect_name().return_const("mock");
        scheduler
            .expect_submit()
            .withf(|s: &JobSpec| s.command().args() == ["-m", "create_heatmap", "--chunks", "4"])
            .times(1)
            .returning(|_| {
                Ok(Submission::Queued {
                    job_id: 7,
                    cluster: None,
                })
            });

        let submission = submit_job(&scheduler, &spec).unwrap();
        assert_eq!(submission.exit_code(), 0);
        assert!(matches!(submission, Submission::Queued { job_id: 7, .. }));
    }

    #[test]
    fn submit_job_surfaces_scheduler_rejection() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_name().return_const("mock");
        scheduler
            .expect_submit()
            .returning(|_| Err(LaunchError::scheduler("mock", "Invalid account")));

        let err = submit_job(&scheduler, &heatmap_spec()).unwrap_err();
        assert!(err.to_string().contains("Invalid account"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn completed_submission_carries_command_exit_code() {
        let submission = Submission::Completed(ExitOutcome {
            code: 9,
            timed_out: false,
        });
        assert_eq!(submission.exit_code(), 9);
    }

    fn command_lines(script: &str) -> Vec<&str> {
        script
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect()
    }

    proptest! {
        /// Identical inputs always declare identical resources.
        #[test]
        fn prop_rendering_is_idempotent(
            gpus in 0u32..16,
            cpus in 1u32..256,
            minutes in 1u64..10_000,
        ) {
            let build = || {
                heatmap_spec()
                    .to_builder()
                    .gpus(gpus)
                    .cpus_per_task(cpus)
                    .time_limit(Duration::from_secs(minutes * 60))
                    .build()
                    .unwrap()
            };
            prop_assert_eq!(render_script(&build(), "/bin/bash"), render_script(&build(), "/bin/bash"));
        }

        /// Changing the time limit never changes the command that runs.
        #[test]
        fn prop_time_limit_does_not_touch_command(secs in 1u64..1_000_000) {
            let base = heatmap_spec();
            let changed = base
                .to_builder()
                .time_limit(Duration::from_secs(secs))
                .build()
                .unwrap();
            let before = render_script(&base, "/bin/bash");
            let after = render_script(&changed, "/bin/bash");
            prop_assert_eq!(command_lines(&before), command_lines(&after));
            prop_assert_eq!(changed.command(), base.command());
        }
    }
}
