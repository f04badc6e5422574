use super::{render_script, Scheduler, Submission};
use crate::config::SlurmConfig;
use crate::core::job::JobSpec;
use crate::error::LaunchError;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

static SUBMITTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Submitted batch job (\d+)").expect("valid sbatch regex"));

/// Queues jobs on a Slurm cluster by piping the rendered script to `sbatch`.
#[derive(Debug, Clone)]
pub struct SlurmScheduler {
    sbatch: PathBuf,
    sbatch_args: Vec<String>,
    shell: String,
}

impl SlurmScheduler {
    pub fn new(sbatch: impl Into<PathBuf>, shell: impl Into<String>) -> Self {
        Self {
            sbatch: sbatch.into(),
            sbatch_args: Vec::new(),
            shell: shell.into(),
        }
    }

    pub fn from_config(config: &SlurmConfig) -> Self {
        Self::new(&config.sbatch, &config.shell).sbatch_args(config.sbatch_args.clone())
    }

    /// Extra arguments placed before `--parsable` on every call.
    pub fn sbatch_args(mut self, args: Vec<String>) -> Self {
        self.sbatch_args = args;
        self
    }
}

impl Scheduler for SlurmScheduler {
    fn name(&self) -> &'static str {
        "slurm"
    }

    fn render(&self, spec: &JobSpec) -> String {
        render_script(spec, &self.shell)
    }

    fn submit(&self, spec: &JobSpec) -> Result<Submission, LaunchError> {
        let script = self.render(spec);
        tracing::debug!("Submitting script:\n{script}");

        let mut child = Command::new(&self.sbatch)
            .args(&self.sbatch_args)
            .arg("--parsable")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.sbatch.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // sbatch may bail out before reading; its stderr says why.
            if let Err(err) = stdin.write_all(script.as_bytes()) {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(err.into());
                }
            }
        }

        let output = child.wait_with_output().map_err(|source| LaunchError::Wait {
            program: self.sbatch.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("sbatch exited with {}", output.status),
                msg => msg.to_string(),
            };
            return Err(LaunchError::scheduler(self.name(), message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (job_id, cluster) = parse_submission_output(&stdout)?;
        tracing::info!("Slurm accepted job {job_id}");
        Ok(Submission::Queued { job_id, cluster })
    }
}

/// Job id (and cluster, if any) from `sbatch` output.
///
/// Understands both `--parsable` output (`<id>[;<cluster>]`) and the
/// default `Submitted batch job <id>` line.
///
/// # Examples
///
/// ```
/// use glaunch::scheduler::parse_submission_output;
///
/// assert_eq!(parse_submission_output("4242\n").unwrap(), (4242, None));
/// assert_eq!(
///     parse_submission_output("4242;cedar\n").unwrap(),
///     (4242, Some("cedar".to_string()))
/// );
/// assert_eq!(parse_submission_output("Submitted batch job 17\n").unwrap(), (17, None));
/// ```
pub fn parse_submission_output(output: &str) -> Result<(u64, Option<String>), LaunchError> {
    let first = output.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(line) = first else {
        return Err(LaunchError::scheduler("slurm", "sbatch printed no job id"));
    };

    let (id, cluster) = match line.split_once(';') {
        Some((id, cluster)) => (id, Some(cluster.trim().to_string())),
        None => (line, None),
    };
    if let Ok(job_id) = id.trim().parse::<u64>() {
        return Ok((job_id, cluster.filter(|c| !c.is_empty())));
    }

    SUBMITTED_LINE
        .captures(output)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(|job_id| (job_id, None))
        .ok_or_else(|| {
            LaunchError::scheduler("slurm", format!("unexpected sbatch output: {line}"))
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::job::tests::heatmap_spec;
    use std::fs;
    use tempfile::tempdir;

    /// Stand-in for `sbatch`, run through `/bin/sh` so the test never
    /// executes a file it just wrote.
    fn fake_sbatch(dir: &std::path::Path, body: &str) -> SlurmScheduler {
        let script = dir.join("sbatch.sh");
        fs::write(&script, body).unwrap();
        SlurmScheduler::new("/bin/sh", "/bin/bash")
            .sbatch_args(vec![script.to_string_lossy().into_owned()])
    }

    #[test]
    fn submits_rendered_script_on_stdin() {
        let dir = tempdir().unwrap();
        let received = dir.path().join("received.sh");
        let args = dir.path().join("args.txt");
        let scheduler = fake_sbatch(
            dir.path(),
            &format!(
                "printf '%s\\n' \"$@\" > '{}'\ncat > '{}'\necho '4242;cedar'\n",
                args.display(),
                received.display()
            ),
        );

        let spec = heatmap_spec();
        let submission = scheduler.submit(&spec).unwrap();
        assert_eq!(
            submission,
            Submission::Queued {
                job_id: 4242,
                cluster: Some("cedar".to_string())
            }
        );
        assert_eq!(fs::read_to_string(&received).unwrap(), scheduler.render(&spec));
        assert_eq!(fs::read_to_string(&args).unwrap(), "--parsable\n");
    }

    #[test]
    fn nonzero_sbatch_exit_is_a_rejection() {
        let dir = tempdir().unwrap();
        let scheduler = fake_sbatch(
            dir.path(),
            "cat > /dev/null\necho 'sbatch: error: Invalid account or account/partition combination' >&2\nexit 1\n",
        );
        let err = scheduler.submit(&heatmap_spec()).unwrap_err();
        assert!(matches!(err, LaunchError::Scheduler { .. }));
        assert!(err.to_string().contains("Invalid account"));
    }

    #[test]
    fn missing_sbatch_is_a_spawn_error() {
        let scheduler = SlurmScheduler::new("/nonexistent/sbatch", "/bin/bash");
        let err = scheduler.submit(&heatmap_spec()).unwrap_err();
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn parses_submission_output_variants() {
        assert_eq!(parse_submission_output("\n  99 \n").unwrap(), (99, None));
        assert_eq!(parse_submission_output("99;\n").unwrap(), (99, None));
        assert!(parse_submission_output("").is_err());
        assert!(parse_submission_output("sbatch: queued").is_err());
    }
}
