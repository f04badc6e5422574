use crate::core::job::JobSpec;
use crate::error::LaunchError;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

/// Exit code reported when a job is stopped at its wall-clock limit.
pub const EXIT_TIMEOUT: i32 = 124;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time between SIGTERM and SIGKILL when a job is stopped at its limit.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

/// Terminal status of an executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: i32,
    pub timed_out: bool,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }
}

pub trait Executor {
    fn execute(&self, spec: &JobSpec) -> Result<ExitOutcome, LaunchError>;
}

/// Runs the execution step in the current process tree: change into the
/// job's working directory, start the command, wait for it.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    deadline: Option<Duration>,
    poll_interval: Duration,
    kill_grace: Duration,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalExecutor {
    /// No deadline: the scheduler running us enforces the limit.
    pub fn new() -> Self {
        Self {
            deadline: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Stop the command, and every process it started, once `deadline` has
    /// passed.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
        spec: &JobSpec,
        deadline: Duration,
    ) -> Result<ExitOutcome, LaunchError> {
        let program = spec.command().program();
        let started = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|source| LaunchError::Wait {
                program: program.to_path_buf(),
                source,
            })?;
            if let Some(status) = polled {
                return Ok(ExitOutcome {
                    code: exit_code(status),
                    timed_out: false,
                });
            }
            if started.elapsed() >= deadline {
                tracing::warn!(
                    "Job exceeded its time limit of {}, stopping process group {}",
                    spec.time_limit(),
                    child.id()
                );
                self.terminate(child);
                child.wait().map_err(|source| LaunchError::Wait {
                    program: program.to_path_buf(),
                    source,
                })?;
                return Ok(ExitOutcome {
                    code: EXIT_TIMEOUT,
                    timed_out: true,
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// SIGTERM the child's process group, then SIGKILL whatever is left once
    /// the grace period is over or the child itself has exited.
    #[cfg(unix)]
    fn terminate(&self, child: &mut Child) {
        let pgid = child.id() as libc::pid_t;
        signal_group(pgid, libc::SIGTERM);
        let grace_started = Instant::now();
        while grace_started.elapsed() < self.kill_grace {
            if let Ok(Some(_)) = child.try_wait() {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }
        signal_group(pgid, libc::SIGKILL);
    }

    #[cfg(not(unix))]
    fn terminate(&self, child: &mut Child) {
        // The child may exit between try_wait and kill.
        if let Err(err) = child.kill() {
            tracing::debug!("kill failed: {err}");
        }
    }
}

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) {
    // An empty group (everything already exited) reports ESRCH.
    if unsafe { libc::kill(-pgid, signal) } != 0 {
        tracing::debug!(
            "Signal {signal} to process group {pgid} failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

impl Executor for LocalExecutor {
    fn execute(&self, spec: &JobSpec) -> Result<ExitOutcome, LaunchError> {
        let work_dir = spec.work_dir();
        match std::fs::metadata(work_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(LaunchError::WorkDir {
                    path: work_dir.to_path_buf(),
                    reason: "not a directory".to_string(),
                })
            }
            Err(err) => {
                return Err(LaunchError::WorkDir {
                    path: work_dir.to_path_buf(),
                    reason: err.to_string(),
                })
            }
        }

        let invocation = spec.command();
        tracing::info!(
            "Running `{}` in {}",
            invocation.argv().join(" "),
            work_dir.display()
        );

        let mut command = Command::new(invocation.program());
        command.args(invocation.args()).current_dir(work_dir);
        // A deadline kill has to reach the command's own children too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.deadline.is_some() {
                command.process_group(0);
            }
        }

        let mut child = command
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: invocation.program().to_path_buf(),
                source,
            })?;
        tracing::debug!("Started pid {}", child.id());

        let outcome = match self.deadline {
            Some(deadline) => self.wait_with_deadline(&mut child, spec, deadline)?,
            None => {
                let status = child.wait().map_err(|source| LaunchError::Wait {
                    program: invocation.program().to_path_buf(),
                    source,
                })?;
                ExitOutcome {
                    code: exit_code(status),
                    timed_out: false,
                }
            }
        };

        tracing::info!("Command exited with code {}", outcome.code);
        Ok(outcome)
    }
}

/// Exit code as a shell would report it: signals map to `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    crate::error::EXIT_FAILURE
}
