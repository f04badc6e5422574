use super::{render_script, Scheduler, Submission};
use crate::core::executor::{Executor, LocalExecutor};
use crate::core::job::JobSpec;
use crate::error::LaunchError;
use std::time::Duration;

/// Runs jobs immediately on this machine, with no queue in between.
///
/// Resource directives are not interpreted, but the wall-clock limit is
/// enforced by killing the command once it runs out.
#[derive(Debug, Clone)]
pub struct LocalScheduler {
    shell: String,
    poll_interval: Duration,
}

impl LocalScheduler {
    pub fn new(shell: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            shell: shell.into(),
            poll_interval,
        }
    }
}

impl Scheduler for LocalScheduler {
    fn name(&self) -> &'static str {
        "local"
    }

    fn render(&self, spec: &JobSpec) -> String {
        render_script(spec, &self.shell)
    }

    fn submit(&self, spec: &JobSpec) -> Result<Submission, LaunchError> {
        if spec.gpus() > 0 {
            tracing::debug!(
                "Local backend does not reserve GPUs; {} requested",
                spec.gpus()
            );
        }
        let executor = LocalExecutor::with_deadline(spec.time_limit().as_duration())
            .poll_interval(self.poll_interval);
        let outcome = executor.execute(spec)?;
        Ok(Submission::Completed(outcome))
    }
}
