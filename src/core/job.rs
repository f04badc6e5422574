use crate::error::LaunchError;
use crate::utils::parsers::TimeLimit;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GPUS: u32 = 2;
pub const DEFAULT_CPUS_PER_TASK: u32 = 64;
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(3 * 3600);
pub const DEFAULT_MODULE: &str = "create_heatmap";
pub const DEFAULT_CHUNKS: u32 = 4;

/// Arguments of the reference job: `-m create_heatmap --chunks 4`.
pub fn default_args() -> Vec<String> {
    vec![
        "-m".to_string(),
        DEFAULT_MODULE.to_string(),
        "--chunks".to_string(),
        DEFAULT_CHUNKS.to_string(),
    ]
}

/// The command a job runs: an executable and its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Invocation {
    program: PathBuf,
    #[serde(default = "default_args")]
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `<interpreter> -m <module> <args...>`
    pub fn python_module(interpreter: impl Into<PathBuf>, module: &str, args: &[&str]) -> Self {
        let mut all = vec!["-m".to_string(), module.to_string()];
        all.extend(args.iter().map(|a| a.to_string()));
        Self::new(interpreter, all)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments, exactly as declared.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Static description of the resources a job needs and the command it runs.
///
/// Built once, through [`JobSpecBuilder`] or a TOML job file, and read-only
/// afterwards. Overrides go through [`JobSpec::to_builder`] and produce a new
/// specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    account: String,
    gpus: u32,
    cpus_per_task: u32,
    #[serde(rename = "time")]
    time_limit: TimeLimit,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
    work_dir: PathBuf,
    // Tables have to come after plain keys in TOML.
    command: Invocation,
}

impl JobSpec {
    pub fn builder() -> JobSpecBuilder {
        JobSpecBuilder::new()
    }

    pub fn to_builder(&self) -> JobSpecBuilder {
        JobSpecBuilder {
            account: Some(self.account.clone()),
            gpus: self.gpus,
            cpus_per_task: self.cpus_per_task,
            time_limit: self.time_limit.as_duration(),
            job_name: self.job_name.clone(),
            work_dir: Some(self.work_dir.clone()),
            program: Some(self.command.program.clone()),
            args: self.command.args.clone(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn gpus(&self) -> u32 {
        self.gpus
    }

    pub fn cpus_per_task(&self) -> u32 {
        self.cpus_per_task
    }

    pub fn time_limit(&self) -> TimeLimit {
        self.time_limit
    }

    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn command(&self) -> &Invocation {
        &self.command
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.account.trim().is_empty() {
            return Err(LaunchError::validation("account cannot be empty"));
        }
        if self.account.chars().any(char::is_whitespace) {
            return Err(LaunchError::validation(format!(
                "account '{}' cannot contain whitespace",
                self.account
            )));
        }
        if self.cpus_per_task == 0 {
            return Err(LaunchError::validation("cpus_per_task must be at least 1"));
        }
        if self.time_limit.as_duration().is_zero() {
            return Err(LaunchError::validation("time limit must be greater than zero"));
        }
        if !self.work_dir.is_absolute() {
            return Err(LaunchError::validation(format!(
                "work_dir must be an absolute path, got {}",
                self.work_dir.display()
            )));
        }
        if self.command.program.as_os_str().is_empty() {
            return Err(LaunchError::validation("command program cannot be empty"));
        }
        if let Some(name) = &self.job_name {
            if name.trim().is_empty() {
                return Err(LaunchError::validation("job_name cannot be empty when set"));
            }
        }
        Ok(())
    }

    /// Parse a TOML job file.
    ///
    /// Omitted resources fall back to the reference job (2 GPUs, 64 CPUs,
    /// `0-03:00`, `-m create_heatmap --chunks 4`). `account` falls back to
    /// `default_account` when the file leaves it out.
    pub fn from_toml_str(contents: &str, default_account: Option<&str>) -> Result<Self, LaunchError> {
        let file: JobFile = toml::from_str(contents)
            .map_err(|e| LaunchError::parse(format!("invalid job file: {e}")))?;

        let account = file
            .account
            .or_else(|| default_account.map(str::to_string))
            .ok_or_else(|| {
                LaunchError::validation("account is not set in the job file or the configuration")
            })?;

        let mut builder = Self::builder()
            .account(account)
            .gpus(file.gpus)
            .cpus_per_task(file.cpus_per_task)
            .time_limit(file.time.as_duration())
            .work_dir(file.work_dir)
            .program(file.command.program)
            .args(file.command.args);
        if let Some(name) = file.job_name {
            builder = builder.job_name(name);
        }
        builder.build()
    }

    pub fn load(path: &Path, default_account: Option<&str>) -> Result<Self, LaunchError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents, default_account)
    }

    pub fn to_toml_string(&self) -> Result<String, LaunchError> {
        toml::to_string(self).map_err(|e| LaunchError::parse(format!("cannot serialize job: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    account: Option<String>,
    #[serde(default = "default_gpus")]
    gpus: u32,
    #[serde(default = "default_cpus_per_task")]
    cpus_per_task: u32,
    #[serde(default = "default_time_limit")]
    time: TimeLimit,
    job_name: Option<String>,
    work_dir: PathBuf,
    command: Invocation,
}

fn default_gpus() -> u32 {
    DEFAULT_GPUS
}

fn default_cpus_per_task() -> u32 {
    DEFAULT_CPUS_PER_TASK
}

fn default_time_limit() -> TimeLimit {
    TimeLimit::from_secs(DEFAULT_TIME_LIMIT.as_secs())
}

pub struct JobSpecBuilder {
    account: Option<String>,
    gpus: u32,
    cpus_per_task: u32,
    time_limit: Duration,
    job_name: Option<String>,
    work_dir: Option<PathBuf>,
    program: Option<PathBuf>,
    args: Vec<String>,
}

impl Default for JobSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSpecBuilder {
    pub fn new() -> Self {
        Self {
            account: None,
            gpus: DEFAULT_GPUS,
            cpus_per_task: DEFAULT_CPUS_PER_TASK,
            time_limit: DEFAULT_TIME_LIMIT,
            job_name: None,
            work_dir: None,
            program: None,
            args: default_args(),
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn gpus(mut self, gpus: u32) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn cpus_per_task(mut self, cpus: u32) -> Self {
        self.cpus_per_task = cpus;
        self
    }

    pub fn time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn command(mut self, invocation: Invocation) -> Self {
        self.program = Some(invocation.program);
        self.args = invocation.args;
        self
    }

    pub fn build(self) -> Result<JobSpec, LaunchError> {
        let account = self
            .account
            .ok_or_else(|| LaunchError::validation("account is required"))?;
        let work_dir = self
            .work_dir
            .ok_or_else(|| LaunchError::validation("work_dir is required"))?;
        let program = self
            .program
            .ok_or_else(|| LaunchError::validation("command program is required"))?;
        let time_limit = TimeLimit::from_duration(self.time_limit)
            .map_err(|_| LaunchError::validation("time limit must be greater than zero"))?;

        let spec = JobSpec {
            account,
            gpus: self.gpus,
            cpus_per_task: self.cpus_per_task,
            time_limit,
            job_name: self.job_name,
            work_dir,
            command: Invocation::new(program, self.args),
        };
        spec.validate()?;
        Ok(spec)
    }
}
