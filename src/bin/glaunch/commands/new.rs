use crate::cli;
use anyhow::{Context, Result};
use glaunch::config::Config;
use glaunch::core::job::JobSpec;
use std::fs;
use std::path::{Path, PathBuf};

const JOB_TEMPLATE: &str = include_str!("../job_template.toml");
const PLACEHOLDER_ACCOUNT: &str = "CHANGE_ME";

pub(crate) fn handle_new(config: &Config, new_args: cli::NewArgs) -> Result<i32> {
    let base = std::env::current_dir().context("Failed to get current directory")?;
    let account = new_args
        .account
        .or_else(|| config.defaults.account.clone())
        .unwrap_or_else(|| PLACEHOLDER_ACCOUNT.to_string());

    let job_file = create_job(&base, &new_args.name, &account, &new_args.python)?;
    tracing::info!("Created new job '{}' at {}", new_args.name, job_file.display());
    println!("{}", job_file.display());
    Ok(0)
}

/// Create `<base>/<name>/job.toml` with the job's directory as `work_dir`.
fn create_job(base: &Path, name: &str, account: &str, python: &Path) -> Result<PathBuf> {
    let job_dir = base.join(name);
    if job_dir.exists() {
        anyhow::bail!("Directory '{}' already exists.", job_dir.display());
    }

    let contents = JOB_TEMPLATE
        .replace("{account}", &toml_string(account))
        .replace("{work_dir}", &toml_string(&job_dir.to_string_lossy()))
        .replace("{python}", &toml_string(&python.to_string_lossy()));
    JobSpec::from_toml_str(&contents, None).context("Generated job file is invalid")?;

    fs::create_dir(&job_dir)
        .with_context(|| format!("Failed to create directory '{}'", job_dir.display()))?;
    let job_file = job_dir.join("job.toml");
    fs::write(&job_file, contents)
        .with_context(|| format!("Failed to write job file '{}'", job_file.display()))?;
    Ok(job_file)
}

/// `value` as a quoted TOML string.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
