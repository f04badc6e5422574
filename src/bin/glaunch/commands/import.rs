use crate::cli;
use anyhow::{Context, Result};
use glaunch::config::Config;
use glaunch::core::directives::parse_batch_script;
use glaunch::core::job::JobSpec;
use std::fs;
use std::path::Path;

pub(crate) fn handle_import(config: &Config, args: cli::ImportArgs) -> Result<i32> {
    let spec = import_script(&args.script, config.defaults.account.as_deref())?;
    let contents = spec.to_toml_string()?;

    match &args.output {
        Some(output) => {
            if output.exists() {
                anyhow::bail!("Refusing to overwrite existing file '{}'", output.display());
            }
            fs::write(output, contents)
                .with_context(|| format!("Failed to write job file '{}'", output.display()))?;
            tracing::info!("Wrote {}", output.display());
        }
        None => print!("{contents}"),
    }
    Ok(0)
}

fn import_script(path: &Path, default_account: Option<&str>) -> Result<JobSpec> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch script '{}'", path.display()))?;
    let imported = parse_batch_script(&contents)
        .with_context(|| format!("Failed to parse batch script '{}'", path.display()))?;
    imported
        .into_spec(default_account)
        .with_context(|| format!("Batch script '{}' is incomplete", path.display()))
}
