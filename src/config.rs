use crate::core::get_config_dir;
use crate::scheduler::Backend;
use serde::Deserialize;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "glaunch.toml";
const ENV_PREFIX: &str = "GLAUNCH";

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub slurm: SlurmConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SlurmConfig {
    /// Submission binary, looked up on PATH unless absolute
    #[serde(default = "default_sbatch")]
    pub sbatch: String,
    /// Extra arguments passed to every `sbatch` call (e.g. `--clusters=cedar`)
    #[serde(default)]
    pub sbatch_args: Vec<String>,
    /// Interpreter named in the rendered script's shebang
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            sbatch: default_sbatch(),
            sbatch_args: Vec::new(),
            shell: default_shell(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// How often the local backend checks a running job against its limit
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// Account used when a job file does not name one
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub backend: Backend,
}

fn default_sbatch() -> String {
    "sbatch".to_string()
}

fn default_shell() -> String {
    "/bin/bash".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Load configuration from, in increasing priority: the default config file
/// (`<config_dir>/glaunch/glaunch.toml`), the file given with `--config`,
/// and `GLAUNCH_*` environment variables (`GLAUNCH_SLURM__SBATCH=...`).
pub fn load_config(config_path: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    let mut config_vec = vec![];

    // Default config file
    if let Ok(default_config_path) = get_config_dir().map(|d| d.join(CONFIG_FILE_NAME)) {
        if default_config_path.exists() {
            config_vec.push(default_config_path);
        }
    }

    // User-provided config file
    if let Some(config_path) = config_path {
        if config_path.exists() {
            config_vec.push(config_path.clone());
        } else {
            return Err(config::ConfigError::NotFound(format!(
                "Config file {config_path:?} does not exist",
            )));
        }
    }

    build_config(&config_vec, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("slurm.sbatch_args")
}

fn build_config(
    files: &[PathBuf],
    env: config::Environment,
) -> Result<Config, config::ConfigError> {
    tracing::debug!("Loading config from {:?}", files);
    let settings = config::Config::builder();
    let settings = files.iter().fold(settings, |s, path| {
        s.add_source(config::File::from(path.as_path()))
    });

    settings.add_source(env).build()?.try_deserialize()
}
