//! Resource directives of a batch script.
//!
//! Rendering turns a [`JobSpec`] into the ordered `#SBATCH` lines a
//! Slurm-style scheduler reads; importing goes the other way and recovers a
//! [`JobSpec`] from an existing batch script.

use crate::core::job::{Invocation, JobSpec, DEFAULT_TIME_LIMIT};
use crate::error::LaunchError;
use crate::utils::parsers::TimeLimit;
use crate::utils::split_words;
use clap::Parser;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const DIRECTIVE_PREFIX: &str = "#SBATCH";

static DIRECTIVE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#SBATCH\s+(.*)$").expect("valid directive regex"));

static GPU_GRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^gpu(?::[A-Za-z][A-Za-z0-9_.-]*)?(?::(\d+))?$").expect("valid gres regex")
});

/// One `#SBATCH --key=value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub key: &'static str,
    pub value: String,
}

impl Directive {
    fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DIRECTIVE_PREFIX} --{}={}", self.key, quote_value(&self.value))
    }
}

/// Directive values are written bare unless they hold characters a shell
/// would split on or expand. `gpu:2` and `0-03:00` stay as they are.
fn quote_value(value: &str) -> Cow<'_, str> {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.:/,=@%+".contains(c));
    if bare {
        Cow::Borrowed(value)
    } else {
        shell_escape::unix::escape(Cow::Borrowed(value))
    }
}

/// Directives declaring the resources of `spec`, in a fixed order.
///
/// The GPU request is left out entirely when the job asks for no GPUs.
pub fn render_directives(spec: &JobSpec) -> Vec<Directive> {
    let mut directives = vec![Directive::new("account", spec.account())];
    if spec.gpus() > 0 {
        directives.push(Directive::new("gres", format!("gpu:{}", spec.gpus())));
    }
    directives.push(Directive::new(
        "cpus-per-task",
        spec.cpus_per_task().to_string(),
    ));
    directives.push(Directive::new("time", spec.time_limit().to_string()));
    if let Some(name) = spec.job_name() {
        directives.push(Directive::new("job-name", name));
    }
    directives
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true, args_override_self = true, disable_help_flag = true)]
struct DirectiveArgs {
    #[arg(short = 'A', long)]
    account: Option<String>,
    #[arg(long)]
    gres: Option<String>,
    #[arg(short = 'c', long)]
    cpus_per_task: Option<u32>,
    #[arg(short = 't', long)]
    time: Option<String>,
    #[arg(short = 'J', long)]
    job_name: Option<String>,
}

/// What could be recovered from an existing batch script.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportedScript {
    pub account: Option<String>,
    pub gpus: Option<u32>,
    pub cpus_per_task: Option<u32>,
    pub time_limit: Option<TimeLimit>,
    pub job_name: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub command: Option<Invocation>,
}

impl ImportedScript {
    /// Turn the imported pieces into a validated specification.
    ///
    /// A script without a GPU request asks for zero GPUs, and one without a
    /// CPU request asks for a single CPU, as the scheduler would assume. A
    /// missing time limit falls back to the reference job's limit.
    pub fn into_spec(self, default_account: Option<&str>) -> Result<JobSpec, LaunchError> {
        let account = self
            .account
            .or_else(|| default_account.map(str::to_string))
            .ok_or_else(|| LaunchError::validation("script has no account directive"))?;
        let work_dir = self
            .work_dir
            .ok_or_else(|| LaunchError::validation("script has no `cd <dir>` line"))?;
        let command = self
            .command
            .ok_or_else(|| LaunchError::validation("script runs no command"))?;

        let mut builder = JobSpec::builder()
            .account(account)
            .gpus(self.gpus.unwrap_or(0))
            .cpus_per_task(self.cpus_per_task.unwrap_or(1))
            .time_limit(
                self.time_limit
                    .map(|t| t.as_duration())
                    .unwrap_or(DEFAULT_TIME_LIMIT),
            )
            .work_dir(work_dir)
            .command(command);
        if let Some(name) = self.job_name {
            builder = builder.job_name(name);
        }
        builder.build()
    }
}

/// Read the directives, working directory and command of a batch script.
///
/// Only the last command line is kept; earlier ones (environment setup and
/// the like) are reported and dropped.
pub fn parse_batch_script(contents: &str) -> Result<ImportedScript, LaunchError> {
    let mut directive_words = Vec::new();
    let mut imported = ImportedScript::default();

    for line in contents.lines() {
        let line = line.trim();
        if let Some(caps) = DIRECTIVE_LINE.captures(line) {
            directive_words.extend(split_words(&caps[1])?);
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut words = split_words(line)?;
        if let Some(pos) = words
            .iter()
            .position(|w| matches!(w.as_str(), "||" | "&&" | ";"))
        {
            words.truncate(pos);
        }
        let head = words.first().cloned();
        match head.as_deref() {
            None => {}
            Some("cd") => {
                let dir = words
                    .get(1)
                    .ok_or_else(|| LaunchError::parse(format!("`{line}` has no directory")))?;
                if imported.work_dir.is_none() {
                    imported.work_dir = Some(PathBuf::from(dir));
                } else {
                    tracing::warn!("Ignoring later directory change: {line}");
                }
            }
            Some(_) => {
                if words[0] == "exec" {
                    words.remove(0);
                }
                if words.is_empty() {
                    continue;
                }
                if let Some(previous) = imported.command.take() {
                    tracing::warn!("Ignoring earlier command line: {}", previous.argv().join(" "));
                }
                let program = words.remove(0);
                imported.command = Some(Invocation::new(program, words));
            }
        }
    }

    let args = DirectiveArgs::try_parse_from(&directive_words)
        .map_err(|e| LaunchError::parse(format!("unsupported directive: {e}")))?;

    imported.account = args.account;
    imported.cpus_per_task = args.cpus_per_task;
    imported.job_name = args.job_name;
    imported.gpus = args.gres.as_deref().map(parse_gpu_gres).transpose()?;
    imported.time_limit = args.time.as_deref().map(str::parse).transpose()?;
    Ok(imported)
}

/// GPU count of a `--gres` value such as `gpu:2`, `gpu:a100:4` or `gpu`.
///
/// # Examples
///
/// ```
/// use glaunch::core::directives::parse_gpu_gres;
///
/// assert_eq!(parse_gpu_gres("gpu:2").unwrap(), 2);
/// assert_eq!(parse_gpu_gres("gpu:a100:4").unwrap(), 4);
/// assert_eq!(parse_gpu_gres("gpu").unwrap(), 1);
/// assert_eq!(parse_gpu_gres("shard:1,gpu:3").unwrap(), 3);
/// ```
pub fn parse_gpu_gres(gres: &str) -> Result<u32, LaunchError> {
    for entry in gres.split(',').map(str::trim) {
        if let Some(caps) = GPU_GRES.captures(entry) {
            return match caps.get(1) {
                Some(count) => count
                    .as_str()
                    .parse::<u32>()
                    .map_err(|_| LaunchError::parse(format!("invalid GPU count in '{gres}'"))),
                None => Ok(1),
            };
        }
    }
    Err(LaunchError::parse(format!("no GPU request in gres '{gres}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::tests::heatmap_spec;
    use std::path::Path;

    const HEATMAP_SCRIPT: &str = r#"#!/bin/bash
#SBATCH --account=def-seals
#SBATCH --gres=gpu:2
#SBATCH --cpus-per-task=64
#SBATCH --time=0-03:00
cd /home/user/heatmap
/home/user/venv/bin/python -m create_heatmap --chunks 4
"#;

    #[test]
    fn renders_reference_directives_in_order() {
        let lines: Vec<String> = render_directives(&heatmap_spec())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec![
                "#SBATCH --account=def-seals",
                "#SBATCH --gres=gpu:2",
                "#SBATCH --cpus-per-task=64",
                "#SBATCH --time=0-03:00",
            ]
        );
    }

    #[test]
    fn omits_gres_without_gpus_and_appends_job_name() {
        let spec = heatmap_spec()
            .to_builder()
            .gpus(0)
            .job_name("heatmap")
            .build()
            .unwrap();
        let keys: Vec<&str> = render_directives(&spec).iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["account", "cpus-per-task", "time", "job-name"]);
    }

    #[test]
    fn imports_reference_script() {
        let imported = parse_batch_script(HEATMAP_SCRIPT).unwrap();
        assert_eq!(imported.account.as_deref(), Some("def-seals"));
        assert_eq!(imported.gpus, Some(2));
        assert_eq!(imported.cpus_per_task, Some(64));
        assert_eq!(imported.work_dir.as_deref(), Some(Path::new("/home/user/heatmap")));

        let spec = imported.into_spec(None).unwrap();
        assert_eq!(spec, heatmap_spec());
    }

    #[test]
    fn imports_short_flags_and_guarded_cd() {
        let script = r#"#!/bin/sh
#SBATCH -A proj
#SBATCH -c 8 -t 90
#SBATCH -J "my job"
cd '/scratch/run dir' || exit 1
module load python
exec python3 train.py --epochs 2
"#;
        let spec = parse_batch_script(script).unwrap().into_spec(None).unwrap();
        assert_eq!(spec.account(), "proj");
        assert_eq!(spec.gpus(), 0);
        assert_eq!(spec.cpus_per_task(), 8);
        assert_eq!(spec.time_limit().to_string(), "0-01:30");
        assert_eq!(spec.job_name(), Some("my job"));
        assert_eq!(spec.work_dir(), Path::new("/scratch/run dir"));
        assert_eq!(
            spec.command().argv(),
            vec!["python3", "train.py", "--epochs", "2"]
        );
    }

    #[test]
    fn quotes_only_free_text_values() {
        let spec = heatmap_spec()
            .to_builder()
            .account("def-seals:gpu")
            .job_name("seal heatmap")
            .build()
            .unwrap();
        let lines: Vec<String> = render_directives(&spec)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines[0], "#SBATCH --account=def-seals:gpu");
        assert_eq!(lines[1], "#SBATCH --gres=gpu:2");
        assert_eq!(lines[3], "#SBATCH --time=0-03:00");
        assert_eq!(lines[4], "#SBATCH --job-name='seal heatmap'");
    }

    #[test]
    fn first_cd_sets_work_dir() {
        let imported = parse_batch_script("cd /first\ncd /second\nrun\n").unwrap();
        assert_eq!(imported.work_dir.as_deref(), Some(Path::new("/first")));
    }

    #[test]
    fn cd_guard_without_spaces_is_stripped() {
        for script in ["cd /a||exit 1\nrun\n", "cd /a&&run\n", "cd /a;run\n"] {
            let imported = parse_batch_script(script).unwrap();
            assert_eq!(imported.work_dir.as_deref(), Some(Path::new("/a")), "{script}");
        }
        let quoted = parse_batch_script("cd '/a;b' || exit 1\nrun\n").unwrap();
        assert_eq!(quoted.work_dir.as_deref(), Some(Path::new("/a;b")));
    }

    #[test]
    fn later_directives_override_earlier_ones() {
        let script = "#SBATCH --time=10\n#SBATCH --time=0-02:00\ncd /a\nrun\n";
        let imported = parse_batch_script(script).unwrap();
        assert_eq!(imported.time_limit.unwrap().to_string(), "0-02:00");
    }

    #[test]
    fn rejects_unknown_directives() {
        let script = "#SBATCH --partition=gpu\ncd /a\nrun\n";
        let err = parse_batch_script(script).unwrap_err();
        assert!(err.to_string().contains("unsupported directive"));
    }

    #[test]
    fn import_requires_work_dir_and_command() {
        let no_cd = parse_batch_script("#SBATCH -A a\nrun\n").unwrap();
        assert!(no_cd.into_spec(None).is_err());

        let no_command = parse_batch_script("#SBATCH -A a\ncd /a\n").unwrap();
        assert!(no_command.into_spec(None).is_err());

        let no_account = parse_batch_script("cd /a\nrun\n").unwrap();
        assert!(no_account.clone().into_spec(None).is_err());
        assert_eq!(no_account.into_spec(Some("fallback")).unwrap().account(), "fallback");
    }

    #[test]
    fn parses_gres_forms() {
        assert_eq!(parse_gpu_gres("gpu:8").unwrap(), 8);
        assert_eq!(parse_gpu_gres("gpu:v100:1").unwrap(), 1);
        assert!(parse_gpu_gres("shard:2").is_err());
        assert!(parse_gpu_gres("gpu:x:y").is_err());
    }
}
