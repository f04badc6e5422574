use crate::help::{COMPLETIONS_HELP, RUN_HELP};
use clap::{Args, Parser, ValueEnum};
use clap_complete::Shell as CompleteShell;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use glaunch::core::version;
use glaunch::scheduler::Backend;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "glaunch", author, version = version(), about = "Declares, renders and launches batch jobs. Inspired by sbatch.")]
pub struct GLaunch {
    /// Sub Commands
    #[command(subcommand)]
    pub commands: Commands,

    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    #[arg(long, global = true, help = "Path to the config file")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub enum Commands {
    /// Print the batch script for a job
    Render(RenderArgs),
    /// Hand a job to the scheduler
    Submit(SubmitArgs),
    /// Run a job's command in its working directory
    #[command(after_help = RUN_HELP)]
    Run(RunArgs),
    /// Show the resolved job specification
    Show(ShowArgs),
    /// Create a new job file from the template
    New(NewArgs),
    /// Convert an existing batch script into a job file
    Import(ImportArgs),
    /// Generate tab-completion scripts for your shell
    #[command(
        after_help = COMPLETIONS_HELP,
        arg_required_else_help = true
    )]
    Completions(CompletionsArgs),
}

/// Resource overrides applied on top of the job file. They never change the
/// command the job runs.
#[derive(Debug, Args, Clone, Default)]
pub struct OverrideArgs {
    /// The account to charge
    #[arg(short = 'A', long)]
    pub account: Option<String>,

    /// The GPU count to request
    #[arg(short, long, value_name = "NUMS")]
    pub gpus: Option<u32>,

    /// The CPU count to request
    #[arg(short = 'c', long)]
    pub cpus_per_task: Option<u32>,

    /// Wall-clock limit (e.g. "0-03:00", "90", "2:30:00")
    #[arg(short, long)]
    pub time: Option<String>,

    /// The job name shown by the scheduler
    #[arg(short = 'J', long)]
    pub job_name: Option<String>,
}

#[derive(Debug, Parser)]
pub struct RenderArgs {
    /// The job file
    pub job: PathBuf,

    /// The scheduler backend to render for
    #[arg(short, long)]
    pub backend: Option<Backend>,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Debug, Parser)]
pub struct SubmitArgs {
    /// The job file
    pub job: PathBuf,

    /// The scheduler backend to submit to
    #[arg(short, long)]
    pub backend: Option<Backend>,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// The job file
    pub job: PathBuf,
}

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// The job file
    pub job: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Debug, Parser)]
pub struct NewArgs {
    /// The name of the new job
    pub name: String,

    /// The account to charge
    #[arg(short = 'A', long)]
    pub account: Option<String>,

    /// The Python interpreter to run the module with
    #[arg(long, default_value = "python3")]
    pub python: PathBuf,
}

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// The batch script to read
    pub script: PathBuf,

    /// Where to write the job file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
    Elvish,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// The shell to generate the completions for
    pub shell: Shell,
}

impl From<Shell> for CompleteShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompleteShell::Bash,
            Shell::Elvish => CompleteShell::Elvish,
            Shell::Fish => CompleteShell::Fish,
            Shell::Powershell => CompleteShell::PowerShell,
            Shell::Zsh => CompleteShell::Zsh,
        }
    }
}
