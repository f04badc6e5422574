pub const COMPLETIONS_HELP: &str = "\
Examples:
  glaunch completions bash > ~/.local/share/bash-completion/completions/glaunch
  glaunch completions zsh > ~/.zfunc/_glaunch
  glaunch completions fish > ~/.config/fish/completions/glaunch.fish";

pub const RUN_HELP: &str = "\
This is the execution step of a job: it changes into the job's working
directory and runs its command, exiting with the command's exit code.
Use it from inside an allocation, e.g. `srun glaunch run job.toml`.";
