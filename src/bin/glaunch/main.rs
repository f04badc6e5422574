use clap::Parser;
use glaunch::LaunchError;
use std::process::ExitCode;

mod cli;
mod commands;
mod help;

fn main() -> ExitCode {
    let args = cli::GLaunch::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.verbose.tracing_level_filter())
        .init();
    tracing::debug!("{:?}", args);

    match commands::handle_commands(args) {
        Ok(code) => to_exit_code(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<LaunchError>())
                .map(LaunchError::exit_code)
                .unwrap_or(glaunch::error::EXIT_FAILURE);
            to_exit_code(code)
        }
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
