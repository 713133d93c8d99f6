use std::process::ExitCode;

use clap::Parser;
use deplock::{cli::args::CliArgs, Deplock};
use log::error;

fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();

    let mut builder = Deplock::builder()
        .root(&cli_args.root)
        .config_file_name(&cli_args.config_file);
    if let Some(lock_file) = &cli_args.lock_file {
        builder = builder.lock_file_name(lock_file);
    }
    let deplock = builder.try_build()?;

    match cli_args.cmd {
        deplock::cli::args::Command::WriteLocks { resolved, comment } => {
            deplock.write_locks(&resolved, comment.as_deref())
        }
        deplock::cli::args::Command::CheckLocks { resolved } => deplock.check_locks(&resolved),
        deplock::cli::args::Command::Resolve { report, output } => {
            deplock.resolve(report, output)
        }
        deplock::cli::args::Command::ResolvedVersion {
            resolved,
            group,
            artifact,
        } => {
            let version = deplock.resolved_version(&resolved, &group, &artifact)?;
            println!("{}", version);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
