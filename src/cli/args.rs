use std::path::PathBuf;

use clap::Parser;

/// Tracks resolved dependencies of a multi-module build and detects drift against a lock file.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Project root, all other paths are relative to it
    #[clap(short, long, default_value = ".")]
    pub root: PathBuf,
    /// Configuration file with the lock file settings and configuration groups
    #[clap(short, long, default_value = "deplock.toml")]
    pub config_file: PathBuf,
    /// Lock file location, overrides the configuration file
    #[clap(short, long, env = "DEPLOCK_LOCK_FILE")]
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub enum Command {
    ///Aggregates resolved dependency groups and writes the lock file
    WriteLocks {
        /// Resolved dependency group files, merged in order
        #[clap(long = "resolved", required = true)]
        resolved: Vec<PathBuf>,
        /// Free-text comment stored at the top of the lock file
        #[clap(long)]
        comment: Option<String>,
    },
    ///Compares resolved dependency groups against the lock file
    CheckLocks {
        /// Resolved dependency group files, merged in order
        #[clap(long = "resolved", required = true)]
        resolved: Vec<PathBuf>,
    },
    ///Buckets a resolution report into the configured groups and writes a resolved file
    Resolve {
        /// TOML resolution report produced by the build tool
        #[clap(long)]
        report: PathBuf,
        /// Where to write the resolved dependency groups
        #[clap(short, long, default_value = "resolved-configuration-groups.json")]
        output: PathBuf,
    },
    ///Prints the version of group:module resolved within a configuration group
    ResolvedVersion {
        /// Resolved dependency group files, merged in order
        #[clap(long = "resolved", required = true)]
        resolved: Vec<PathBuf>,
        #[clap(short, long)]
        group: String,
        /// Artifact in group:module notation
        artifact: String,
    },
}
