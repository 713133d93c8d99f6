use std::path::{Path, PathBuf};

use crate::{
    cli::command_handlers::{do_check, do_resolve, do_resolved_version, do_write},
    model::resolution::ConfigurationGroup,
};

mod builder;

pub use builder::DeplockBuilder;

pub struct Deplock {
    root: PathBuf,
    lock_file_name: PathBuf,
    comment: String,
    groups: Vec<ConfigurationGroup>,
}

impl Deplock {
    pub fn builder() -> DeplockBuilder {
        DeplockBuilder::default()
    }

    /// Aggregates resolved dependency groups, checks them and writes the lock file
    pub fn write_locks(
        &self,
        resolved: &[PathBuf],
        comment: Option<&str>,
    ) -> anyhow::Result<()> {
        do_write(
            &self.root,
            &self.lock_file_path(),
            resolved,
            comment.unwrap_or(&self.comment),
        )
    }

    /// Verifies that resolved dependency groups match the lock file
    pub fn check_locks(&self, resolved: &[PathBuf]) -> anyhow::Result<()> {
        do_check(&self.root, &self.lock_file_path(), resolved)
    }

    /// Buckets a resolution report into the configured groups and writes a resolved file
    pub fn resolve(
        &self,
        report_file_name: impl AsRef<Path>,
        output_file_name: impl AsRef<Path>,
    ) -> anyhow::Result<()> {
        do_resolve(
            &self.root,
            &self.groups,
            report_file_name.as_ref(),
            output_file_name.as_ref(),
        )
    }

    /// The version of `artifact` (`group:module`) resolved in `group`
    pub fn resolved_version(
        &self,
        resolved: &[PathBuf],
        group: &str,
        artifact: &str,
    ) -> anyhow::Result<String> {
        do_resolved_version(&self.root, resolved, group, artifact)
    }

    /// The lock file, resolved against the project root
    pub fn lock_file_path(&self) -> PathBuf {
        self.root.join(&self.lock_file_name)
    }
}
