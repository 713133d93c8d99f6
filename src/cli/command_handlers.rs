use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::{debug, info, warn};

use crate::{
    locks::{check_lock_file, read_resolved, write_lock_file},
    model::{
        lock,
        resolution::{collect_groups, ConfigurationGroup, ResolutionReport, RESOLVED_FILE_COMMENT},
    },
};

/// Handler to write-locks command
/// Merges the resolved group files, validates them and replaces the lock file
pub fn do_write(
    root: &Path,
    lock_file: &Path,
    resolved: &[PathBuf],
    comment: &str,
) -> anyhow::Result<()> {
    let current = read_resolved(&relative_to(root, resolved))?;
    if current.is_empty() {
        warn!("No resolved dependencies found, the lock file will have no groups");
    }
    debug!("Merged {} resolved dependencies", current.len());
    write_lock_file(&current, comment, lock_file)?;
    Ok(())
}

/// Handler to check-locks command
pub fn do_check(root: &Path, lock_file: &Path, resolved: &[PathBuf]) -> anyhow::Result<()> {
    let current = read_resolved(&relative_to(root, resolved))?;
    debug!("Merged {} resolved dependencies", current.len());
    check_lock_file(&current, lock_file)?;
    info!("Dependencies are consistent with the lockfile");
    Ok(())
}

/// Handler to resolve command
/// Collects the dependencies of every configuration a group includes into a resolved file
pub fn do_resolve(
    root: &Path,
    groups: &[ConfigurationGroup],
    report_file_name: &Path,
    output_file_name: &Path,
) -> anyhow::Result<()> {
    if groups.is_empty() {
        bail!("No configuration groups are configured, nothing to resolve");
    }
    let report = ResolutionReport::from_file(&root.join(report_file_name))?;
    let collected = collect_groups(groups, &report)?;

    let output = root.join(output_file_name);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {}", parent.display()))?;
    }
    lock::write_groups(&output, &collected, RESOLVED_FILE_COMMENT)?;
    info!("Wrote resolved configuration groups to {}", output.display());
    Ok(())
}

/// Handler to resolved-version command
pub fn do_resolved_version(
    root: &Path,
    resolved: &[PathBuf],
    group: &str,
    artifact: &str,
) -> anyhow::Result<String> {
    let current = read_resolved(&relative_to(root, resolved))?;
    let version = current.resolved_version(group, artifact)?;
    Ok(version.to_string())
}

fn relative_to(root: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().map(|path| root.join(path)).collect()
}
