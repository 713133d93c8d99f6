use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::{
    diff::{compare, DriftReport},
    flock::FileLock,
    model::{groups::DependencyGroupSet, lock, ParseError},
    validate::{validate, ConsistencyReport},
};

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Lockfile does not exist: {}, create it using the 'write-locks' command", .0.display())]
    MissingLockFile(PathBuf),
    #[error("{0}")]
    VersionInconsistency(ConsistencyReport),
    #[error("{0}")]
    DriftDetected(DriftReport),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lock(#[from] crate::flock::Error),
}

/// Merges resolved group files, in order, into a single set.
pub fn read_resolved(paths: &[PathBuf]) -> Result<DependencyGroupSet, ParseError> {
    let mut merged = DependencyGroupSet::new();
    for path in paths {
        debug!("Merging resolved dependencies from {}", path.display());
        merged.merge(&lock::read_groups(path)?);
    }
    Ok(merged)
}

/// Validates `groups` and replaces the lock file at `path` with them. Nothing is written when
/// validation fails.
pub fn write_lock_file(
    groups: &DependencyGroupSet,
    comment: &str,
    path: &Path,
) -> Result<(), LockError> {
    validate(groups).map_err(LockError::VersionInconsistency)?;

    let _lock = FileLock::for_lock_file(path)?;
    lock::write_groups(path, groups, comment)?;
    info!("Wrote lockfile to {}", path.display());
    Ok(())
}

/// Verifies that `groups` matches what the lock file at `path` records.
pub fn check_lock_file(groups: &DependencyGroupSet, path: &Path) -> Result<(), LockError> {
    validate(groups).map_err(LockError::VersionInconsistency)?;

    if !path.is_file() {
        return Err(LockError::MissingLockFile(path.to_path_buf()));
    }

    let _lock = FileLock::for_lock_file(path)?;
    let recorded = lock::read_groups(path)?;
    validate(&recorded).map_err(LockError::VersionInconsistency)?;

    let report = compare(groups, &recorded);
    if report.is_clean() {
        debug!("Lockfile {} is up to date", path.display());
        Ok(())
    } else {
        Err(LockError::DriftDetected(report))
    }
}
