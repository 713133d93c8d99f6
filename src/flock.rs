use std::{
    ffi::OsString,
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::debug;
use thiserror::Error;

const LOCK_TIMEOUT: Duration = Duration::from_secs(300);
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusive advisory lock, released when dropped.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
#[error("Cannot acquire a lock on {path}: {source}")]
pub struct Error {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl FileLock {
    pub fn new(path: &Path) -> Result<Self, Error> {
        let error = |source| Error {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(error)?;
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(_) => {
                    return Ok(Self { _file: file });
                }
                Err(e)
                    if e.raw_os_error() == fs4::lock_contended_error().raw_os_error()
                        && start.elapsed() < LOCK_TIMEOUT =>
                {
                    debug!("Failed to acquire a lock on {}, retrying", path.display());
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(error(e)),
            }
        }
    }

    /// Locks the guard file that serializes writers and checkers of `lock_file`.
    ///
    /// The lock file itself is replaced by rename on write, so it cannot carry the lock.
    /// The guard file stays on disk after the lock is released.
    pub fn for_lock_file(lock_file: &Path) -> Result<Self, Error> {
        Self::new(&guard_path(lock_file))
    }
}

fn guard_path(lock_file: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(lock_file.file_name().unwrap_or(lock_file.as_os_str()));
    name.push(".guard");
    lock_file.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn guard_sits_next_to_lock_file() {
        assert_eq!(
            guard_path(Path::new("/repo/versions.lock")),
            PathBuf::from("/repo/.versions.lock.guard")
        );
        assert_eq!(
            guard_path(Path::new("versions.lock")),
            PathBuf::from(".versions.lock.guard")
        );
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock_file = dir.path().join("versions.lock");
        {
            let _lock = FileLock::for_lock_file(&lock_file).unwrap();
            assert!(dir.path().join(".versions.lock.guard").exists());
        }
        assert!(dir.path().join(".versions.lock.guard").exists());
        assert!(!lock_file.exists());
        FileLock::for_lock_file(&lock_file).unwrap();
    }
}
