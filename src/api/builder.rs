use std::{env, path::PathBuf};

use crate::{
    config::{DeplockConfig, DEFAULT_CONFIG_FILE_NAME, DEFAULT_LOCK_FILE_NAME},
    Deplock,
};

#[derive(Default)]
pub struct DeplockBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    config_file_name: Option<PathBuf>,
    lock_file_name: Option<PathBuf>,
}

impl DeplockBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the deplock configuration toml file.
    ///
    /// Defaults to `deplock.toml`. A missing file is treated as empty.
    pub fn config_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_name = Some(path.into());
        self
    }

    /// Name of the lock file.
    ///
    /// Overrides `lock.file` from the configuration; defaults to `versions.lock`.
    pub fn lock_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file_name = Some(path.into());
        self
    }

    pub fn try_build(self) -> anyhow::Result<Deplock> {
        let Self {
            root,
            config_file_name,
            lock_file_name,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let config_file_name =
            config_file_name.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_NAME));
        let config = DeplockConfig::load(&root.join(config_file_name))?;

        let lock_file_name = lock_file_name
            .or(config.lock_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE_NAME));

        Ok(Deplock {
            root,
            lock_file_name,
            comment: config.comment.unwrap_or_default(),
            groups: config.groups,
        })
    }
}
