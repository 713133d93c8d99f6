use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::model::resolution::ConfigurationGroup;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "deplock.toml";
pub const DEFAULT_LOCK_FILE_NAME: &str = "versions.lock";

pub struct DeplockConfig {
    pub lock_file: Option<PathBuf>,
    pub comment: Option<String>,
    pub groups: Vec<ConfigurationGroup>,
}

impl DeplockConfig {
    /// Loads `config_file` (optional on disk) with `DEPLOCK_*` environment overrides on top.
    pub fn load(config_file: &Path) -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(Some(config_file), None)?;
        Ok(raw_config.into())
    }
}

impl From<RawConfig> for DeplockConfig {
    fn from(raw_config: RawConfig) -> Self {
        DeplockConfig {
            lock_file: raw_config.lock.file,
            comment: raw_config.lock.comment,
            groups: raw_config
                .groups
                .into_iter()
                .map(|(name, group)| ConfigurationGroup::new(name, group.include))
                .collect(),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    lock: LockConfig,
    #[serde(default)]
    groups: BTreeMap<String, GroupConfig>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct LockConfig {
    file: Option<PathBuf>,
    comment: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GroupConfig {
    #[serde(default)]
    include: Vec<String>,
}

impl RawConfig {
    fn load(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(config_file) = config_file {
            builder = builder.add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("DEPLOCK")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
