use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fmt::Display,
    str::FromStr,
    sync::OnceLock,
};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ParseError;

const ROOT_PROJECT_PATH: &str = ":";
const COORDINATE_SEPARATOR: char = ':';

/// A `group:module:version` triple identifying a resolved module.
///
/// Every segment is non-empty and free of `:`, so `id()` always parses back to the same
/// coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    group: String,
    module: String,
    version: String,
}

impl Coordinate {
    pub fn new(
        group: impl Into<String>,
        module: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let coordinate = Coordinate {
            group: group.into(),
            module: module.into(),
            version: version.into(),
        };
        let segments = [&coordinate.group, &coordinate.module, &coordinate.version];
        if segments
            .iter()
            .any(|segment| segment.is_empty() || segment.contains(COORDINATE_SEPARATOR))
        {
            return Err(ParseError::MalformedCoordinate(coordinate.id()));
        }
        Ok(coordinate)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.group, self.module, self.version)
    }

    pub fn id_without_version(&self) -> String {
        format!("{}:{}", self.group, self.module)
    }

    /// Key used to order records: the artifact first, then its version.
    pub fn ordering_key(&self) -> (String, String) {
        (self.id_without_version(), self.version.clone())
    }
}

impl FromStr for Coordinate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static COORDINATE: OnceLock<Regex> = OnceLock::new();
        let re = COORDINATE.get_or_init(|| {
            Regex::new(r"^(?P<group>[^:]+):(?P<module>[^:]+):(?P<version>[^:]+)$")
                .expect("coordinate pattern is valid")
        });
        let captures = re
            .captures(s)
            .ok_or_else(|| ParseError::MalformedCoordinate(s.to_string()))?;
        let part = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str())
                .ok_or_else(|| ParseError::MalformedCoordinate(s.to_string()))
        };

        Coordinate::new(part("group")?, part("module")?, part("version")?)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.module, self.version)
    }
}

/// Why a coordinate was pulled in: a configuration of a given project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySource {
    pub configuration: String,
    #[serde(rename = "projectPath")]
    pub project_path: String,
}

impl DependencySource {
    pub fn new(configuration: impl Into<String>, project_path: impl Into<String>) -> Self {
        DependencySource {
            configuration: configuration.into(),
            project_path: project_path.into(),
        }
    }

    pub fn is_root_project(&self) -> bool {
        self.project_path == ROOT_PROJECT_PATH
    }

    /// Fully qualified path of a task in this source's project, e.g. `:app:dependencyInsight`.
    pub fn project_task(&self, task_name: &str) -> String {
        if self.is_root_project() {
            format!(":{}", task_name)
        } else {
            format!("{}:{}", self.project_path, task_name)
        }
    }
}

impl Display for DependencySource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_root_project() {
            write!(f, "Configuration {} in root project", self.configuration)
        } else {
            write!(
                f,
                "Configuration {} in {}",
                self.configuration, self.project_path
            )
        }
    }
}

/// A module coordinate together with every source referencing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub coordinate: Coordinate,
    pub sources: BTreeSet<DependencySource>,
}

impl DependencyRecord {
    pub fn new(coordinate: Coordinate, sources: impl IntoIterator<Item = DependencySource>) -> Self {
        DependencyRecord {
            coordinate,
            sources: sources.into_iter().collect(),
        }
    }

    pub fn id(&self) -> String {
        self.coordinate.id()
    }

    pub fn id_without_version(&self) -> String {
        self.coordinate.id_without_version()
    }

    pub fn version(&self) -> &str {
        self.coordinate.version()
    }

    pub fn ordering_key(&self) -> (String, String) {
        self.coordinate.ordering_key()
    }

    /// Unions `other` into this record's sources, returning how many were new.
    pub(crate) fn absorb<'a>(
        &mut self,
        other: impl IntoIterator<Item = &'a DependencySource>,
    ) -> usize {
        other
            .into_iter()
            .filter(|source| self.sources.insert((*source).clone()))
            .count()
    }
}

impl PartialOrd for DependencyRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key()
            .cmp(&other.ordering_key())
            .then_with(|| self.sources.cmp(&other.sources))
    }
}
