use std::collections::{BTreeMap, HashMap};

use log::trace;
use thiserror::Error;

use super::dependency::DependencyRecord;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("Expected 'group:module' notation: {0}")]
    MalformedModuleId(String),
    #[error("Configuration group {group} does not contain any reference to {artifact}")]
    NotFound { group: String, artifact: String },
    #[error("Configuration group {group} contains multiple versions of {artifact}: {versions:?}")]
    Ambiguous {
        group: String,
        artifact: String,
        versions: Vec<String>,
    },
}

/// Records of a single group, ordered by artifact then version and indexed by id.
#[derive(Debug, Clone, Default)]
struct Group {
    records: BTreeMap<(String, String), DependencyRecord>,
    by_id: HashMap<String, (String, String)>,
}

impl Group {
    fn get(&self, id: &str) -> Option<&DependencyRecord> {
        self.by_id.get(id).and_then(|key| self.records.get(key))
    }
}

/// Named groups of dependency records.
///
/// Group names iterate alphabetically and records within a group by artifact then version, so
/// anything rendered from a set is stable across runs. Mutation goes exclusively through
/// [`DependencyGroupSet::add_or_merge`] and [`DependencyGroupSet::merge`]; both take `&mut self`,
/// so callers feeding a set from several resolvers must serialize access themselves.
#[derive(Debug, Clone, Default)]
pub struct DependencyGroupSet {
    groups: BTreeMap<String, Group>,
}

impl DependencyGroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a copy of `record` to `group_name`, or unions its sources into the record already
    /// stored under the same `group:module:version`.
    pub fn add_or_merge(&mut self, group_name: &str, record: &DependencyRecord) {
        if !self.groups.contains_key(group_name) {
            self.groups.insert(group_name.to_string(), Group::default());
        }
        let Some(group) = self.groups.get_mut(group_name) else {
            return;
        };

        let id = record.id();
        match group.by_id.get(&id).cloned() {
            Some(key) => {
                if let Some(owned) = group.records.get_mut(&key) {
                    let added = owned.absorb(&record.sources);
                    trace!("Merged {} new source(s) into {} in {}", added, id, group_name);
                }
            }
            None => {
                let key = record.ordering_key();
                group.by_id.insert(id, key.clone());
                group.records.insert(key, record.clone());
            }
        }
    }

    pub fn merge(&mut self, other: &DependencyGroupSet) {
        for (group_name, group) in &other.groups {
            for record in group.records.values() {
                self.add_or_merge(group_name, record);
            }
        }
    }

    /// The record stored for `id` (`group:module:version`) in `group_name`.
    pub fn lookup(&self, group_name: &str, id: &str) -> Option<&DependencyRecord> {
        self.groups.get(group_name).and_then(|group| group.get(id))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn records<'a>(&'a self, group_name: &str) -> impl Iterator<Item = &'a DependencyRecord> {
        self.groups
            .get(group_name)
            .into_iter()
            .flat_map(|group| group.records.values())
    }

    /// Every group with its records, in iteration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, Vec<&DependencyRecord>)> {
        self.groups
            .iter()
            .map(|(name, group)| (name.as_str(), group.records.values().collect()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(|group| group.records.len()).sum()
    }

    /// The single version of `artifact` (`group:module`) resolved in `group_name`.
    pub fn resolved_version(&self, group_name: &str, artifact: &str) -> Result<&str, LookupError> {
        let mut parts = artifact.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(m), None) if !g.is_empty() && !m.is_empty() => {}
            _ => return Err(LookupError::MalformedModuleId(artifact.to_string())),
        }

        let matching: Vec<&DependencyRecord> = self
            .records(group_name)
            .filter(|record| record.id_without_version() == artifact)
            .collect();

        match matching.as_slice() {
            [] => Err(LookupError::NotFound {
                group: group_name.to_string(),
                artifact: artifact.to_string(),
            }),
            [record] => Ok(record.version()),
            _ => Err(LookupError::Ambiguous {
                group: group_name.to_string(),
                artifact: artifact.to_string(),
                versions: matching
                    .iter()
                    .map(|record| record.version().to_string())
                    .collect(),
            }),
        }
    }
}

impl PartialEq for DependencyGroupSet {
    fn eq(&self, other: &Self) -> bool {
        self.groups.len() == other.groups.len()
            && self.groups.iter().all(|(name, group)| {
                other.groups.get(name).is_some_and(|theirs| {
                    group.records.len() == theirs.records.len()
                        && group
                            .records
                            .values()
                            .zip(theirs.records.values())
                            .all(|(a, b)| a == b)
                })
            })
    }
}

impl Eq for DependencyGroupSet {}
