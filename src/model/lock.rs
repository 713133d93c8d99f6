use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io::Write,
    path::Path,
};

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::ParseError;

use super::{
    dependency::{Coordinate, DependencyRecord, DependencySource},
    groups::DependencyGroupSet,
};

/// Indentation of the pretty-printed lock file. Changing it rewrites every committed lock file.
const LOCK_FILE_INDENT: &[u8] = b"  ";
/// Number of leading SHA-256 bytes rendered (as hex) into a source key.
const SOURCE_KEY_BYTES: usize = 4;
/// Appended to a source key until it no longer collides with another source set's key.
const SOURCE_KEY_PADDING: char = 'P';
const REFS_MARKER: &str = "refs=";
const IN_MEMORY_ORIGIN: &str = "<in-memory lock file>";
/// Mode requested for a newly created lock file, before the umask applies.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o666;

/// The on-disk lock file.
///
/// Identical source lists are stored once in `because` under a short key; every dependency in
/// `configurationGroups` points at its list as `"{key},refs={number of sources}"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LockFile {
    pub comment: String,
    pub because: BTreeMap<String, Vec<DependencySource>>,
    #[serde(rename = "configurationGroups")]
    pub configuration_groups: IndexMap<String, IndexMap<String, String>>,
}

impl LockFile {
    /// Builds the document for `groups`, deduplicating source sets into `because`.
    pub fn from_groups(groups: &DependencyGroupSet, comment: &str) -> LockFile {
        let mut because: BTreeMap<String, Vec<DependencySource>> = BTreeMap::new();
        let mut keys: HashMap<&BTreeSet<DependencySource>, String> = HashMap::new();
        let mut configuration_groups = IndexMap::new();

        for (group_name, records) in groups.groups() {
            let mut entries = IndexMap::new();
            for record in records {
                let key = keys
                    .entry(&record.sources)
                    .or_insert_with(|| {
                        insert_padded(
                            &mut because,
                            source_key(&record.sources),
                            record.sources.iter().cloned().collect(),
                        )
                    })
                    .clone();
                entries.insert(
                    record.id(),
                    format!("{},{}{}", key, REFS_MARKER, record.sources.len()),
                );
            }
            configuration_groups.insert(group_name.to_string(), entries);
        }

        LockFile {
            comment: comment.to_string(),
            because,
            configuration_groups,
        }
    }

    /// Rebuilds the dependency groups this document describes.
    pub fn to_groups(&self) -> Result<DependencyGroupSet, ParseError> {
        self.to_groups_from(IN_MEMORY_ORIGIN)
    }

    fn to_groups_from(&self, origin: &str) -> Result<DependencyGroupSet, ParseError> {
        let mut groups = DependencyGroupSet::new();
        for (group_name, entries) in &self.configuration_groups {
            for (dependency, reference) in entries {
                let (key, _refs) = reference.split_once(',').ok_or_else(|| {
                    ParseError::corrupt(
                        origin,
                        format!("entry `{dependency}` has no source reference: `{reference}`"),
                    )
                })?;
                let sources = self.because.get(key).ok_or_else(|| {
                    ParseError::corrupt(
                        origin,
                        format!("entry `{dependency}` references unknown source key `{key}`"),
                    )
                })?;
                let coordinate = dependency.parse::<Coordinate>()?;
                groups.add_or_merge(
                    group_name,
                    &DependencyRecord::new(coordinate, sources.iter().cloned()),
                );
            }
        }
        Ok(groups)
    }

    pub fn from_str(s: &str) -> Result<LockFile, ParseError> {
        Self::parse(s, IN_MEMORY_ORIGIN)
    }

    fn parse(s: &str, origin: &str) -> Result<LockFile, ParseError> {
        serde_json::from_str::<LockFile>(s).map_err(|e| ParseError::corrupt(origin, e.to_string()))
    }

    pub fn to_string(&self) -> Result<String, ParseError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(LOCK_FILE_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        out.push(b'\n');
        Ok(String::from_utf8(out).expect("serde_json emits UTF-8"))
    }

    pub fn from_file(path: &Path) -> Result<LockFile, ParseError> {
        debug!("Reading lock file {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| ParseError::io(path, e))?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Writes the document next to `path` and renames it into place, so readers never observe
    /// a partially written lock file. An existing file keeps its permissions; a new one gets the
    /// umask default.
    pub fn write_file(&self, path: &Path) -> Result<(), ParseError> {
        let contents = self.to_string()?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(NEW_FILE_MODE));
        }
        let mut file = builder
            .tempfile_in(parent)
            .map_err(|e| ParseError::io(parent, e))?;
        if let Ok(metadata) = std::fs::metadata(path) {
            file.as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| ParseError::io(file.path(), e))?;
        }
        file.write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ParseError::io(file.path(), e))?;
        file.persist(path)
            .map_err(|e| ParseError::io(path, e.error))?;
        Ok(())
    }
}

/// Reads the dependency groups recorded in the lock file at `path`.
pub fn read_groups(path: &Path) -> Result<DependencyGroupSet, ParseError> {
    LockFile::from_file(path)?.to_groups_from(&path.display().to_string())
}

pub fn write_groups(
    path: &Path,
    groups: &DependencyGroupSet,
    comment: &str,
) -> Result<(), ParseError> {
    LockFile::from_groups(groups, comment).write_file(path)
}

/// Stores `sources` under `key`, padding the key while it belongs to another source set.
fn insert_padded(
    because: &mut BTreeMap<String, Vec<DependencySource>>,
    mut key: String,
    sources: Vec<DependencySource>,
) -> String {
    while because.contains_key(&key) {
        trace!("Source key {} already taken, padding", key);
        key.push(SOURCE_KEY_PADDING);
    }
    because.insert(key.clone(), sources);
    key
}

/// Hex rendering of the leading SHA-256 bytes over the sorted source set, each source written as
/// `configuration NUL projectPath LF`.
fn source_key(sources: &BTreeSet<DependencySource>) -> String {
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.configuration.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.project_path.as_bytes());
        hasher.update([b'\n']);
    }
    hasher.finalize()[..SOURCE_KEY_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
