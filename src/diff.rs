use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use log::debug;

use crate::model::{
    dependency::{DependencyRecord, DependencySource},
    groups::DependencyGroupSet,
};

/// A single discrepancy between the resolved dependencies and the lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Resolved now, absent from the lock file.
    NewDependency { id: String },
    /// Recorded in the lock file, no longer resolved.
    OrphanedLockEntry { id: String },
    /// The artifact is present on both sides at different versions.
    VersionMismatch {
        artifact: String,
        recorded: Vec<String>,
        current: Vec<String>,
    },
    /// Same coordinate, but pulled in by a different set of sources.
    SourcesChanged {
        id: String,
        removed: Vec<DependencySource>,
        added: Vec<DependencySource>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFindings {
    pub group: String,
    pub findings: Vec<Finding>,
}

/// Findings per group, groups in alphabetical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub groups: Vec<GroupFindings>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn findings(&self, group: &str) -> &[Finding] {
        self.groups
            .iter()
            .find(|g| g.group == group)
            .map(|g| g.findings.as_slice())
            .unwrap_or_default()
    }
}

/// Versions of each artifact (`group:module`) in one group of a set.
fn versions_by_artifact<'a>(
    records: impl Iterator<Item = &'a DependencyRecord>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut versions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in records {
        versions
            .entry(record.id_without_version())
            .or_default()
            .insert(record.version().to_string());
    }
    versions
}

/// Compares freshly resolved dependencies against the ones recorded in the lock file.
///
/// Within a group, findings come out in three passes: new dependencies, then orphaned lock
/// entries and version mismatches, then changed sources. An artifact whose version differs is
/// reported once as a mismatch rather than as a new plus an orphaned entry.
pub fn compare(current: &DependencyGroupSet, recorded: &DependencyGroupSet) -> DriftReport {
    let group_names: BTreeSet<&str> = current
        .group_names()
        .chain(recorded.group_names())
        .collect();

    let mut report = DriftReport::default();
    for group in group_names {
        let findings = compare_group(group, current, recorded);
        if !findings.is_empty() {
            debug!("Group {} has {} finding(s)", group, findings.len());
            report.groups.push(GroupFindings {
                group: group.to_string(),
                findings,
            });
        }
    }
    report
}

fn compare_group(
    group: &str,
    current: &DependencyGroupSet,
    recorded: &DependencyGroupSet,
) -> Vec<Finding> {
    let current_versions = versions_by_artifact(current.records(group));
    let recorded_versions = versions_by_artifact(recorded.records(group));

    let mismatched: BTreeSet<&String> = current_versions
        .iter()
        .filter(|(artifact, versions)| {
            recorded_versions
                .get(*artifact)
                .is_some_and(|recorded| recorded != *versions)
        })
        .map(|(artifact, _)| artifact)
        .collect();

    // Union of both sides in record order, keyed by (artifact, version).
    let all: BTreeMap<(String, String), String> = current
        .records(group)
        .chain(recorded.records(group))
        .map(|record| (record.ordering_key(), record.id()))
        .collect();

    let mut new = Vec::new();
    let mut orphaned_or_mismatched = Vec::new();
    let mut changed = Vec::new();
    let mut reported_mismatches: BTreeSet<&String> = BTreeSet::new();

    for ((artifact, _version), id) in &all {
        let in_current = current.lookup(group, id);
        let in_recorded = recorded.lookup(group, id);

        if mismatched.contains(artifact) {
            if reported_mismatches.insert(artifact) {
                orphaned_or_mismatched.push(Finding::VersionMismatch {
                    artifact: artifact.clone(),
                    recorded: recorded_versions[artifact].iter().cloned().collect(),
                    current: current_versions[artifact].iter().cloned().collect(),
                });
            }
            if let (Some(in_current), Some(in_recorded)) = (in_current, in_recorded) {
                changed.extend(sources_changed(in_current, in_recorded));
            }
            continue;
        }

        match (in_current, in_recorded) {
            (Some(_), None) => new.push(Finding::NewDependency { id: id.clone() }),
            (None, Some(_)) => {
                orphaned_or_mismatched.push(Finding::OrphanedLockEntry { id: id.clone() })
            }
            (Some(in_current), Some(in_recorded)) => {
                changed.extend(sources_changed(in_current, in_recorded))
            }
            (None, None) => {}
        }
    }

    new.into_iter()
        .chain(orphaned_or_mismatched)
        .chain(changed)
        .collect()
}

fn sources_changed(current: &DependencyRecord, recorded: &DependencyRecord) -> Option<Finding> {
    if current.sources == recorded.sources {
        return None;
    }
    Some(Finding::SourcesChanged {
        id: current.id(),
        removed: recorded
            .sources
            .difference(&current.sources)
            .cloned()
            .collect(),
        added: current
            .sources
            .difference(&recorded.sources)
            .cloned()
            .collect(),
    })
}

impl Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::NewDependency { id } => write!(f, "  - {} (new dependency)", id),
            Finding::OrphanedLockEntry { id } => {
                write!(f, "  - {} (only in lockfile, no longer used)", id)
            }
            Finding::VersionMismatch {
                artifact,
                recorded,
                current,
            } => write!(
                f,
                "  - {} (version mismatch, lockfile: {}, current: {})",
                artifact,
                recorded.join(", "),
                current.join(", ")
            ),
            Finding::SourcesChanged { id, removed, added } => {
                write!(f, "  - {} (dependency sources different)", id)?;
                for source in removed {
                    write!(f, "\n        {} (removed source)", source)?;
                }
                for source in added {
                    write!(f, "\n        {} (new source)", source)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dependencies are inconsistent with the lockfile.")?;
        for group in &self.groups {
            writeln!(f, "  Configuration group: {}", group.group)?;
            for finding in &group.findings {
                for line in finding.to_string().lines() {
                    writeln!(f, "      {}", line)?;
                }
            }
        }
        writeln!(f)?;
        writeln!(f, "The following steps may be helpful to resolve the problem:")?;
        writeln!(
            f,
            "  - regenerate the lockfile using 'deplock write-locks', then use git diff to inspect the changes"
        )?;
        write!(
            f,
            "  - run 'gradlew dependencyInsight --configuration someConf --dependency someDep' to inspect dependencies"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dependency::Coordinate;

    use pretty_assertions::assert_eq;

    fn set(entries: &[(&str, &str, &[(&str, &str)])]) -> DependencyGroupSet {
        let mut set = DependencyGroupSet::new();
        for (group, id, sources) in entries {
            set.add_or_merge(
                group,
                &DependencyRecord::new(
                    id.parse::<Coordinate>().unwrap(),
                    sources.iter().map(|(c, p)| DependencySource::new(*c, *p)),
                ),
            );
        }
        set
    }

    #[test]
    fn identical_sets_are_clean() {
        let a = set(&[
            ("api", "a:b:1.0", &[("cfgX", ":proj")]),
            ("test", "c:d:2.0", &[("cfgT", ":")]),
        ]);
        let report = compare(&a, &a.clone());
        assert!(report.is_clean());
    }

    #[test]
    fn new_source() {
        let recorded = set(&[("api", "a:b:1.0", &[("cfgX", ":proj")])]);
        let current = set(&[
            ("api", "a:b:1.0", &[("cfgX", ":proj")]),
            ("api", "a:b:1.0", &[("cfgY", ":proj")]),
        ]);
        let report = compare(&current, &recorded);
        assert_eq!(
            report.findings("api"),
            &[Finding::SourcesChanged {
                id: "a:b:1.0".to_string(),
                removed: vec![],
                added: vec![DependencySource::new("cfgY", ":proj")],
            }]
        );
    }

    #[test]
    fn version_bump_is_a_single_mismatch() {
        let recorded = set(&[("api", "a:b:1.0", &[("cfgX", ":proj")])]);
        let current = set(&[("api", "a:b:2.0", &[("cfgX", ":proj")])]);
        let report = compare(&current, &recorded);
        assert_eq!(
            report.groups,
            vec![GroupFindings {
                group: "api".to_string(),
                findings: vec![Finding::VersionMismatch {
                    artifact: "a:b".to_string(),
                    recorded: vec!["1.0".to_string()],
                    current: vec!["2.0".to_string()],
                }],
            }]
        );
        assert_eq!(
            report.findings("api")[0].to_string(),
            "  - a:b (version mismatch, lockfile: 1.0, current: 2.0)"
        );
    }

    #[test]
    fn removal_is_orphaned() {
        let recorded = set(&[
            ("api", "a:b:1.0", &[("cfgX", ":proj")]),
            ("api", "c:d:1.0", &[("cfgX", ":proj")]),
        ]);
        let current = set(&[("api", "c:d:1.0", &[("cfgX", ":proj")])]);
        let report = compare(&current, &recorded);
        assert_eq!(
            report.findings("api"),
            &[Finding::OrphanedLockEntry {
                id: "a:b:1.0".to_string()
            }]
        );
    }

    #[test]
    fn whole_group_added_or_removed() {
        let recorded = set(&[("old", "a:b:1.0", &[("cfgX", ":")])]);
        let current = set(&[("new", "a:b:1.0", &[("cfgX", ":")])]);
        let report = compare(&current, &recorded);
        assert_eq!(
            report.groups,
            vec![
                GroupFindings {
                    group: "new".to_string(),
                    findings: vec![Finding::NewDependency {
                        id: "a:b:1.0".to_string()
                    }],
                },
                GroupFindings {
                    group: "old".to_string(),
                    findings: vec![Finding::OrphanedLockEntry {
                        id: "a:b:1.0".to_string()
                    }],
                },
            ]
        );
    }

    #[test]
    fn findings_follow_phase_order() {
        let recorded = set(&[
            ("api", "a:a:1", &[("x", ":")]),
            ("api", "b:b:1", &[("x", ":")]),
            ("api", "c:c:1", &[("x", ":")]),
            ("api", "d:d:1", &[("x", ":")]),
        ]);
        let current = set(&[
            ("api", "a:a:1", &[("y", ":")]),
            ("api", "b:b:2", &[("x", ":")]),
            ("api", "d:d:1", &[("x", ":")]),
            ("api", "e:e:1", &[("x", ":")]),
        ]);
        let report = compare(&current, &recorded);
        assert_eq!(
            report.findings("api"),
            &[
                Finding::NewDependency {
                    id: "e:e:1".to_string()
                },
                Finding::VersionMismatch {
                    artifact: "b:b".to_string(),
                    recorded: vec!["1".to_string()],
                    current: vec!["2".to_string()],
                },
                Finding::OrphanedLockEntry {
                    id: "c:c:1".to_string()
                },
                Finding::SourcesChanged {
                    id: "a:a:1".to_string(),
                    removed: vec![DependencySource::new("x", ":")],
                    added: vec![DependencySource::new("y", ":")],
                },
            ]
        );
    }

    #[test]
    fn report_rendering() {
        let recorded = set(&[
            ("api", "a:b:1.0", &[("cfgX", ":proj")]),
            ("test", "c:d:1.0", &[("cfgT", ":")]),
        ]);
        let current = set(&[
            ("api", "a:b:1.0", &[("cfgY", ":proj")]),
            ("test", "c:d:1.0", &[("cfgT", ":")]),
            ("test", "e:f:3.0", &[("cfgT", ":")]),
        ]);
        let rendered = compare(&current, &recorded).to_string();
        assert_eq!(
            rendered,
            "Dependencies are inconsistent with the lockfile.\n\
             \x20 Configuration group: api\n\
             \x20       - a:b:1.0 (dependency sources different)\n\
             \x20             Configuration cfgX in :proj (removed source)\n\
             \x20             Configuration cfgY in :proj (new source)\n\
             \x20 Configuration group: test\n\
             \x20       - e:f:3.0 (new dependency)\n\
             \n\
             The following steps may be helpful to resolve the problem:\n\
             \x20 - regenerate the lockfile using 'deplock write-locks', then use git diff to inspect the changes\n\
             \x20 - run 'gradlew dependencyInsight --configuration someConf --dependency someDep' to inspect dependencies"
        );
    }
}
