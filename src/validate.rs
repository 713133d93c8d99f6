use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use log::debug;

use crate::model::{dependency::DependencySource, groups::DependencyGroupSet};

const INSIGHT_TASK: &str = "dependencyInsight";

/// Every group that resolves the same artifact at more than one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub groups: Vec<GroupConflicts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConflicts {
    pub group: String,
    pub conflicts: Vec<VersionConflict>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    /// `group:module`
    pub artifact: String,
    pub versions: Vec<ConflictingVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingVersion {
    pub version: String,
    pub sources: BTreeSet<DependencySource>,
}

/// Checks that no group holds two versions of the same `group:module`.
pub fn validate(groups: &DependencyGroupSet) -> Result<(), ConsistencyReport> {
    let mut report = ConsistencyReport { groups: vec![] };

    for (group_name, records) in groups.groups() {
        let mut by_artifact: BTreeMap<String, Vec<ConflictingVersion>> = BTreeMap::new();
        for record in records {
            by_artifact
                .entry(record.id_without_version())
                .or_default()
                .push(ConflictingVersion {
                    version: record.version().to_string(),
                    sources: record.sources.clone(),
                });
        }

        let conflicts: Vec<VersionConflict> = by_artifact
            .into_iter()
            .filter(|(_, versions)| versions.len() > 1)
            .map(|(artifact, versions)| VersionConflict { artifact, versions })
            .collect();

        if !conflicts.is_empty() {
            debug!(
                "Group {} has {} inconsistent artifact(s)",
                group_name,
                conflicts.len()
            );
            report.groups.push(GroupConflicts {
                group: group_name.to_string(),
                conflicts,
            });
        }
    }

    if report.groups.is_empty() {
        Ok(())
    } else {
        Err(report)
    }
}

impl Display for ConsistencyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for group in &self.groups {
            writeln!(
                f,
                "Multiple versions of the same dependency found in group '{}':",
                group.group
            )?;
            writeln!(f)?;
            for (index, conflict) in group.conflicts.iter().enumerate() {
                writeln!(f, "  {}) {}", index + 1, conflict.artifact)?;
                for version in &conflict.versions {
                    writeln!(f, "       - version {} used by:", version.version)?;
                    for source in &version.sources {
                        writeln!(f, "           {}", source)?;
                    }
                }
                writeln!(f, "     more insight into these dependencies:")?;
                for version in &conflict.versions {
                    for source in &version.sources {
                        writeln!(
                            f,
                            "       gradlew {} --dependency \"{}\" --configuration \"{}\"",
                            source.project_task(INSIGHT_TASK),
                            conflict.artifact,
                            source.configuration
                        )?;
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dependency::DependencyRecord;

    use pretty_assertions::assert_eq;

    fn add(set: &mut DependencyGroupSet, group: &str, id: &str, configuration: &str) {
        set.add_or_merge(
            group,
            &DependencyRecord::new(
                id.parse().unwrap(),
                [DependencySource::new(configuration, ":")],
            ),
        );
    }

    #[test]
    fn consistent_groups_pass() {
        let mut set = DependencyGroupSet::new();
        add(&mut set, "main", "g:m:1.0", "api");
        add(&mut set, "main", "g:other:2.0", "api");
        add(&mut set, "test", "g:m:2.0", "test");
        assert_eq!(validate(&set), Ok(()));
    }

    #[test]
    fn two_versions_in_one_group_conflict() {
        let mut set = DependencyGroupSet::new();
        add(&mut set, "main", "g:m:1.0", "api");
        add(&mut set, "main", "g:m:2.0", "impl");
        add(&mut set, "main", "g:other:1.0", "api");

        let report = validate(&set).unwrap_err();
        assert_eq!(
            report,
            ConsistencyReport {
                groups: vec![GroupConflicts {
                    group: "main".to_string(),
                    conflicts: vec![VersionConflict {
                        artifact: "g:m".to_string(),
                        versions: vec![
                            ConflictingVersion {
                                version: "1.0".to_string(),
                                sources: [DependencySource::new("api", ":")].into_iter().collect(),
                            },
                            ConflictingVersion {
                                version: "2.0".to_string(),
                                sources: [DependencySource::new("impl", ":")].into_iter().collect(),
                            },
                        ],
                    }],
                }],
            }
        );
    }

    #[test]
    fn every_offending_group_is_reported() {
        let mut set = DependencyGroupSet::new();
        add(&mut set, "a", "g:m:1.0", "api");
        add(&mut set, "a", "g:m:2.0", "api");
        add(&mut set, "b", "x:y:1", "api");
        add(&mut set, "b", "x:y:2", "api");
        add(&mut set, "b", "x:z:1", "api");
        add(&mut set, "b", "x:z:3", "api");
        add(&mut set, "c", "x:y:1", "api");

        let report = validate(&set).unwrap_err();
        let summary: Vec<(String, Vec<String>)> = report
            .groups
            .iter()
            .map(|g| {
                (
                    g.group.clone(),
                    g.conflicts.iter().map(|c| c.artifact.clone()).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a".to_string(), vec!["g:m".to_string()]),
                ("b".to_string(), vec!["x:y".to_string(), "x:z".to_string()]),
            ]
        );
    }

    #[test]
    fn report_rendering() {
        let mut set = DependencyGroupSet::new();
        add(&mut set, "main", "g:m:1.0", "api");
        set.add_or_merge(
            "main",
            &DependencyRecord::new(
                "g:m:2.0".parse().unwrap(),
                [DependencySource::new("runtimeClasspath", ":lib")],
            ),
        );

        let rendered = validate(&set).unwrap_err().to_string();
        assert_eq!(
            rendered,
            "Multiple versions of the same dependency found in group 'main':\n\
             \n\
             \x20 1) g:m\n\
             \x20      - version 1.0 used by:\n\
             \x20          Configuration api in root project\n\
             \x20      - version 2.0 used by:\n\
             \x20          Configuration runtimeClasspath in :lib\n\
             \x20    more insight into these dependencies:\n\
             \x20      gradlew :dependencyInsight --dependency \"g:m\" --configuration \"api\"\n\
             \x20      gradlew :lib:dependencyInsight --dependency \"g:m\" --configuration \"runtimeClasspath\"\n\
             \n"
        );
    }
}
