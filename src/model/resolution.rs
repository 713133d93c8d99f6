use std::{collections::BTreeSet, path::Path};

use log::{debug, warn};
use serde::Deserialize;

use crate::model::ParseError;

use super::{
    dependency::{Coordinate, DependencyRecord, DependencySource},
    groups::DependencyGroupSet,
};

/// Comment carried by intermediate resolved files, which share the lock file format.
pub const RESOLVED_FILE_COMMENT: &str = "Internal resolved lock file, do not edit.";

/// A named bucket of configurations whose resolved dependencies are locked together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationGroup {
    pub name: String,
    pub include: BTreeSet<String>,
}

impl ConfigurationGroup {
    pub fn new(name: impl Into<String>, include: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ConfigurationGroup {
            name: name.into(),
            include: include.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes(&self, configuration: &str) -> bool {
        self.include.contains(configuration)
    }
}

/// Every module-level dependency a build tool resolved for one configuration of one project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfiguration {
    pub project_path: String,
    pub configuration: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Resolution output handed over by the build tool, e.g.
///
/// ```toml
/// [[configurations]]
/// project_path = ":app"
/// configuration = "runtimeClasspath"
/// dependencies = ["org.slf4j:slf4j-api:2.0.9"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionReport {
    #[serde(default)]
    pub configurations: Vec<ResolvedConfiguration>,
}

impl ResolutionReport {
    pub fn from_file(path: &Path) -> Result<ResolutionReport, ParseError> {
        debug!("Reading resolution report {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| ParseError::io(path, e))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(data: &str) -> Result<ResolutionReport, ParseError> {
        Ok(toml::from_str::<ResolutionReport>(data)?)
    }
}

/// Buckets resolved configurations into `groups`, recording each configuration as the source of
/// its dependencies. Configurations no group includes are skipped.
pub fn collect_groups(
    groups: &[ConfigurationGroup],
    report: &ResolutionReport,
) -> Result<DependencyGroupSet, ParseError> {
    let mut collected = DependencyGroupSet::new();

    for group in groups {
        for resolved in report
            .configurations
            .iter()
            .filter(|resolved| group.includes(&resolved.configuration))
        {
            let source = DependencySource::new(&resolved.configuration, &resolved.project_path);
            debug!(
                "Collecting {} dependencies of {} into group {}",
                resolved.dependencies.len(),
                source,
                group.name
            );
            for dependency in &resolved.dependencies {
                let coordinate = dependency.parse::<Coordinate>()?;
                collected.add_or_merge(
                    &group.name,
                    &DependencyRecord::new(coordinate, [source.clone()]),
                );
            }
        }
    }

    for resolved in &report.configurations {
        if !groups.iter().any(|g| g.includes(&resolved.configuration)) {
            warn!(
                "Configuration {} in {} is not part of any configuration group",
                resolved.configuration, resolved.project_path
            );
        }
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    const REPORT: &str = r#"
        [[configurations]]
        project_path = ":"
        configuration = "compileClasspath"
        dependencies = ["org.slf4j:slf4j-api:2.0.9", "com.google.guava:guava:32.1.3-jre"]

        [[configurations]]
        project_path = ":lib"
        configuration = "compileClasspath"
        dependencies = ["org.slf4j:slf4j-api:2.0.9"]

        [[configurations]]
        project_path = ":lib"
        configuration = "testRuntimeClasspath"
        dependencies = ["junit:junit:4.13.2"]

        [[configurations]]
        project_path = ":lib"
        configuration = "annotationProcessor"
        dependencies = ["com.google.auto:auto-common:1.2"]
    "#;

    #[test]
    fn load_report() {
        let report = ResolutionReport::from_toml_str(REPORT).unwrap();
        assert_eq!(report.configurations.len(), 4);
        assert_eq!(
            report.configurations[2],
            ResolvedConfiguration {
                project_path: ":lib".to_string(),
                configuration: "testRuntimeClasspath".to_string(),
                dependencies: vec!["junit:junit:4.13.2".to_string()],
            }
        );
    }

    #[test]
    fn reject_unknown_report_keys() {
        let err = ResolutionReport::from_toml_str(
            r#"
            [[configurations]]
            project = ":"
            configuration = "api"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Toml(_)), "{err}");
    }

    #[test]
    fn collect_into_groups() {
        let report = ResolutionReport::from_toml_str(REPORT).unwrap();
        let groups = vec![
            ConfigurationGroup::new("main", ["compileClasspath"]),
            ConfigurationGroup::new("test", ["compileClasspath", "testRuntimeClasspath"]),
        ];
        let collected = collect_groups(&groups, &report).unwrap();

        assert_eq!(
            collected.group_names().collect::<Vec<_>>(),
            vec!["main", "test"]
        );
        let slf4j = collected.lookup("main", "org.slf4j:slf4j-api:2.0.9").unwrap();
        assert_eq!(
            slf4j.sources.iter().cloned().collect::<Vec<_>>(),
            vec![
                DependencySource::new("compileClasspath", ":"),
                DependencySource::new("compileClasspath", ":lib"),
            ]
        );
        assert!(collected.lookup("main", "junit:junit:4.13.2").is_none());
        assert!(collected.lookup("test", "junit:junit:4.13.2").is_some());
        assert!(collected
            .records("main")
            .chain(collected.records("test"))
            .all(|r| r.id_without_version() != "com.google.auto:auto-common"));
    }

    #[test]
    fn malformed_dependency_fails() {
        let report = ResolutionReport::from_toml_str(
            r#"
            [[configurations]]
            project_path = ":"
            configuration = "api"
            dependencies = ["org.slf4j:slf4j-api"]
            "#,
        )
        .unwrap();
        let err = collect_groups(&[ConfigurationGroup::new("main", ["api"])], &report).unwrap_err();
        assert!(matches!(err, ParseError::MalformedCoordinate(_)));
    }
}
