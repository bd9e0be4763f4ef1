//! Informational checks over an architecture. None of these block building a
//! model: dangling and self dependencies are ignored there, duplicates resolve
//! to the last record.

use crate::ir::Module;
use crate::model::GROUP_NODE_PREFIX;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Issue {
    DanglingDependency { module: String, dependency: String },
    DuplicateDependency { module: String, dependency: String },
    SelfDependency { module: String },
    DuplicateFilename { filename: String, count: usize },
    /// Filename that collides with the synthetic group or edge ids.
    ReservedFilename { filename: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingDependency { module, dependency } => {
                write!(f, "{module}: depends on unknown module '{dependency}'")
            }
            Self::DuplicateDependency { module, dependency } => {
                write!(f, "{module}: dependency '{dependency}' listed more than once")
            }
            Self::SelfDependency { module } => write!(f, "{module}: depends on itself"),
            Self::DuplicateFilename { filename, count } => {
                write!(f, "{filename}: appears {count} times; the last entry is used")
            }
            Self::ReservedFilename { filename } => write!(
                f,
                "{filename}: filenames must not start with '{GROUP_NODE_PREFIX}' or contain '->'"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn dangling(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| matches!(i, Issue::DanglingDependency { .. }))
    }
}

pub fn validate_architecture(modules: &[Module]) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for module in modules {
        *counts.entry(module.filename.as_str()).or_insert(0) += 1;
    }
    for (filename, count) in &counts {
        if *count > 1 {
            report.issues.push(Issue::DuplicateFilename {
                filename: filename.to_string(),
                count: *count,
            });
        }
    }

    for filename in counts.keys() {
        if filename.starts_with(GROUP_NODE_PREFIX) || filename.contains("->") {
            report.issues.push(Issue::ReservedFilename {
                filename: filename.to_string(),
            });
        }
    }

    for module in modules {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut reported: HashSet<&str> = HashSet::new();
        for dep in &module.dependencies {
            if !seen.insert(dep.as_str()) {
                if reported.insert(dep.as_str()) {
                    report.issues.push(Issue::DuplicateDependency {
                        module: module.filename.clone(),
                        dependency: dep.clone(),
                    });
                }
                continue;
            }
            if *dep == module.filename {
                report.issues.push(Issue::SelfDependency {
                    module: module.filename.clone(),
                });
            } else if !counts.contains_key(dep.as_str()) {
                report.issues.push(Issue::DanglingDependency {
                    module: module.filename.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    if !report.is_clean() {
        tracing::debug!(issues = report.issues.len(), "architecture validation found issues");
    }
    report
}
