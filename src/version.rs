//! Model version ordering
//!
//! Registries hand out models newest first. The version of a model is the
//! `info.version` string; documents without one sort as the oldest.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::Definition;

/// How version strings are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Plain string comparison ("9" sorts after "10")
    #[default]
    Lexicographic,
    /// Semantic versions where both sides parse, string comparison otherwise
    Semantic,
}

impl VersionOrdering {
    /// Compare two version strings
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrdering::Lexicographic => a.cmp(b),
            VersionOrdering::Semantic => match (parse_semver(a), parse_semver(b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.cmp(b),
            },
        }
    }

    /// Whether `candidate` is strictly newer than `existing`
    pub fn is_newer(&self, candidate: &str, existing: &str) -> bool {
        self.compare(candidate, existing) == Ordering::Greater
    }
}

fn parse_semver(version: &str) -> Option<Version> {
    let version = version.strip_prefix('v').unwrap_or(version);
    Version::parse(version).ok()
}

/// The `info.version` of a model, empty when absent
pub fn model_version(model: &Definition) -> &str {
    model
        .get("info")
        .and_then(|info| info.get("version"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Position at which a model of `version` is inserted into a newest-first list
///
/// Equal versions keep insertion order.
pub fn insertion_index<'a, I>(existing: I, version: &str, ordering: VersionOrdering) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index = 0;
    for current in existing {
        if ordering.is_newer(version, current) {
            break;
        }
        index += 1;
    }
    index
}
