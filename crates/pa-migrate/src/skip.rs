//! Classification of server-internal objects that are never transferred.
//!
//! Attribute cubes, hierarchy and subset storage dimensions and similar
//! control objects are rebuilt on the target as a side effect of
//! transferring the dimension or cube that owns them. Names are matched
//! raw, including the leading `}` control marker.
//!
//! Rules read from configuration extend the built-in table; they never
//! replace it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::ObjectKind;

/// Exact names and name prefixes for one object kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRules {
    #[serde(default)]
    pub exact: BTreeSet<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl KindRules {
    fn from_lists(exact: &[&str], prefixes: &[&str]) -> Self {
        Self {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn extend(&mut self, other: KindRules) {
        self.exact.extend(other.exact);
        for prefix in other.prefixes {
            if !self.prefixes.contains(&prefix) {
                self.prefixes.push(prefix);
            }
        }
    }
}

/// Skip table per object kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ConfiguredRules")]
pub struct SkipRules {
    pub dimensions: KindRules,
    pub cubes: KindRules,
    pub processes: KindRules,
}

/// Additional rules as written in configuration.
#[derive(Deserialize)]
struct ConfiguredRules {
    #[serde(default)]
    dimensions: KindRules,
    #[serde(default)]
    cubes: KindRules,
    #[serde(default)]
    processes: KindRules,
}

impl From<ConfiguredRules> for SkipRules {
    fn from(configured: ConfiguredRules) -> Self {
        let mut rules = SkipRules::default();
        rules.dimensions.extend(configured.dimensions);
        rules.cubes.extend(configured.cubes);
        rules.processes.extend(configured.processes);
        rules
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self {
            dimensions: KindRules::from_lists(
                &[
                    "}Clients",
                    "}ApplicationEntries",
                    "}CAMAssociatedGroups",
                    "}CubeProperties",
                ],
                &[
                    "}ElementAttributes_",
                    "}Hierarchies_",
                    "}Subsets_",
                    "}Views_",
                    "}OC",
                ],
            ),
            cubes: KindRules::from_lists(
                &[
                    "}ClientCAMAssociatedGroups",
                    "}CubeProperties",
                    "}ClientGroups",
                    "}ClientProperties",
                ],
                &["}ElementAttributes_", "}OC", "}ElementSecurity_}OC"],
            ),
            processes: KindRules::default(),
        }
    }
}

impl SkipRules {
    /// Rules for a single kind.
    pub fn rules_for(&self, kind: ObjectKind) -> &KindRules {
        match kind {
            ObjectKind::Dimension => &self.dimensions,
            ObjectKind::Cube => &self.cubes,
            ObjectKind::Process => &self.processes,
        }
    }

    /// Whether `name` is an internal object of `kind` that must not be transferred.
    pub fn should_skip(&self, kind: ObjectKind, name: &str) -> bool {
        self.rules_for(kind).matches(name)
    }
}
