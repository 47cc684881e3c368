//! Per-dimension axis roles and query assembly.
//!
//! Every data transfer builds its query the same way: one [`AxisRole`] per
//! cube dimension, each turned into a column-axis set, cross-joined with
//! empty tuples suppressed.

use super::{HierarchySet, MdxBuilder, Member};
use crate::core::ElementType;

/// Members removed from a full hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Nothing,
    /// Level-0 members; only consolidations remain.
    Leaves,
    /// String elements; only numeric and consolidated members remain.
    StringElements,
}

/// How one dimension participates in a query.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisRole {
    /// Listed elements and all their descendants, optionally level 0 only.
    FilteredElements {
        hierarchy: Option<String>,
        elements: Vec<String>,
        leaves_only: bool,
    },
    /// A single element of the time dimension.
    TimeSlice(String),
    /// All members of the default hierarchy.
    Measure,
    /// All leaves of the default hierarchy.
    LeavesOnly,
    /// All members of a hierarchy, less an exclusion.
    FullHierarchy {
        hierarchy: Option<String>,
        exclude: Exclusion,
    },
}

impl AxisRole {
    pub fn full(hierarchy: &str, exclude: Exclusion) -> Self {
        AxisRole::FullHierarchy {
            hierarchy: Some(hierarchy.to_string()),
            exclude,
        }
    }

    /// Hierarchy this role selects from; `None` means the default one.
    pub fn hierarchy(&self) -> Option<&str> {
        match self {
            AxisRole::FilteredElements { hierarchy, .. }
            | AxisRole::FullHierarchy { hierarchy, .. } => hierarchy.as_deref(),
            _ => None,
        }
    }

    /// Column-axis set for `dimension` under this role.
    pub fn synthesize(&self, dimension: &str) -> HierarchySet {
        let hierarchy = self.hierarchy().unwrap_or(dimension);
        match self {
            AxisRole::FilteredElements {
                elements,
                leaves_only,
                ..
            } => {
                let members = elements
                    .iter()
                    .map(|e| Member::new(dimension, hierarchy, e.as_str()))
                    .collect();
                let set = HierarchySet::members(members).drill_down_recursive();
                if *leaves_only {
                    set.filter_by_level(0)
                } else {
                    set
                }
            }
            AxisRole::TimeSlice(element) => {
                HierarchySet::members(vec![Member::of(dimension, element.as_str())])
            }
            AxisRole::Measure => HierarchySet::all_members(dimension, dimension),
            AxisRole::LeavesOnly => HierarchySet::all_leaves(dimension, dimension),
            AxisRole::FullHierarchy { exclude, .. } => {
                let all = HierarchySet::all_members(dimension, hierarchy);
                match exclude {
                    Exclusion::Nothing => all,
                    Exclusion::Leaves => all.clone().except(all.filter_by_level(0)),
                    Exclusion::StringElements => all.clone().except(all.filter_by_element_type(
                        dimension,
                        hierarchy,
                        ElementType::String,
                    )),
                }
            }
        }
    }
}

/// A dimension with its role in one query.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    pub dimension: String,
    pub role: AxisRole,
}

impl AxisSpec {
    pub fn new(dimension: impl Into<String>, role: AxisRole) -> Self {
        Self {
            dimension: dimension.into(),
            role,
        }
    }
}

/// Render the query for `cube` with one set per axis spec, in order,
/// suppressing empty tuples.
pub fn build_query(cube: &str, axes: &[AxisSpec]) -> String {
    axes.iter()
        .fold(MdxBuilder::from_cube(cube), |builder, axis| {
            builder.add_hierarchy_set_to_column_axis(axis.role.synthesize(&axis.dimension))
        })
        .columns_non_empty()
        .to_mdx()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_only_uses_default_hierarchy() {
        assert_eq!(
            AxisRole::LeavesOnly.synthesize("Region").to_mdx(),
            "{TM1FILTERBYLEVEL({TM1SUBSETALL([Region].[Region])},0)}"
        );
    }

    #[test]
    fn test_measure_is_unrestricted() {
        assert_eq!(
            AxisRole::Measure.synthesize("Measure").to_mdx(),
            "{TM1SUBSETALL([Measure].[Measure])}"
        );
    }

    #[test]
    fn test_time_slice_single_member() {
        assert_eq!(
            AxisRole::TimeSlice("Jan".into()).synthesize("Month").to_mdx(),
            "{[Month].[Month].[Jan]}"
        );
    }

    #[test]
    fn test_filtered_elements_leaves() {
        let role = AxisRole::FilteredElements {
            hierarchy: None,
            elements: vec!["Europe".into(), "Asia".into()],
            leaves_only: true,
        };
        assert_eq!(
            role.synthesize("Region").to_mdx(),
            "{TM1FILTERBYLEVEL({TM1DRILLDOWNMEMBER({[Region].[Region].[Europe],\
             [Region].[Region].[Asia]},ALL,RECURSIVE)},0)}"
        );
    }

    #[test]
    fn test_filtered_elements_alternate_hierarchy_keeps_consolidations() {
        let role = AxisRole::FilteredElements {
            hierarchy: Some("ByManager".into()),
            elements: vec!["Nordics".into()],
            leaves_only: false,
        };
        assert_eq!(
            role.synthesize("Region").to_mdx(),
            "{TM1DRILLDOWNMEMBER({[Region].[ByManager].[Nordics]},ALL,RECURSIVE)}"
        );
    }

    #[test]
    fn test_full_hierarchy_without_leaves() {
        let role = AxisRole::full("ByManager", Exclusion::Leaves);
        assert_eq!(
            role.synthesize("Region").to_mdx(),
            "{EXCEPT({TM1SUBSETALL([Region].[ByManager])},\
             {TM1FILTERBYLEVEL({TM1SUBSETALL([Region].[ByManager])},0)})}"
        );
    }

    #[test]
    fn test_full_hierarchy_default_when_unset() {
        let role = AxisRole::FullHierarchy {
            hierarchy: None,
            exclude: Exclusion::Nothing,
        };
        assert_eq!(
            role.synthesize("Version").to_mdx(),
            "{TM1SUBSETALL([Version].[Version])}"
        );
    }

    #[test]
    fn test_full_hierarchy_without_strings() {
        let mdx = AxisRole::full("Measure", Exclusion::StringElements)
            .synthesize("Measure")
            .to_mdx();
        assert!(mdx.starts_with("{EXCEPT({TM1SUBSETALL([Measure].[Measure])},{FILTER("));
        assert!(mdx.contains("PROPERTIES(\"ELEMENT_TYPE\")=\"2\""));
    }

    #[test]
    fn test_build_query_orders_axes() {
        let mdx = build_query(
            "Sales",
            &[
                AxisSpec::new("D1", AxisRole::LeavesOnly),
                AxisSpec::new("D2", AxisRole::LeavesOnly),
                AxisSpec::new("Measure", AxisRole::Measure),
            ],
        );
        assert_eq!(
            mdx,
            "SELECT\nNON EMPTY {TM1FILTERBYLEVEL({TM1SUBSETALL([D1].[D1])},0)} * \
             {TM1FILTERBYLEVEL({TM1SUBSETALL([D2].[D2])},0)} * \
             {TM1SUBSETALL([Measure].[Measure])} ON 0\nFROM [Sales]"
        );
    }
}
