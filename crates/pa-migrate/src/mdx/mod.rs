//! MDX rendering for cellset queries.
//!
//! [`HierarchySet`] is a small set-expression tree using the TM1 MDX
//! functions (`TM1SUBSETALL`, `TM1FILTERBYLEVEL`, `TM1DRILLDOWNMEMBER`).
//! [`MdxBuilder`] cross-joins sets onto the column axis of a single query.
//! [`axis`] maps a dimension's role in a query to a set.

pub mod axis;

pub use axis::{build_query, AxisRole, AxisSpec, Exclusion};

use crate::core::ElementType;

/// Quote an MDX identifier: `[name]`, with `]` doubled.
pub fn quote(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Fully qualified element of a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub dimension: String,
    pub hierarchy: String,
    pub element: String,
}

impl Member {
    pub fn new(
        dimension: impl Into<String>,
        hierarchy: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            hierarchy: hierarchy.into(),
            element: element.into(),
        }
    }

    /// Member of the dimension's default hierarchy.
    pub fn of(dimension: &str, element: impl Into<String>) -> Self {
        Self::new(dimension, dimension, element)
    }

    pub fn unique_name(&self) -> String {
        format!(
            "{}.{}.{}",
            quote(&self.dimension),
            quote(&self.hierarchy),
            quote(&self.element)
        )
    }
}

/// Set expression over one hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchySet {
    /// Every member of the hierarchy.
    AllMembers { dimension: String, hierarchy: String },
    /// Every level-0 member of the hierarchy.
    AllLeaves { dimension: String, hierarchy: String },
    /// Explicit member list.
    Members(Vec<Member>),
    /// Members plus all their descendants.
    DrillDownRecursive(Box<HierarchySet>),
    /// Members of the given level only.
    FilterByLevel(Box<HierarchySet>, u32),
    /// Members of the given element type only.
    FilterByElementType {
        set: Box<HierarchySet>,
        dimension: String,
        hierarchy: String,
        element_type: ElementType,
    },
    /// Members of the first set not in the second.
    Except(Box<HierarchySet>, Box<HierarchySet>),
}

impl HierarchySet {
    pub fn all_members(dimension: &str, hierarchy: &str) -> Self {
        HierarchySet::AllMembers {
            dimension: dimension.to_string(),
            hierarchy: hierarchy.to_string(),
        }
    }

    pub fn all_leaves(dimension: &str, hierarchy: &str) -> Self {
        HierarchySet::AllLeaves {
            dimension: dimension.to_string(),
            hierarchy: hierarchy.to_string(),
        }
    }

    pub fn members(members: Vec<Member>) -> Self {
        HierarchySet::Members(members)
    }

    pub fn drill_down_recursive(self) -> Self {
        HierarchySet::DrillDownRecursive(Box::new(self))
    }

    pub fn filter_by_level(self, level: u32) -> Self {
        HierarchySet::FilterByLevel(Box::new(self), level)
    }

    pub fn filter_by_element_type(
        self,
        dimension: &str,
        hierarchy: &str,
        element_type: ElementType,
    ) -> Self {
        HierarchySet::FilterByElementType {
            set: Box::new(self),
            dimension: dimension.to_string(),
            hierarchy: hierarchy.to_string(),
            element_type,
        }
    }

    pub fn except(self, other: HierarchySet) -> Self {
        HierarchySet::Except(Box::new(self), Box::new(other))
    }

    pub fn to_mdx(&self) -> String {
        match self {
            HierarchySet::AllMembers {
                dimension,
                hierarchy,
            } => format!("{{TM1SUBSETALL({}.{})}}", quote(dimension), quote(hierarchy)),
            HierarchySet::AllLeaves {
                dimension,
                hierarchy,
            } => format!(
                "{{TM1FILTERBYLEVEL({{TM1SUBSETALL({}.{})}},0)}}",
                quote(dimension),
                quote(hierarchy)
            ),
            HierarchySet::Members(members) => {
                let names: Vec<String> = members.iter().map(Member::unique_name).collect();
                format!("{{{}}}", names.join(","))
            }
            HierarchySet::DrillDownRecursive(set) => {
                format!("{{TM1DRILLDOWNMEMBER({},ALL,RECURSIVE)}}", set.to_mdx())
            }
            HierarchySet::FilterByLevel(set, level) => {
                format!("{{TM1FILTERBYLEVEL({},{})}}", set.to_mdx(), level)
            }
            HierarchySet::FilterByElementType {
                set,
                dimension,
                hierarchy,
                element_type,
            } => format!(
                "{{FILTER({},{}.{}.CURRENTMEMBER.PROPERTIES(\"ELEMENT_TYPE\")=\"{}\")}}",
                set.to_mdx(),
                quote(dimension),
                quote(hierarchy),
                element_type.code()
            ),
            HierarchySet::Except(a, b) => format!("{{EXCEPT({},{})}}", a.to_mdx(), b.to_mdx()),
        }
    }
}

/// Builder for a single-axis cellset query.
#[derive(Debug, Clone)]
pub struct MdxBuilder {
    cube: String,
    columns: Vec<HierarchySet>,
    non_empty: bool,
}

impl MdxBuilder {
    pub fn from_cube(cube: &str) -> Self {
        Self {
            cube: cube.to_string(),
            columns: Vec::new(),
            non_empty: false,
        }
    }

    pub fn add_hierarchy_set_to_column_axis(mut self, set: HierarchySet) -> Self {
        self.columns.push(set);
        self
    }

    /// Suppress empty tuples on the column axis.
    pub fn columns_non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn to_mdx(&self) -> String {
        let axis = if self.columns.is_empty() {
            "{}".to_string()
        } else {
            self.columns
                .iter()
                .map(HierarchySet::to_mdx)
                .collect::<Vec<_>>()
                .join(" * ")
        };
        let non_empty = if self.non_empty { "NON EMPTY " } else { "" };
        format!(
            "SELECT\n{}{} ON 0\nFROM {}",
            non_empty,
            axis,
            quote(&self.cube)
        )
    }
}
