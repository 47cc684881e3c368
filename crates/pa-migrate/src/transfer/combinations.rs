//! Hierarchy combinations for consolidation transfers.
//!
//! A cube with alternate hierarchies stores consolidated values per
//! hierarchy, so the consolidation transfer issues one query per choice of
//! exactly one hierarchy per dimension.

use itertools::Itertools;

use crate::core::{DimensionHierarchy, LEAVES_HIERARCHY};

/// One hierarchy per cube dimension, in cube dimension order.
pub type Combination = Vec<DimensionHierarchy>;

/// Hierarchies of `dimension` that take part in consolidation transfer.
///
/// Drops the synthetic `Leaves` hierarchy and keeps server order. Falls
/// back to the default hierarchy if nothing else is listed.
pub fn consolidation_hierarchies(dimension: &str, names: Vec<String>) -> Vec<String> {
    let hierarchies: Vec<String> = names
        .into_iter()
        .filter(|h| h != LEAVES_HIERARCHY)
        .collect();
    if hierarchies.is_empty() {
        vec![dimension.to_string()]
    } else {
        hierarchies
    }
}

/// Cartesian product of per-dimension hierarchy lists.
///
/// Iteration order is the product order of the inputs: the last dimension
/// varies fastest.
pub fn enumerate_combinations(dimensions: &[(String, Vec<String>)]) -> Vec<Combination> {
    if dimensions.is_empty() {
        return Vec::new();
    }
    dimensions
        .iter()
        .map(|(dimension, hierarchies)| {
            hierarchies
                .iter()
                .map(move |h| DimensionHierarchy::new(dimension.as_str(), h.as_str()))
        })
        .multi_cartesian_product()
        .collect()
}

/// Whether any dimension of the combination uses a non-default hierarchy.
pub fn uses_alternate_hierarchy(combination: &[DimensionHierarchy]) -> bool {
    combination.iter().any(|dh| !dh.is_default())
}
