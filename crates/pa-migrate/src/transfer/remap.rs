//! Hierarchy prefixes on tuple keys.
//!
//! Query results name elements only. When a value belongs to a member of a
//! non-default hierarchy, the tuple component is rewritten to
//! `hierarchy:element` so the write lands on that hierarchy's member.

use crate::core::{CellTuple, Cellset, DimensionHierarchy};

use super::combinations::uses_alternate_hierarchy;

/// `hierarchy:element`.
pub fn prefix_component(hierarchy: &str, element: &str) -> String {
    format!("{}:{}", hierarchy, element)
}

/// Prefix each component whose slot carries `Some(hierarchy)`.
///
/// Components with `None`, and components beyond the end of `hierarchies`,
/// are kept unchanged.
pub fn remap_tuple(tuple: &CellTuple, hierarchies: &[Option<&str>]) -> CellTuple {
    CellTuple(
        tuple
            .elements()
            .iter()
            .enumerate()
            .map(|(idx, element)| match hierarchies.get(idx).copied().flatten() {
                Some(hierarchy) => prefix_component(hierarchy, element),
                None => element.clone(),
            })
            .collect(),
    )
}

/// Remap a combination's result.
///
/// Returns the cellset unchanged when every dimension used its default
/// hierarchy; otherwise prefixes only the non-default positions.
pub fn remap_for_combination(cells: Cellset, combination: &[DimensionHierarchy]) -> Cellset {
    if !uses_alternate_hierarchy(combination) {
        return cells;
    }
    let slots: Vec<Option<&str>> = combination
        .iter()
        .map(|dh| (!dh.is_default()).then_some(dh.hierarchy.as_str()))
        .collect();
    cells.map_tuples(|tuple| remap_tuple(tuple, &slots))
}

/// Prefix the component at `position` with `hierarchy`.
pub fn remap_position(cells: Cellset, position: usize, hierarchy: &str) -> Cellset {
    let mut slots = vec![None; position + 1];
    slots[position] = Some(hierarchy);
    cells.map_tuples(|tuple| remap_tuple(tuple, &slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CellValue;

    fn cellset(rows: &[(&[&str], f64)]) -> Cellset {
        rows.iter()
            .map(|(t, v)| (CellTuple::new(t.iter().copied()), CellValue::Numeric(*v)))
            .collect()
    }

    #[test]
    fn test_remap_tuple_prefixes_selected_slots() {
        let tuple = CellTuple::new(["Nordics", "Shoes", "Revenue"]);
        let remapped = remap_tuple(&tuple, &[Some("ByManager"), None, None]);
        assert_eq!(
            remapped,
            CellTuple::new(["ByManager:Nordics", "Shoes", "Revenue"])
        );
    }

    #[test]
    fn test_default_combination_untouched() {
        let combination = vec![
            DimensionHierarchy::default_of("Region"),
            DimensionHierarchy::default_of("Measure"),
        ];
        let cells = cellset(&[(&["Europe", "Revenue"], 10.0)]);
        assert_eq!(remap_for_combination(cells.clone(), &combination), cells);
    }

    #[test]
    fn test_only_alternate_dimensions_prefixed() {
        let combination = vec![
            DimensionHierarchy::new("Region", "ByManager"),
            DimensionHierarchy::default_of("Product"),
            DimensionHierarchy::new("Measure", "KPIs"),
        ];
        let cells = cellset(&[
            (&["Nordics", "Shoes", "Margin"], 1.5),
            (&["Baltics", "Shoes", "Margin"], 2.5),
        ]);

        let remapped = remap_for_combination(cells, &combination);

        assert_eq!(
            remapped,
            cellset(&[
                (&["ByManager:Nordics", "Shoes", "KPIs:Margin"], 1.5),
                (&["ByManager:Baltics", "Shoes", "KPIs:Margin"], 2.5),
            ])
        );
    }

    #[test]
    fn test_remap_position() {
        let cells = cellset(&[(&["Region", "Nordics", "Caption"], 0.0)]);
        let remapped = remap_position(cells, 1, "ByManager");
        assert_eq!(
            remapped.cells[0].0,
            CellTuple::new(["Region", "ByManager:Nordics", "Caption"])
        );
    }
}
