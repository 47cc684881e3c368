//! In-memory OLAP server for testing.
//!
//! Holds definitions and cells in maps and answers MDX queries from
//! scripted responses matched by substring. Every query and write is
//! recorded so tests can assert on what a transfer did.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::{
    CellTuple, CellValue, Cellset, Cube, Dimension, ElementType, ObjectKind, OlapClient, Process,
    Subset, View,
};
use crate::error::{MigrateError, Result};
use crate::transfer::attribute_cube_name;

#[derive(Default)]
struct State {
    dimensions: BTreeMap<String, Dimension>,
    subsets: BTreeMap<(String, String, String), Subset>,
    cubes: BTreeMap<String, Cube>,
    views: BTreeMap<(String, String), View>,
    processes: BTreeMap<String, Process>,
    cells: BTreeMap<String, BTreeMap<CellTuple, CellValue>>,
    non_updateable: BTreeSet<(String, CellTuple)>,
    responses: Vec<(String, Cellset)>,
    failing_queries: Vec<(String, String)>,
    rejected: BTreeSet<String>,
    executed: Vec<String>,
    writes: Vec<(String, usize)>,
    operations: Vec<String>,
}

/// Scriptable in-memory [`OlapClient`].
pub struct MockServer {
    name: String,
    state: Mutex<State>,
}

impl MockServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_dimension(self, dimension: Dimension) -> Self {
        self.state()
            .dimensions
            .insert(dimension.name.clone(), dimension);
        self
    }

    pub fn with_subset(self, subset: Subset) -> Self {
        self.state().subsets.insert(
            (
                subset.dimension.clone(),
                subset.hierarchy.clone(),
                subset.name.clone(),
            ),
            subset,
        );
        self
    }

    pub fn with_cube(self, cube: Cube) -> Self {
        self.state().cubes.insert(cube.name.clone(), cube);
        self
    }

    pub fn with_view(self, view: View) -> Self {
        self.state()
            .views
            .insert((view.cube.clone(), view.name.clone()), view);
        self
    }

    pub fn with_process(self, process: Process) -> Self {
        self.state()
            .processes
            .insert(process.name.clone(), process);
        self
    }

    /// Mark a cell as rule-derived: writes to it are refused.
    pub fn with_non_updateable(self, cube: &str, tuple: CellTuple) -> Self {
        self.state()
            .non_updateable
            .insert((cube.to_string(), tuple));
        self
    }

    /// Answer queries containing `needle` with `cells`. First match wins.
    pub fn respond_to(self, needle: &str, cells: Cellset) -> Self {
        self.state().responses.push((needle.to_string(), cells));
        self
    }

    /// Fail queries containing `needle`.
    pub fn fail_query(self, needle: &str, message: &str) -> Self {
        self.state()
            .failing_queries
            .push((needle.to_string(), message.to_string()));
        self
    }

    /// Refuse upserts of, and writes into, the named object.
    pub fn reject_upsert(self, name: &str) -> Self {
        self.state().rejected.insert(name.to_string());
        self
    }

    // ===== Inspection =====

    pub fn dimension(&self, name: &str) -> Option<Dimension> {
        self.state().dimensions.get(name).cloned()
    }

    pub fn subset(&self, dimension: &str, hierarchy: &str, name: &str) -> Option<Subset> {
        self.state()
            .subsets
            .get(&(dimension.to_string(), hierarchy.to_string(), name.to_string()))
            .cloned()
    }

    /// Every subset of a dimension, across hierarchies.
    pub fn subsets(&self, dimension: &str) -> Vec<Subset> {
        self.state()
            .subsets
            .values()
            .filter(|s| s.dimension == dimension)
            .cloned()
            .collect()
    }

    pub fn cube(&self, name: &str) -> Option<Cube> {
        self.state().cubes.get(name).cloned()
    }

    pub fn view(&self, cube: &str, name: &str) -> Option<View> {
        self.state()
            .views
            .get(&(cube.to_string(), name.to_string()))
            .cloned()
    }

    pub fn process(&self, name: &str) -> Option<Process> {
        self.state().processes.get(name).cloned()
    }

    /// Stored cells of a cube.
    pub fn cells(&self, cube: &str) -> BTreeMap<CellTuple, CellValue> {
        self.state().cells.get(cube).cloned().unwrap_or_default()
    }

    /// Every MDX query received, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// `(cube, cells written)` per write call, in order.
    pub fn write_calls(&self) -> Vec<(String, usize)> {
        self.state().writes.clone()
    }

    /// Upserts and writes in the order they were applied.
    pub fn operations(&self) -> Vec<String> {
        self.state().operations.clone()
    }

    fn check_rejected(state: &State, name: &str) -> Result<()> {
        if state.rejected.contains(name) {
            return Err(MigrateError::rejected(name, "refused by server"));
        }
        Ok(())
    }

    fn require_dimension<'a>(state: &'a State, name: &str) -> Result<&'a Dimension> {
        state
            .dimensions
            .get(name)
            .ok_or_else(|| MigrateError::not_found(ObjectKind::Dimension, name))
    }

    fn require_cube<'a>(state: &'a State, name: &str) -> Result<&'a Cube> {
        state
            .cubes
            .get(name)
            .ok_or_else(|| MigrateError::not_found(ObjectKind::Cube, name))
    }
}

#[async_trait]
impl OlapClient for MockServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn object_names(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let state = self.state();
        let names = match kind {
            ObjectKind::Dimension => state.dimensions.keys().cloned().collect(),
            ObjectKind::Cube => state.cubes.keys().cloned().collect(),
            ObjectKind::Process => state.processes.keys().cloned().collect(),
        };
        Ok(names)
    }

    async fn get_dimension(&self, name: &str) -> Result<Dimension> {
        let state = self.state();
        Self::require_dimension(&state, name).cloned()
    }

    async fn upsert_dimension(&self, dimension: &Dimension) -> Result<()> {
        let mut state = self.state();
        Self::check_rejected(&state, &dimension.name)?;
        let has_attributes = dimension
            .hierarchies
            .iter()
            .any(|h| !h.element_attributes.is_empty());
        if has_attributes {
            let attribute_cube = attribute_cube_name(&dimension.name);
            state
                .cubes
                .entry(attribute_cube.clone())
                .or_insert_with(|| Cube {
                    name: attribute_cube.clone(),
                    dimensions: vec![dimension.name.clone(), attribute_cube],
                    rules: None,
                });
        }
        state
            .operations
            .push(format!("upsert dimension {}", dimension.name));
        // Subsets go with the hierarchy that held them.
        state.subsets.retain(|(d, h, _), _| {
            d != &dimension.name || dimension.hierarchies.iter().any(|x| &x.name == h)
        });
        state
            .dimensions
            .insert(dimension.name.clone(), dimension.clone());
        Ok(())
    }

    async fn hierarchy_names(&self, dimension: &str) -> Result<Vec<String>> {
        let state = self.state();
        Ok(Self::require_dimension(&state, dimension)?.hierarchy_names())
    }

    async fn leaf_element_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>> {
        let state = self.state();
        let dim = Self::require_dimension(&state, dimension)?;
        let hier = dim
            .hierarchies
            .iter()
            .find(|h| h.name == hierarchy)
            .ok_or_else(|| {
                MigrateError::not_found(
                    ObjectKind::Dimension,
                    format!("{}:{}", dimension, hierarchy),
                )
            })?;
        Ok(hier
            .elements
            .iter()
            .filter(|e| e.element_type != ElementType::Consolidated)
            .map(|e| e.name.clone())
            .collect())
    }

    async fn subset_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>> {
        let state = self.state();
        Ok(state
            .subsets
            .keys()
            .filter(|(d, h, _)| d == dimension && h == hierarchy)
            .map(|(_, _, name)| name.clone())
            .collect())
    }

    async fn get_subset(&self, dimension: &str, hierarchy: &str, name: &str) -> Result<Subset> {
        self.subset(dimension, hierarchy, name).ok_or_else(|| {
            MigrateError::not_found(
                ObjectKind::Dimension,
                format!("{}:{} subset {}", dimension, hierarchy, name),
            )
        })
    }

    async fn upsert_subset(&self, subset: &Subset) -> Result<()> {
        let mut state = self.state();
        Self::check_rejected(&state, &subset.name)?;
        Self::require_dimension(&state, &subset.dimension)?;
        state.operations.push(format!(
            "upsert subset {}:{}:{}",
            subset.dimension, subset.hierarchy, subset.name
        ));
        state.subsets.insert(
            (
                subset.dimension.clone(),
                subset.hierarchy.clone(),
                subset.name.clone(),
            ),
            subset.clone(),
        );
        Ok(())
    }

    async fn cube_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state().cubes.contains_key(name))
    }

    async fn get_cube(&self, name: &str) -> Result<Cube> {
        let state = self.state();
        Self::require_cube(&state, name).cloned()
    }

    async fn upsert_cube(&self, cube: &Cube) -> Result<()> {
        let mut state = self.state();
        Self::check_rejected(&state, &cube.name)?;
        state.operations.push(format!("upsert cube {}", cube.name));
        state.cubes.insert(cube.name.clone(), cube.clone());
        Ok(())
    }

    async fn cube_dimension_names(&self, cube: &str) -> Result<Vec<String>> {
        let state = self.state();
        Ok(Self::require_cube(&state, cube)?.dimensions.clone())
    }

    async fn public_view_names(&self, cube: &str) -> Result<Vec<String>> {
        let state = self.state();
        Ok(state
            .views
            .keys()
            .filter(|(c, _)| c == cube)
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn get_view(&self, cube: &str, name: &str) -> Result<View> {
        self.view(cube, name).ok_or_else(|| {
            MigrateError::not_found(ObjectKind::Cube, format!("{} view {}", cube, name))
        })
    }

    async fn upsert_view(&self, view: &View) -> Result<()> {
        let mut state = self.state();
        Self::check_rejected(&state, &view.name)?;
        Self::require_cube(&state, &view.cube)?;
        state
            .operations
            .push(format!("upsert view {}:{}", view.cube, view.name));
        state
            .views
            .insert((view.cube.clone(), view.name.clone()), view.clone());
        Ok(())
    }

    async fn get_process(&self, name: &str) -> Result<Process> {
        self.process(name)
            .ok_or_else(|| MigrateError::not_found(ObjectKind::Process, name))
    }

    async fn upsert_process(&self, process: &Process) -> Result<()> {
        let mut state = self.state();
        Self::check_rejected(&state, &process.name)?;
        state
            .operations
            .push(format!("upsert process {}", process.name));
        state
            .processes
            .insert(process.name.clone(), process.clone());
        Ok(())
    }

    async fn execute_mdx(&self, mdx: &str) -> Result<Cellset> {
        let mut state = self.state();
        state.executed.push(mdx.to_string());
        if let Some((_, message)) = state
            .failing_queries
            .iter()
            .find(|(needle, _)| mdx.contains(needle.as_str()))
        {
            return Err(MigrateError::QueryExecution(message.clone()));
        }
        Ok(state
            .responses
            .iter()
            .find(|(needle, _)| mdx.contains(needle.as_str()))
            .map(|(_, cells)| cells.clone())
            .unwrap_or_default())
    }

    async fn write_cells(
        &self,
        cube: &str,
        dimensions: &[String],
        cells: &Cellset,
        skip_non_updateable: bool,
    ) -> Result<usize> {
        let mut state = self.state();
        Self::check_rejected(&state, cube)?;
        let arity = Self::require_cube(&state, cube)?.dimensions.len();
        if arity != dimensions.len() {
            return Err(MigrateError::rejected(
                cube,
                format!("expected {} dimensions, got {}", arity, dimensions.len()),
            ));
        }

        let mut accepted = Vec::with_capacity(cells.len());
        for (tuple, value) in cells.iter() {
            if state
                .non_updateable
                .contains(&(cube.to_string(), tuple.clone()))
            {
                if skip_non_updateable {
                    continue;
                }
                return Err(MigrateError::rejected(
                    cube,
                    format!("cell {} is not updateable", tuple),
                ));
            }
            accepted.push((tuple.clone(), value.clone()));
        }

        let written = accepted.len();
        state.cells.entry(cube.to_string()).or_default().extend(accepted);
        state.writes.push((cube.to_string(), written));
        state
            .operations
            .push(format!("write {} {}", cube, written));
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Element, Hierarchy};

    fn region() -> Dimension {
        Dimension {
            name: "Region".into(),
            hierarchies: vec![Hierarchy {
                name: "Region".into(),
                elements: vec![
                    Element::new("World", ElementType::Consolidated),
                    Element::new("Finland", ElementType::Numeric),
                    Element::new("Sweden", ElementType::Numeric),
                ],
                edges: vec![],
                element_attributes: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn test_leaf_element_names() {
        let server = MockServer::new("source").with_dimension(region());
        let leaves = server.leaf_element_names("Region", "Region").await.unwrap();
        assert_eq!(leaves, vec!["Finland", "Sweden"]);
        assert!(matches!(
            server.leaf_element_names("Product", "Product").await,
            Err(MigrateError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_scripted_queries() {
        let mut cells = Cellset::new();
        cells.push(CellTuple::new(["Finland", "Revenue"]), 10.0);
        let server = MockServer::new("source")
            .respond_to("FROM [Sales]", cells.clone())
            .fail_query("FROM [Broken]", "syntax error");

        assert_eq!(
            server.execute_mdx("SELECT ... FROM [Sales]").await.unwrap(),
            cells
        );
        assert!(server
            .execute_mdx("SELECT ... FROM [Other]")
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            server.execute_mdx("SELECT ... FROM [Broken]").await,
            Err(MigrateError::QueryExecution(_))
        ));
        assert_eq!(server.executed_queries().len(), 3);
    }

    #[tokio::test]
    async fn test_write_skips_non_updateable_cells() {
        let rule_cell = CellTuple::new(["Finland", "Margin"]);
        let server = MockServer::new("target")
            .with_cube(Cube {
                name: "Sales".into(),
                dimensions: vec!["Region".into(), "Measure".into()],
                rules: None,
            })
            .with_non_updateable("Sales", rule_cell.clone());
        let dims = vec!["Region".to_string(), "Measure".to_string()];

        let mut cells = Cellset::new();
        cells.push(CellTuple::new(["Finland", "Revenue"]), 10.0);
        cells.push(rule_cell.clone(), 2.0);

        assert!(server.write_cells("Sales", &dims, &cells, false).await.is_err());
        let written = server.write_cells("Sales", &dims, &cells, true).await.unwrap();
        assert_eq!(written, 1);
        assert!(!server.cells("Sales").contains_key(&rule_cell));
    }

    #[tokio::test]
    async fn test_refused_write_fails_even_when_skipping_cells() {
        let server = MockServer::new("target")
            .with_cube(Cube {
                name: "Sales".into(),
                dimensions: vec!["Region".into(), "Measure".into()],
                rules: None,
            })
            .reject_upsert("Sales");
        let dims = vec!["Region".to_string(), "Measure".to_string()];
        let mut cells = Cellset::new();
        cells.push(CellTuple::new(["Finland", "Revenue"]), 10.0);

        assert!(matches!(
            server.write_cells("Sales", &dims, &cells, true).await,
            Err(MigrateError::RemoteRejection { .. })
        ));
        assert!(server.cells("Sales").is_empty());
    }

    #[tokio::test]
    async fn test_upsert_dimension_drops_subsets_of_removed_hierarchies() {
        let mut old = region();
        old.hierarchies.push(Hierarchy {
            name: "Old".into(),
            elements: vec![],
            edges: vec![],
            element_attributes: vec![],
        });
        let server = MockServer::new("target")
            .with_dimension(old)
            .with_subset(Subset {
                name: "Stale".into(),
                dimension: "Region".into(),
                hierarchy: "Old".into(),
                expression: None,
                elements: vec![],
                alias: None,
            });

        server.upsert_dimension(&region()).await.unwrap();

        assert_eq!(server.dimension("Region").unwrap(), region());
        assert!(server.subsets("Region").is_empty());
    }

    #[tokio::test]
    async fn test_upsert_dimension_creates_attribute_cube() {
        let mut dim = region();
        dim.hierarchies[0]
            .element_attributes
            .push(crate::core::ElementAttribute {
                name: "Caption".into(),
                attribute_type: "String".into(),
            });
        let server = MockServer::new("target");
        server.upsert_dimension(&dim).await.unwrap();
        assert!(server.cube_exists("}ElementAttributes_Region").await.unwrap());
    }
}
