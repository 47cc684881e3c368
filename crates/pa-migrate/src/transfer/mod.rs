//! Transfer of single objects and their data between two environments.
//!
//! [`TransferEngine`] reads from the source and writes to the target only.
//! Every object transfer writes the definition first, then the objects and
//! data that depend on it (attributes, subsets, views, cells).
//!
//! Data transfers issue one MDX query per slice. A slice whose query fails
//! is logged and treated as empty; write failures fail the owning object.

pub mod combinations;
pub mod remap;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{Cellset, ObjectKind, ObjectReference, OlapClient, LEAVES_HIERARCHY};
use crate::error::{MigrateError, Result};
use crate::mdx::{build_query, AxisRole, AxisSpec, Exclusion};
use crate::skip::SkipRules;

use combinations::{consolidation_hierarchies, enumerate_combinations, Combination};
use remap::{remap_for_combination, remap_position};

/// Restriction of a data transfer to explicit elements.
///
/// Keys are a dimension name, or `dimension:hierarchy` for consolidation
/// transfers; values are the elements whose descendants are transferred.
pub type ElementFilter = BTreeMap<String, Vec<String>>;

/// Prefix of transient views generated by the server.
pub const TEMP_VIEW_PREFIX: &str = "TempI_";

/// Prefix of the attribute cube of a dimension.
pub const ATTRIBUTE_CUBE_PREFIX: &str = "}ElementAttributes_";

/// Name of the attribute cube for `dimension`.
pub fn attribute_cube_name(dimension: &str) -> String {
    format!("{}{}", ATTRIBUTE_CUBE_PREFIX, dimension)
}

/// What to carry along with an object definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub include_subsets: bool,
    pub include_views: bool,
    pub include_data: bool,
}

impl TransferOptions {
    /// Options used by batch migration: subsets and views, no cube data.
    pub fn batch() -> Self {
        Self {
            include_subsets: true,
            include_views: true,
            include_data: false,
        }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::batch()
    }
}

/// Transfer engine configuration.
#[derive(Debug, Clone, Default)]
pub struct TransferConfig {
    /// Internal objects never transferred on their own.
    pub skip_rules: SkipRules,
    /// Candidate time dimensions for slicing leaf transfers, in priority
    /// order. Empty disables slicing.
    pub time_dimensions: Vec<String>,
}

/// Statistics from one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    /// Object was an internal object and nothing was done.
    pub skipped: bool,
    /// Queries issued against the source.
    pub queries: usize,
    /// Queries that failed and were treated as empty.
    pub failed_queries: usize,
    /// Cells written to the target.
    pub cells_written: usize,
    pub subsets: usize,
    pub views: usize,
}

impl TransferStats {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: &TransferStats) {
        self.queries += other.queries;
        self.failed_queries += other.failed_queries;
        self.cells_written += other.cells_written;
        self.subsets += other.subsets;
        self.views += other.views;
    }
}

/// Transfer engine for moving objects between two environments.
pub struct TransferEngine {
    source: Arc<dyn OlapClient>,
    target: Arc<dyn OlapClient>,
    config: TransferConfig,
}

impl TransferEngine {
    /// Create a new transfer engine.
    pub fn new(
        source: Arc<dyn OlapClient>,
        target: Arc<dyn OlapClient>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    pub fn skip_rules(&self) -> &SkipRules {
        &self.config.skip_rules
    }

    /// Dispatch a reference to its coordinator.
    pub async fn transfer_object(
        &self,
        object: &ObjectReference,
        options: &TransferOptions,
    ) -> Result<TransferStats> {
        match object.kind {
            ObjectKind::Dimension => {
                self.transfer_dimension(&object.name, options.include_subsets)
                    .await
            }
            ObjectKind::Cube => {
                self.transfer_cube(&object.name, options.include_views, options.include_data)
                    .await
            }
            ObjectKind::Process => self.transfer_process(&object.name).await,
        }
    }

    /// Copy a process definition.
    pub async fn transfer_process(&self, name: &str) -> Result<TransferStats> {
        info!("Update process: {}", name);
        let process = self.source.get_process(name).await?;
        self.target.upsert_process(&process).await?;
        Ok(TransferStats::default())
    }

    /// Copy a dimension with its attribute values and, optionally, its subsets.
    pub async fn transfer_dimension(
        &self,
        name: &str,
        include_subsets: bool,
    ) -> Result<TransferStats> {
        if self.config.skip_rules.should_skip(ObjectKind::Dimension, name) {
            debug!("Skipping internal dimension: {}", name);
            return Ok(TransferStats::skipped());
        }
        info!("Transfer dimension: {}", name);
        let mut stats = TransferStats::default();

        let dimension = self.source.get_dimension(name).await?;
        self.target.upsert_dimension(&dimension).await?;

        let hierarchies = self.source.hierarchy_names(name).await?;

        let attribute_cube = attribute_cube_name(name);
        if self.source.cube_exists(&attribute_cube).await? {
            info!("Update attributes for dimension: {}", name);
            stats.merge(
                &self
                    .transfer_cube_leaves_data(&attribute_cube, &ElementFilter::new())
                    .await?,
            );
            for hierarchy in hierarchies
                .iter()
                .filter(|h| h.as_str() != LEAVES_HIERARCHY && h.as_str() != name)
            {
                stats.merge(
                    &self
                        .transfer_hierarchy_attribute_data(name, hierarchy, &attribute_cube)
                        .await?,
                );
            }
        }

        if include_subsets {
            debug!("Update subsets of {}", name);
            for hierarchy in &hierarchies {
                for subset_name in self.source.subset_names(name, hierarchy).await? {
                    let subset = self
                        .source
                        .get_subset(name, hierarchy, &subset_name)
                        .await?;
                    if subset.is_dynamic() {
                        debug!("Skipping dynamic subset {}:{}", hierarchy, subset_name);
                        continue;
                    }
                    self.target.upsert_subset(&subset).await?;
                    stats.subsets += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Copy a cube definition, optionally with its public views and data.
    pub async fn transfer_cube(
        &self,
        name: &str,
        include_views: bool,
        include_data: bool,
    ) -> Result<TransferStats> {
        if self.config.skip_rules.should_skip(ObjectKind::Cube, name) {
            debug!("Skipping internal cube: {}", name);
            return Ok(TransferStats::skipped());
        }
        info!("Update cube: {}", name);
        let mut stats = TransferStats::default();

        let cube = self.source.get_cube(name).await?;
        self.target.upsert_cube(&cube).await?;

        if include_views {
            debug!("Update views of {}", name);
            for view_name in self.source.public_view_names(name).await? {
                if view_name.starts_with(TEMP_VIEW_PREFIX) {
                    continue;
                }
                let view = self.source.get_view(name, &view_name).await?;
                self.target.upsert_view(&view).await?;
                stats.views += 1;
            }
        }

        if include_data {
            let filter = ElementFilter::new();
            stats.merge(&self.transfer_cube_leaves_data(name, &filter).await?);
            stats.merge(&self.transfer_cube_consolidation_data(name, &filter).await?);
        }

        Ok(stats)
    }

    /// Copy consolidated attribute values of an alternate hierarchy.
    ///
    /// Attribute cubes are keyed by element name only, so the owning
    /// dimension's component is written as `hierarchy:element`.
    pub async fn transfer_hierarchy_attribute_data(
        &self,
        dimension: &str,
        hierarchy: &str,
        attribute_cube: &str,
    ) -> Result<TransferStats> {
        debug!(
            "Transfer consolidation attributes of {}:{}",
            dimension, hierarchy
        );
        let dimensions = self.source.cube_dimension_names(attribute_cube).await?;
        let position = dimensions
            .iter()
            .position(|d| d == dimension)
            .ok_or_else(|| {
                MigrateError::transfer(
                    attribute_cube,
                    format!("cube has no dimension {}", dimension),
                )
            })?;
        let measure = dimensions.last().cloned().unwrap_or_default();

        let axes: Vec<AxisSpec> = dimensions
            .iter()
            .map(|d| {
                let role = if d == dimension {
                    AxisRole::full(hierarchy, Exclusion::Leaves)
                } else if *d == measure {
                    AxisRole::Measure
                } else {
                    AxisRole::FullHierarchy {
                        hierarchy: None,
                        exclude: Exclusion::Leaves,
                    }
                };
                AxisSpec::new(d.as_str(), role)
            })
            .collect();

        let mut stats = TransferStats::default();
        let mdx = build_query(attribute_cube, &axes);
        self.transfer_slice(attribute_cube, &dimensions, &mdx, &mut stats, |cells| {
            remap_position(cells, position, hierarchy)
        })
        .await?;
        Ok(stats)
    }

    /// Copy leaf-level cell data of a cube.
    pub async fn transfer_cube_leaves_data(
        &self,
        cube: &str,
        filter: &ElementFilter,
    ) -> Result<TransferStats> {
        info!("Transfer cube data: {}", cube);
        let started = Instant::now();
        let dimensions = self.source.cube_dimension_names(cube).await?;
        let mut stats = TransferStats::default();

        let time_dimension = self
            .config
            .time_dimensions
            .iter()
            .find(|t| dimensions.contains(t) && leaf_filter(filter, t).is_none());
        let periods = match time_dimension {
            Some(t) => self.source.leaf_element_names(t, t).await?,
            None => Vec::new(),
        };

        match time_dimension {
            Some(time_dimension) if !periods.is_empty() => {
                for period in &periods {
                    debug!("Transfer cube {} slice: {}", cube, period);
                    let axes = leaf_axes(&dimensions, filter, Some((time_dimension, period)));
                    let mdx = build_query(cube, &axes);
                    self.transfer_slice(cube, &dimensions, &mdx, &mut stats, |cells| cells)
                        .await?;
                }
            }
            _ => {
                let axes = leaf_axes(&dimensions, filter, None);
                let mdx = build_query(cube, &axes);
                self.transfer_slice(cube, &dimensions, &mdx, &mut stats, |cells| cells)
                    .await?;
            }
        }

        info!(
            "{}: {} leaf cells in {:.1}s",
            cube,
            stats.cells_written,
            started.elapsed().as_secs_f64()
        );
        Ok(stats)
    }

    /// Copy consolidated cell data for every combination of hierarchies.
    pub async fn transfer_cube_consolidation_data(
        &self,
        cube: &str,
        filter: &ElementFilter,
    ) -> Result<TransferStats> {
        info!("Transfer cube {} consolidation data", cube);
        let dimensions = self.source.cube_dimension_names(cube).await?;

        let mut per_dimension = Vec::with_capacity(dimensions.len());
        for dimension in &dimensions {
            let names = self.source.hierarchy_names(dimension).await?;
            per_dimension.push((
                dimension.clone(),
                consolidation_hierarchies(dimension, names),
            ));
        }

        let combinations = enumerate_combinations(&per_dimension);
        debug!("{}: {} hierarchy combinations", cube, combinations.len());

        let mut stats = TransferStats::default();
        for combination in &combinations {
            let axes = consolidation_axes(combination, filter);
            let mdx = build_query(cube, &axes);
            self.transfer_slice(cube, &dimensions, &mdx, &mut stats, |cells| {
                remap_for_combination(cells, combination)
            })
            .await?;
        }
        Ok(stats)
    }

    /// Run one query and write its (remapped) result.
    async fn transfer_slice<F>(
        &self,
        cube: &str,
        dimensions: &[String],
        mdx: &str,
        stats: &mut TransferStats,
        remap: F,
    ) -> Result<()>
    where
        F: FnOnce(Cellset) -> Cellset,
    {
        stats.queries += 1;
        debug!("MDX for {}: {}", cube, mdx);
        let cells = match self.source.execute_mdx(mdx).await {
            Ok(cells) => cells,
            Err(e) => {
                warn!("{}: query failed, slice skipped: {}", cube, e);
                stats.failed_queries += 1;
                return Ok(());
            }
        };
        if cells.is_empty() {
            return Ok(());
        }

        let cells = remap(cells);
        cells
            .check_arity(dimensions.len())
            .map_err(|message| MigrateError::transfer(cube, message))?;
        let written = self
            .target
            .write_cells(cube, dimensions, &cells, true)
            .await?;
        debug!("{}: wrote {} of {} cells", cube, written, cells.len());
        stats.cells_written += written;
        Ok(())
    }
}

/// Filter entry for a dimension in a leaf transfer.
fn leaf_filter<'a>(filter: &'a ElementFilter, dimension: &str) -> Option<&'a Vec<String>> {
    filter
        .get(dimension)
        .or_else(|| filter.get(&format!("{}:{}", dimension, dimension)))
}

/// Axis roles for a leaf transfer, optionally pinned to one time period.
fn leaf_axes(
    dimensions: &[String],
    filter: &ElementFilter,
    time_slice: Option<(&String, &String)>,
) -> Vec<AxisSpec> {
    let measure = dimensions.last();
    dimensions
        .iter()
        .map(|dimension| {
            let role = if let Some(elements) = leaf_filter(filter, dimension) {
                AxisRole::FilteredElements {
                    hierarchy: None,
                    elements: elements.clone(),
                    leaves_only: true,
                }
            } else if let Some((_, period)) = time_slice.filter(|(t, _)| *t == dimension) {
                AxisRole::TimeSlice(period.clone())
            } else if Some(dimension) == measure {
                AxisRole::Measure
            } else {
                AxisRole::LeavesOnly
            };
            AxisSpec::new(dimension.as_str(), role)
        })
        .collect()
}

/// Axis roles for one hierarchy combination of a consolidation transfer.
fn consolidation_axes(combination: &Combination, filter: &ElementFilter) -> Vec<AxisSpec> {
    let measure = combination.last().map(|dh| dh.dimension.as_str());
    combination
        .iter()
        .map(|dh| {
            let role = if let Some(elements) = filter.get(&dh.qualified()) {
                AxisRole::FilteredElements {
                    hierarchy: Some(dh.hierarchy.clone()),
                    elements: elements.clone(),
                    leaves_only: false,
                }
            } else if Some(dh.dimension.as_str()) == measure {
                AxisRole::full(&dh.hierarchy, Exclusion::StringElements)
            } else {
                AxisRole::full(&dh.hierarchy, Exclusion::Nothing)
            };
            AxisSpec::new(dh.dimension.as_str(), role)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockServer;
    use crate::core::{
        CellTuple, CellValue, Cube, Dimension, Element, ElementAttribute, ElementType, Hierarchy,
        Process, Subset, View,
    };

    fn hierarchy(name: &str, consolidated: &[&str], leaves: &[&str]) -> Hierarchy {
        let elements = consolidated
            .iter()
            .map(|e| Element::new(*e, ElementType::Consolidated))
            .chain(leaves.iter().map(|e| Element::new(*e, ElementType::Numeric)))
            .collect();
        Hierarchy {
            name: name.into(),
            elements,
            edges: vec![],
            element_attributes: vec![],
        }
    }

    fn dimension(name: &str, hierarchies: Vec<Hierarchy>) -> Dimension {
        Dimension {
            name: name.into(),
            hierarchies,
        }
    }

    fn cube(name: &str, dimensions: &[&str]) -> Cube {
        Cube {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            rules: None,
        }
    }

    fn cells(rows: &[(&[&str], CellValue)]) -> Cellset {
        rows.iter()
            .map(|(t, v)| (CellTuple::new(t.iter().copied()), v.clone()))
            .collect()
    }

    fn num(v: f64) -> CellValue {
        CellValue::Numeric(v)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn engine(source: &Arc<MockServer>, target: &Arc<MockServer>) -> TransferEngine {
        engine_with(source, target, TransferConfig::default())
    }

    fn engine_with(
        source: &Arc<MockServer>,
        target: &Arc<MockServer>,
        config: TransferConfig,
    ) -> TransferEngine {
        TransferEngine::new(source.clone(), target.clone(), config)
    }

    /// Source with a two-dimensional Sales cube; Region has an alternate
    /// hierarchy and the synthetic Leaves hierarchy.
    fn sales_source() -> MockServer {
        MockServer::new("source")
            .with_dimension(dimension(
                "Region",
                vec![
                    hierarchy("Region", &["World"], &["Finland", "Sweden"]),
                    hierarchy("ByManager", &["Nordics"], &["Finland", "Sweden"]),
                    hierarchy("Leaves", &[], &["Finland", "Sweden"]),
                ],
            ))
            .with_dimension(dimension(
                "Measure",
                vec![hierarchy("Measure", &[], &["Revenue", "Comment"])],
            ))
            .with_cube(cube("Sales", &["Region", "Measure"]))
    }

    #[tokio::test]
    async fn test_transfer_process() {
        let body = serde_json::json!({"PrologProcedure": "x = 1;"});
        let source = Arc::new(MockServer::new("source").with_process(Process {
            name: "Load".into(),
            body: body.clone(),
        }));
        let target = Arc::new(MockServer::new("target"));

        engine(&source, &target)
            .transfer_object(&ObjectReference::process("Load"), &TransferOptions::batch())
            .await
            .unwrap();

        assert_eq!(target.process("Load").unwrap().body, body);
    }

    #[tokio::test]
    async fn test_missing_process_is_not_found() {
        let source = Arc::new(MockServer::new("source"));
        let target = Arc::new(MockServer::new("target"));
        let err = engine(&source, &target)
            .transfer_process("Missing")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_internal_objects_skipped() {
        let source = Arc::new(MockServer::new("source"));
        let target = Arc::new(MockServer::new("target"));
        let engine = engine(&source, &target);

        let stats = engine.transfer_dimension("}Clients", true).await.unwrap();
        assert!(stats.skipped);
        let stats = engine
            .transfer_cube("}ElementAttributes_Region", true, true)
            .await
            .unwrap();
        assert!(stats.skipped);

        assert!(target.operations().is_empty());
        assert!(source.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_dimension_with_attributes_and_subsets() {
        let mut region = dimension(
            "Region",
            vec![
                hierarchy("Region", &["World"], &["Finland", "Sweden"]),
                hierarchy("ByManager", &["Nordics"], &["Finland", "Sweden"]),
            ],
        );
        region.hierarchies[0].element_attributes.push(ElementAttribute {
            name: "Caption".into(),
            attribute_type: "String".into(),
        });

        let source = Arc::new(
            MockServer::new("source")
                .with_dimension(region.clone())
                .with_cube(cube(
                    "}ElementAttributes_Region",
                    &["Region", "}ElementAttributes_Region"],
                ))
                .with_subset(Subset {
                    name: "Nordic countries".into(),
                    dimension: "Region".into(),
                    hierarchy: "Region".into(),
                    expression: None,
                    elements: vec!["Finland".into(), "Sweden".into()],
                    alias: None,
                })
                .with_subset(Subset {
                    name: "All leaves".into(),
                    dimension: "Region".into(),
                    hierarchy: "Region".into(),
                    expression: Some("{TM1FILTERBYLEVEL({TM1SUBSETALL([Region])},0)}".into()),
                    elements: vec![],
                    alias: None,
                })
                .respond_to(
                    "[Region].[ByManager]",
                    cells(&[(&["Nordics", "Caption"], text("Nordic region"))]),
                )
                .respond_to(
                    "TM1FILTERBYLEVEL({TM1SUBSETALL([Region].[Region])},0)",
                    cells(&[(&["Finland", "Caption"], text("Suomi"))]),
                ),
        );
        let target = Arc::new(MockServer::new("target"));

        let stats = engine(&source, &target)
            .transfer_dimension("Region", true)
            .await
            .unwrap();

        assert_eq!(target.dimension("Region").unwrap(), region);
        let attributes = target.cells("}ElementAttributes_Region");
        assert_eq!(
            attributes.get(&CellTuple::new(["Finland", "Caption"])),
            Some(&text("Suomi"))
        );
        assert_eq!(
            attributes.get(&CellTuple::new(["ByManager:Nordics", "Caption"])),
            Some(&text("Nordic region"))
        );

        assert!(target
            .subset("Region", "Region", "Nordic countries")
            .is_some());
        assert!(target.subset("Region", "Region", "All leaves").is_none());
        assert_eq!(stats.subsets, 1);
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.cells_written, 2);
    }

    #[tokio::test]
    async fn test_dimension_transfer_replaces_target_and_is_idempotent() {
        let nordic = |elements: &[&str]| Subset {
            name: "Nordic countries".into(),
            dimension: "Region".into(),
            hierarchy: "Region".into(),
            expression: None,
            elements: elements.iter().map(|e| e.to_string()).collect(),
            alias: None,
        };
        let mut region = dimension(
            "Region",
            vec![hierarchy("Region", &["World"], &["Finland", "Sweden"])],
        );
        region.hierarchies[0].element_attributes.push(ElementAttribute {
            name: "Caption".into(),
            attribute_type: "String".into(),
        });
        let source = Arc::new(
            MockServer::new("source")
                .with_dimension(region.clone())
                .with_cube(cube(
                    "}ElementAttributes_Region",
                    &["Region", "}ElementAttributes_Region"],
                ))
                .with_subset(nordic(&["Finland", "Sweden"]))
                .respond_to(
                    "}ElementAttributes_Region",
                    cells(&[(&["Finland", "Caption"], text("Suomi"))]),
                ),
        );

        // Older version on the target, with an extra hierarchy and subset.
        let target = Arc::new(
            MockServer::new("target")
                .with_dimension(dimension(
                    "Region",
                    vec![
                        hierarchy("Region", &[], &["Finland"]),
                        hierarchy("Old", &[], &["Finland"]),
                    ],
                ))
                .with_cube(cube(
                    "}ElementAttributes_Region",
                    &["Region", "}ElementAttributes_Region"],
                ))
                .with_subset(nordic(&["Finland"]))
                .with_subset(Subset {
                    name: "Stale".into(),
                    hierarchy: "Old".into(),
                    ..nordic(&[])
                }),
        );
        let engine = engine(&source, &target);
        let snapshot = || {
            (
                target.dimension("Region"),
                target.subsets("Region"),
                target.cells("}ElementAttributes_Region"),
            )
        };

        engine.transfer_dimension("Region", true).await.unwrap();
        let first = snapshot();
        engine.transfer_dimension("Region", true).await.unwrap();
        let second = snapshot();

        assert_eq!(first, second);
        assert_eq!(first.0, Some(region));
        assert_eq!(first.1, vec![nordic(&["Finland", "Sweden"])]);
        assert_eq!(
            first.2.get(&CellTuple::new(["Finland", "Caption"])),
            Some(&text("Suomi"))
        );
    }

    #[tokio::test]
    async fn test_dimension_without_attribute_cube_issues_no_queries() {
        let source = Arc::new(sales_source());
        let target = Arc::new(MockServer::new("target"));

        let stats = engine(&source, &target)
            .transfer_dimension("Region", false)
            .await
            .unwrap();

        assert_eq!(stats, TransferStats::default());
        assert!(source.executed_queries().is_empty());
        assert!(target.dimension("Region").is_some());
    }

    #[tokio::test]
    async fn test_transfer_cube_with_views() {
        let view_body = serde_json::json!({"MDX": "SELECT {} ON 0 FROM [Sales]"});
        let source = Arc::new(
            sales_source()
                .with_view(View {
                    name: "Default".into(),
                    cube: "Sales".into(),
                    body: view_body.clone(),
                })
                .with_view(View {
                    name: "TempI_4711".into(),
                    cube: "Sales".into(),
                    body: view_body.clone(),
                }),
        );
        let target = Arc::new(MockServer::new("target"));

        let stats = engine(&source, &target)
            .transfer_cube("Sales", true, false)
            .await
            .unwrap();

        assert_eq!(target.cube("Sales").unwrap().dimensions, vec!["Region", "Measure"]);
        assert_eq!(target.view("Sales", "Default").unwrap().body, view_body);
        assert!(target.view("Sales", "TempI_4711").is_none());
        assert_eq!(stats.views, 1);
        assert!(source.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_cube_data() {
        let source = Arc::new(
            sales_source()
                .respond_to(
                    "[Measure].[Measure])} ON 0",
                    cells(&[
                        (&["Finland", "Revenue"], num(10.0)),
                        (&["Sweden", "Comment"], text("late")),
                    ]),
                )
                .respond_to(
                    "[Region].[ByManager]",
                    cells(&[(&["Nordics", "Revenue"], num(30.0))]),
                )
                .respond_to(
                    "ELEMENT_TYPE",
                    cells(&[(&["World", "Revenue"], num(30.0))]),
                ),
        );
        let target = Arc::new(MockServer::new("target"));

        let stats = engine(&source, &target)
            .transfer_cube("Sales", false, true)
            .await
            .unwrap();

        // one leaf query, one per hierarchy combination
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.cells_written, 4);

        let written = target.cells("Sales");
        assert_eq!(
            written.get(&CellTuple::new(["Sweden", "Comment"])),
            Some(&text("late"))
        );
        assert_eq!(
            written.get(&CellTuple::new(["World", "Revenue"])),
            Some(&CellValue::Numeric(30.0))
        );
        assert_eq!(
            written.get(&CellTuple::new(["ByManager:Nordics", "Revenue"])),
            Some(&CellValue::Numeric(30.0))
        );

        let ops = target.operations();
        assert_eq!(ops.first().map(String::as_str), Some("upsert cube Sales"));
        assert!(ops[1..].iter().all(|op| op.starts_with("write Sales")));
    }

    #[tokio::test]
    async fn test_consolidation_queries_exclude_string_measures() {
        let source = Arc::new(sales_source());
        let target = Arc::new(
            MockServer::new("target").with_cube(cube("Sales", &["Region", "Measure"])),
        );

        engine(&source, &target)
            .transfer_cube_consolidation_data("Sales", &ElementFilter::new())
            .await
            .unwrap();

        let queries = source.executed_queries();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.contains(
            "[Measure].[Measure].CURRENTMEMBER.PROPERTIES(\"ELEMENT_TYPE\")=\"2\""
        )));
        assert!(queries.iter().all(|q| !q.contains("[Leaves]")));
    }

    #[tokio::test]
    async fn test_failed_query_is_skipped() {
        let source = Arc::new(
            sales_source()
                .fail_query("[Region].[ByManager]", "timeout")
                .respond_to(
                    "ELEMENT_TYPE",
                    cells(&[(&["World", "Revenue"], num(30.0))]),
                ),
        );
        let target = Arc::new(
            MockServer::new("target").with_cube(cube("Sales", &["Region", "Measure"])),
        );

        let stats = engine(&source, &target)
            .transfer_cube_consolidation_data("Sales", &ElementFilter::new())
            .await
            .unwrap();

        assert_eq!(stats.queries, 2);
        assert_eq!(stats.failed_queries, 1);
        assert_eq!(stats.cells_written, 1);
    }

    #[tokio::test]
    async fn test_write_failure_fails_transfer() {
        let source = Arc::new(sales_source().respond_to(
            "FROM [Sales]",
            cells(&[(&["Finland", "Revenue"], num(10.0))]),
        ));
        // target has no Sales cube
        let target = Arc::new(MockServer::new("target"));

        let result = engine(&source, &target)
            .transfer_cube_leaves_data("Sales", &ElementFilter::new())
            .await;

        assert!(matches!(result, Err(MigrateError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_updateable_cells_skipped() {
        let source = Arc::new(sales_source().respond_to(
            "FROM [Sales]",
            cells(&[
                (&["Finland", "Revenue"], num(10.0)),
                (&["Sweden", "Revenue"], num(20.0)),
            ]),
        ));
        let target = Arc::new(
            MockServer::new("target")
                .with_cube(cube("Sales", &["Region", "Measure"]))
                .with_non_updateable("Sales", CellTuple::new(["Sweden", "Revenue"])),
        );

        let stats = engine(&source, &target)
            .transfer_cube_leaves_data("Sales", &ElementFilter::new())
            .await
            .unwrap();

        assert_eq!(stats.cells_written, 1);
        assert_eq!(target.cells("Sales").len(), 1);
    }

    #[tokio::test]
    async fn test_arity_mismatch_rejected_before_write() {
        let source = Arc::new(
            sales_source().respond_to("FROM [Sales]", cells(&[(&["Finland"], num(10.0))])),
        );
        let target = Arc::new(
            MockServer::new("target").with_cube(cube("Sales", &["Region", "Measure"])),
        );

        let result = engine(&source, &target)
            .transfer_cube_leaves_data("Sales", &ElementFilter::new())
            .await;

        assert!(matches!(result, Err(MigrateError::Transfer { .. })));
        assert!(target.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_leaf_transfer_sliced_by_time_dimension() {
        let source = Arc::new(
            sales_source()
                .with_dimension(dimension(
                    "Period",
                    vec![hierarchy("Period", &["Year"], &["Jan", "Feb"])],
                ))
                .with_cube(cube("Plan", &["Region", "Period", "Measure"])),
        );
        let target = Arc::new(MockServer::new("target"));
        let config = TransferConfig {
            time_dimensions: vec!["Version".into(), "Period".into()],
            ..TransferConfig::default()
        };

        let stats = engine_with(&source, &target, config)
            .transfer_cube_leaves_data("Plan", &ElementFilter::new())
            .await
            .unwrap();

        let queries = source.executed_queries();
        assert_eq!(stats.queries, 2);
        assert!(queries[0].contains("{[Period].[Period].[Jan]}"));
        assert!(queries[1].contains("{[Period].[Period].[Feb]}"));
    }

    #[tokio::test]
    async fn test_leaf_transfer_without_time_dimension_is_one_query() {
        let source = Arc::new(sales_source());
        let target = Arc::new(MockServer::new("target"));
        let config = TransferConfig {
            time_dimensions: vec!["Period".into()],
            ..TransferConfig::default()
        };

        engine_with(&source, &target, config)
            .transfer_cube_leaves_data("Sales", &ElementFilter::new())
            .await
            .unwrap();

        let queries = source.executed_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0],
            "SELECT\nNON EMPTY {TM1FILTERBYLEVEL({TM1SUBSETALL([Region].[Region])},0)} * \
             {TM1SUBSETALL([Measure].[Measure])} ON 0\nFROM [Sales]"
        );
    }

    #[tokio::test]
    async fn test_element_filter_restricts_query() {
        let source = Arc::new(sales_source());
        let target = Arc::new(MockServer::new("target"));
        let mut filter = ElementFilter::new();
        filter.insert("Region".into(), vec!["World".into()]);

        engine(&source, &target)
            .transfer_cube_leaves_data("Sales", &filter)
            .await
            .unwrap();

        let mut consolidation_filter = ElementFilter::new();
        consolidation_filter.insert("Region:ByManager".into(), vec!["Nordics".into()]);
        engine(&source, &target)
            .transfer_cube_consolidation_data("Sales", &consolidation_filter)
            .await
            .unwrap();

        let queries = source.executed_queries();
        assert!(queries[0].contains(
            "{TM1FILTERBYLEVEL({TM1DRILLDOWNMEMBER({[Region].[Region].[World]},ALL,RECURSIVE)},0)}"
        ));
        assert!(queries[2]
            .contains("{TM1DRILLDOWNMEMBER({[Region].[ByManager].[Nordics]},ALL,RECURSIVE)}"));
    }
}
