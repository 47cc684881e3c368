//! The client seam between transfer logic and an OLAP server.
//!
//! [`OlapClient`] is everything the transfer engine needs from a server:
//! metadata reads and upserts, MDX execution and cell write-back. The REST
//! implementation lives in [`crate::client::rest`], an in-memory one in
//! [`crate::client::mock`].

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{Cube, Dimension, ObjectKind, Process, Subset, View};
use super::value::Cellset;

/// Access to one OLAP server instance.
///
/// Upserts are full replaces: create when absent, overwrite when present.
#[async_trait]
pub trait OlapClient: Send + Sync {
    /// Environment label used in logs and errors.
    fn name(&self) -> &str;

    // ===== Listing =====

    /// Names of all objects of a kind.
    async fn object_names(&self, kind: ObjectKind) -> Result<Vec<String>>;

    // ===== Dimensions =====

    async fn get_dimension(&self, name: &str) -> Result<Dimension>;

    async fn upsert_dimension(&self, dimension: &Dimension) -> Result<()>;

    /// Hierarchy names of a dimension in server order, including `Leaves`.
    async fn hierarchy_names(&self, dimension: &str) -> Result<Vec<String>>;

    /// Leaf element names of a hierarchy.
    async fn leaf_element_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>>;

    // ===== Subsets =====

    /// Public subset names of a hierarchy.
    async fn subset_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>>;

    async fn get_subset(&self, dimension: &str, hierarchy: &str, name: &str) -> Result<Subset>;

    async fn upsert_subset(&self, subset: &Subset) -> Result<()>;

    // ===== Cubes and views =====

    async fn cube_exists(&self, name: &str) -> Result<bool>;

    async fn get_cube(&self, name: &str) -> Result<Cube>;

    async fn upsert_cube(&self, cube: &Cube) -> Result<()>;

    /// Ordered dimension names of a cube.
    async fn cube_dimension_names(&self, cube: &str) -> Result<Vec<String>>;

    /// Public view names of a cube. Private views are never listed.
    async fn public_view_names(&self, cube: &str) -> Result<Vec<String>>;

    async fn get_view(&self, cube: &str, name: &str) -> Result<View>;

    async fn upsert_view(&self, view: &View) -> Result<()>;

    // ===== Processes =====

    async fn get_process(&self, name: &str) -> Result<Process>;

    async fn upsert_process(&self, process: &Process) -> Result<()>;

    // ===== Cells =====

    /// Execute an MDX query with every dimension on the column axis.
    ///
    /// Failures are reported as
    /// [`MigrateError::QueryExecution`](crate::MigrateError::QueryExecution).
    async fn execute_mdx(&self, mdx: &str) -> Result<Cellset>;

    /// Write cells into a cube. Returns the number of cells written.
    ///
    /// With `skip_non_updateable`, cells the server refuses (rule-derived or
    /// consolidated) are skipped instead of failing the write.
    async fn write_cells(
        &self,
        cube: &str,
        dimensions: &[String],
        cells: &Cellset,
        skip_non_updateable: bool,
    ) -> Result<usize>;
}
