//! Core abstractions shared by every part of the migration.
//!
//! - [`schema`]: metadata object definitions and references
//! - [`value`]: cell tuples, cell values and cellsets
//! - [`traits`]: the [`OlapClient`] seam to a server

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    Cube, Dimension, DimensionHierarchy, Edge, Element, ElementAttribute, ElementType, Hierarchy,
    ObjectKind, ObjectReference, Process, Subset, View, LEAVES_HIERARCHY,
};
pub use traits::OlapClient;
pub use value::{CellTuple, CellValue, Cellset};
