//! Cell coordinates and values returned by query execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One element identifier per cube dimension, naming a single cell.
///
/// A component may carry a `hierarchy:` prefix when the element belongs
/// to a non-default hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellTuple(pub Vec<String>);

impl CellTuple {
    pub fn new<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(elements.into_iter().map(Into::into).collect())
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn elements(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    /// Split a component into its explicit hierarchy and element name.
    ///
    /// Only a prefix naming one of `hierarchies` is split off; any other
    /// `:` is part of the element name.
    pub fn split_component<'a>(
        component: &'a str,
        hierarchies: &[String],
    ) -> (Option<&'a str>, &'a str) {
        match component.split_once(':') {
            Some((hierarchy, element)) if hierarchies.iter().any(|h| h == hierarchy) => {
                (Some(hierarchy), element)
            }
            _ => (None, component),
        }
    }
}

impl fmt::Display for CellTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Value of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Numeric(f64),
    Text(String),
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Numeric(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl CellValue {
    /// Convert a REST cell value; `null` means the cell is empty.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(CellValue::Numeric),
            serde_json::Value::String(s) => Some(CellValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Numeric(v) => serde_json::json!(v),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Ordered query result: `(tuple, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cellset {
    pub cells: Vec<(CellTuple, CellValue)>,
}

impl Cellset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tuple: CellTuple, value: impl Into<CellValue>) {
        self.cells.push((tuple, value.into()));
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CellTuple, CellValue)> {
        self.cells.iter()
    }

    /// Apply a pure tuple transformation, keeping values and order.
    pub fn map_tuples<F>(self, f: F) -> Cellset
    where
        F: Fn(&CellTuple) -> CellTuple,
    {
        Cellset {
            cells: self
                .cells
                .into_iter()
                .map(|(tuple, value)| (f(&tuple), value))
                .collect(),
        }
    }

    /// Check every tuple has `arity` components.
    pub fn check_arity(&self, arity: usize) -> Result<(), String> {
        match self.cells.iter().find(|(t, _)| t.arity() != arity) {
            Some((t, _)) => Err(format!(
                "tuple {} has {} components, cube has {} dimensions",
                t,
                t.arity(),
                arity
            )),
            None => Ok(()),
        }
    }

    /// Split into consecutive chunks of at most `size` cells.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = &[(CellTuple, CellValue)]> {
        self.cells.chunks(size.max(1))
    }
}

impl FromIterator<(CellTuple, CellValue)> for Cellset {
    fn from_iter<T: IntoIterator<Item = (CellTuple, CellValue)>>(iter: T) -> Self {
        Cellset {
            cells: iter.into_iter().collect(),
        }
    }
}
