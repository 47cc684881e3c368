//! Metadata object definitions.
//!
//! The shapes follow the TM1 REST API JSON so the REST client can
//! (de)serialize them directly. View and process bodies are carried as
//! opaque JSON: they are copied verbatim and never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the synthetic hierarchy every dimension exposes.
pub const LEAVES_HIERARCHY: &str = "Leaves";

/// Kind of a transferable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Dimension,
    Cube,
    Process,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Dimension => "dimension",
            ObjectKind::Cube => "cube",
            ObjectKind::Process => "process",
        };
        f.write_str(s)
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dimension" | "dim" => Ok(ObjectKind::Dimension),
            "cube" => Ok(ObjectKind::Cube),
            "process" | "ti" => Ok(ObjectKind::Process),
            other => Err(format!("unknown object kind '{}'", other)),
        }
    }
}

/// A single object selected for migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: ObjectKind,
}

impl ObjectReference {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn dimension(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Dimension, name)
    }

    pub fn cube(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Cube, name)
    }

    pub fn process(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Process, name)
    }
}

/// Parses `kind:name`, e.g. `cube:Sales`.
impl FromStr for ObjectReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("expected kind:name, got '{}'", s))?;
        if name.is_empty() {
            return Err(format!("missing object name in '{}'", s));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// A hierarchy of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionHierarchy {
    pub dimension: String,
    pub hierarchy: String,
}

impl DimensionHierarchy {
    pub fn new(dimension: impl Into<String>, hierarchy: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            hierarchy: hierarchy.into(),
        }
    }

    /// The default hierarchy of a dimension shares the dimension's name.
    pub fn default_of(dimension: impl Into<String>) -> Self {
        let dimension = dimension.into();
        Self {
            hierarchy: dimension.clone(),
            dimension,
        }
    }

    pub fn is_default(&self) -> bool {
        self.dimension == self.hierarchy
    }

    /// `dimension:hierarchy`, the key used by consolidation filters.
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.dimension, self.hierarchy)
    }
}

/// Full dimension definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
}

impl Dimension {
    /// Hierarchy names in server order.
    pub fn hierarchy_names(&self) -> Vec<String> {
        self.hierarchies.iter().map(|h| h.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hierarchy {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub element_attributes: Vec<ElementAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Element {
    pub name: String,
    #[serde(rename = "Type")]
    pub element_type: ElementType,
}

impl Element {
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
        }
    }
}

/// Element type as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    Numeric,
    String,
    Consolidated,
}

impl ElementType {
    /// Value of the MDX `ELEMENT_TYPE` member property.
    pub fn code(self) -> u8 {
        match self {
            ElementType::Numeric => 1,
            ElementType::String => 2,
            ElementType::Consolidated => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Edge {
    pub parent_name: String,
    pub component_name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElementAttribute {
    pub name: String,
    #[serde(rename = "Type")]
    pub attribute_type: String,
}

/// A named subset of a hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subset {
    pub name: String,
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub hierarchy: String,
    /// MDX expression; present only for dynamic subsets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Subset {
    pub fn is_dynamic(&self) -> bool {
        self.expression
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Cube definition: ordered dimension list and rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cube {
    pub name: String,
    pub dimensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

impl Cube {
    /// The last dimension is the measure dimension.
    pub fn measure_dimension(&self) -> Option<&str> {
        self.dimensions.last().map(String::as_str)
    }
}

/// Public cube view, body kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub cube: String,
    pub body: serde_json::Value,
}

/// TurboIntegrator process, body kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    pub body: serde_json::Value,
}
