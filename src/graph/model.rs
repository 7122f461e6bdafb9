//! In-memory model of the canvas graph: resource nodes, directed
//! connections, variables and composite groupings.

use crate::shared::utils::normalize_name;
use crate::terraform::schema::{IconTag, ResourceKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Horizontal distance between a node edge and its connection anchor.
pub const ANCHOR_OFFSET: f64 = 8.0;

pub const DEFAULT_NODE_WIDTH: f64 = 180.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 90.0;

/// A 2D canvas coordinate. Origin is top-left, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
        }
    }
}

/// One resource on the canvas.
///
/// Property values are generation-ready strings (interpolation restored,
/// never marker-encoded). The property map is ordered and only mutable
/// through the named operations below; callers get a read-only view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: Uuid,
    pub kind: ResourceKind,
    /// Raw Terraform type string; equals `kind.type_name()` for nodes
    /// created from the catalog, and the source text's type for parsed
    /// nodes of unrecognized kinds.
    pub type_name: String,
    pub display_name: String,
    pub description: String,
    properties: IndexMap<String, String>,
    pub position: Point,
    pub size: Size,
    pub input_anchor: Point,
    pub output_anchor: Point,
}

impl ResourceNode {
    pub fn new(kind: ResourceKind, display_name: impl Into<String>) -> Self {
        Self::with_type(kind, kind.type_name(), display_name)
    }

    pub fn with_type(
        kind: ResourceKind,
        type_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let mut node = Self {
            id: Uuid::new_v4(),
            kind,
            type_name: type_name.into(),
            display_name: display_name.into(),
            description: kind.description().to_string(),
            properties: IndexMap::new(),
            position: Point::default(),
            size: Size::default(),
            input_anchor: Point::default(),
            output_anchor: Point::default(),
        };
        node.recompute_anchors();
        node
    }

    /// Read-only view of the property map, in insertion order.
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn set_property_if_absent(&mut self, name: &str, value: &str) {
        if !self.properties.contains_key(name) {
            self.properties.insert(name.to_string(), value.to_string());
        }
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        self.recompute_anchors();
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        self.recompute_anchors();
    }

    /// Anchors derive from position and size; recomputed on every write.
    fn recompute_anchors(&mut self) {
        let mid_y = self.position.y + self.size.height / 2.0;
        self.input_anchor = Point::new(self.position.x - ANCHOR_OFFSET, mid_y);
        self.output_anchor = Point::new(self.position.x + self.size.width + ANCHOR_OFFSET, mid_y);
    }

    /// Terraform-safe identifier derived from the display name.
    pub fn terraform_name(&self) -> String {
        normalize_name(&self.display_name)
    }

    /// Canonical reference expression, `<type>.<name>`.
    pub fn reference_expr(&self) -> String {
        format!("{}.{}", self.type_name, self.terraform_name())
    }
}

/// Directed edge between two nodes. Source is the output/provider side,
/// target the input/consumer side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
}

impl Connection {
    pub fn new(source_id: Uuid, target_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
        }
    }
}

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    String,
    Number,
    Bool,
    List,
    Map,
}

impl VariableType {
    /// Parse a declared type token case-insensitively. Constructor calls
    /// like `map(string)` reduce to their base token; anything
    /// unrecognized falls back to String.
    pub fn from_token(token: &str) -> Self {
        let base = token
            .trim()
            .split('(')
            .next()
            .unwrap_or("")
            .to_lowercase();
        match base.as_str() {
            "string" => VariableType::String,
            "number" => VariableType::Number,
            "bool" | "boolean" => VariableType::Bool,
            "list" | "set" => VariableType::List,
            "map" | "object" => VariableType::Map,
            _ => VariableType::String,
        }
    }

    pub fn type_token(self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::Number => "number",
            VariableType::Bool => "bool",
            VariableType::List => "list(string)",
            VariableType::Map => "map(string)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub var_type: VariableType,
    pub default: Option<String>,
    pub description: String,
    pub sensitive: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            var_type,
            default: None,
            description: String::new(),
            sensitive: false,
        }
    }
}

/// Named grouping of nodes. Children are owned: a grouped node leaves the
/// flat node list and returns unchanged on ungroup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeBlock {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: IconTag,
    pub position: Point,
    pub size: Size,
    pub children: Vec<ResourceNode>,
}

impl CompositeBlock {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            icon: IconTag::Generic,
            position,
            size: Size::default(),
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_follow_position_and_size() {
        let mut node = ResourceNode::new(ResourceKind::Vpc, "main-vpc");
        node.set_position(Point::new(100.0, 40.0));
        node.set_size(Size {
            width: 200.0,
            height: 80.0,
        });
        assert_eq!(node.input_anchor, Point::new(100.0 - ANCHOR_OFFSET, 80.0));
        assert_eq!(
            node.output_anchor,
            Point::new(100.0 + 200.0 + ANCHOR_OFFSET, 80.0)
        );
    }

    #[test]
    fn test_reference_expr_uses_normalized_name() {
        let node = ResourceNode::new(ResourceKind::Vpc, "Main VPC");
        assert_eq!(node.reference_expr(), "aws_vpc.main_vpc");
    }

    #[test]
    fn test_variable_type_tokens() {
        assert_eq!(VariableType::from_token("string"), VariableType::String);
        assert_eq!(VariableType::from_token("NUMBER"), VariableType::Number);
        assert_eq!(VariableType::from_token("map(string)"), VariableType::Map);
        assert_eq!(VariableType::from_token("list(number)"), VariableType::List);
        assert_eq!(VariableType::from_token("tuple"), VariableType::String);
    }

    #[test]
    fn test_property_view_is_ordered() {
        let mut node = ResourceNode::new(ResourceKind::Instance, "web");
        node.set_property("ami", "ami-1");
        node.set_property("instance_type", "t2.micro");
        let keys: Vec<&String> = node.properties().keys().collect();
        assert_eq!(keys, ["ami", "instance_type"]);
    }
}
