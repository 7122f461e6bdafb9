//! The canvas aggregate: owns nodes, connections, variables and composite
//! groupings, and enforces the graph invariants (edge integrity, variable
//! uniqueness, scoped mutation, the connection-drag state machine).

use crate::graph::model::{
    CompositeBlock, Connection, Point, ResourceNode, Size, Variable,
};
use crate::terraform::analyzer;
use crate::terraform::codec;
use crate::terraform::schema::SchemaProvider;
use uuid::Uuid;

/// Maximum distance between a drop point and an anchor for a drag to snap
/// into a connection.
pub const SNAP_THRESHOLD: f64 = 24.0;

/// Which side of a node an anchor belongs to. Input consumes, output
/// provides; a drag only snaps to the complementary role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRole {
    Input,
    Output,
}

/// Active mutation scope: the root canvas or the inside of one composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Root,
    Composite(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        origin: Uuid,
        role: AnchorRole,
        position: Point,
    },
}

pub struct ResourceGraph {
    schema: SchemaProvider,
    nodes: Vec<ResourceNode>,
    connections: Vec<Connection>,
    variables: Vec<Variable>,
    composites: Vec<CompositeBlock>,
    scope: Scope,
    drag: DragState,
}

impl ResourceGraph {
    pub fn new(schema: SchemaProvider) -> Self {
        Self {
            schema,
            nodes: Vec::new(),
            connections: Vec::new(),
            variables: Vec::new(),
            composites: Vec::new(),
            scope: Scope::Root,
            drag: DragState::Idle,
        }
    }

    /// Rebuild a graph from persisted collections. Connections referencing
    /// unknown node ids are dropped wholesale by the caller before this.
    pub fn from_parts(
        schema: SchemaProvider,
        nodes: Vec<ResourceNode>,
        variables: Vec<Variable>,
        connections: Vec<Connection>,
        composites: Vec<CompositeBlock>,
    ) -> Self {
        Self {
            schema,
            nodes,
            connections,
            variables,
            composites,
            scope: Scope::Root,
            drag: DragState::Idle,
        }
    }

    pub fn schema(&self) -> &SchemaProvider {
        &self.schema
    }

    /// Top-level nodes (excluding composite children).
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Every node, top-level and inside composites.
    pub fn all_nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes
            .iter()
            .chain(self.composites.iter().flat_map(|c| c.children.iter()))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn composites(&self) -> &[CompositeBlock] {
        &self.composites
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_empty(&self) -> bool {
        self.all_nodes().next().is_none()
    }

    /// Drop every entity and reset scope and drag state.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.variables.clear();
        self.composites.clear();
        self.scope = Scope::Root;
        self.drag = DragState::Idle;
    }

    // ----- nodes -----

    /// Insert a node into the active scope, filling schema defaults for
    /// properties that are not already set.
    pub fn add_node(&mut self, mut node: ResourceNode) -> Uuid {
        if let Some(schema) = self.schema.properties(node.kind) {
            for property in schema {
                if let Some(default) = property.default {
                    node.set_property_if_absent(property.name, default);
                }
            }
        }
        let id = node.id;
        self.scoped_nodes_mut().push(node);
        id
    }

    /// Remove a node from the active scope, cascading removal of every
    /// connection that touches it.
    pub fn remove_node(&mut self, id: Uuid) -> bool {
        let nodes = self.scoped_nodes_mut();
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        if nodes.len() == before {
            return false;
        }
        self.connections
            .retain(|c| c.source_id != id && c.target_id != id);
        true
    }

    pub fn find_node(&self, id: Uuid) -> Option<&ResourceNode> {
        self.all_nodes().find(|n| n.id == id)
    }

    pub fn find_node_mut(&mut self, id: Uuid) -> Option<&mut ResourceNode> {
        self.nodes
            .iter_mut()
            .chain(self.composites.iter_mut().flat_map(|c| c.children.iter_mut()))
            .find(|n| n.id == id)
    }

    pub fn update_position(&mut self, id: Uuid, position: Point) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.set_position(position);
                true
            }
            None => false,
        }
    }

    pub fn update_size(&mut self, id: Uuid, size: Size) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.set_size(size);
                true
            }
            None => false,
        }
    }

    // ----- connections -----

    /// Add a directed edge. Refused when either endpoint is missing or an
    /// edge with the same (source, target) pair already exists.
    pub fn add_connection(&mut self, source_id: Uuid, target_id: Uuid) -> Option<Uuid> {
        if source_id == target_id {
            return None;
        }
        if self.find_node(source_id).is_none() || self.find_node(target_id).is_none() {
            return None;
        }
        if self
            .connections
            .iter()
            .any(|c| c.source_id == source_id && c.target_id == target_id)
        {
            return None;
        }
        let connection = Connection::new(source_id, target_id);
        let id = connection.id;
        self.connections.push(connection);
        Some(id)
    }

    pub fn remove_connection(&mut self, id: Uuid) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }

    // ----- variables -----

    /// Add a variable; a duplicate name is a no-op, never an overwrite.
    pub fn add_variable(&mut self, variable: Variable) -> bool {
        if self.variables.iter().any(|v| v.name == variable.name) {
            return false;
        }
        self.variables.push(variable);
        true
    }

    pub fn remove_variable(&mut self, name: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| v.name != name);
        self.variables.len() != before
    }

    // ----- connection drag state machine -----

    /// Idle -> Dragging. A call while already dragging is ignored.
    pub fn start_connection_drag(&mut self, node_id: Uuid, role: AnchorRole) {
        if self.drag != DragState::Idle {
            return;
        }
        if self.scoped_nodes().iter().any(|n| n.id == node_id) {
            tracing::debug!(node = %node_id, ?role, "connection drag started");
            self.drag = DragState::Dragging {
                origin: node_id,
                role,
                position: Point::default(),
            };
        }
    }

    /// Track the pointer during a drag; no-op while idle.
    pub fn update_drag_position(&mut self, point: Point) {
        if let DragState::Dragging { position, .. } = &mut self.drag {
            *position = point;
        }
    }

    /// Dragging -> Idle without committing an edge.
    pub fn cancel_connection_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Dragging -> Idle, committing an edge to the nearest complementary
    /// anchor within the snap threshold. Matching and commit happen in this
    /// single call; ties resolve to the smallest node id.
    pub fn end_connection_drag(&mut self, point: Point) -> Option<Uuid> {
        let DragState::Dragging { origin, role, .. } = self.drag else {
            return None;
        };
        self.drag = DragState::Idle;

        let mut best: Option<(f64, Uuid)> = None;
        for node in self.scoped_nodes() {
            if node.id == origin {
                continue;
            }
            let anchor = match role {
                AnchorRole::Output => node.input_anchor,
                AnchorRole::Input => node.output_anchor,
            };
            let distance = anchor.distance_to(point);
            if distance > SNAP_THRESHOLD {
                continue;
            }
            best = match best {
                None => Some((distance, node.id)),
                Some((best_distance, best_id)) => {
                    if distance < best_distance
                        || (distance == best_distance && node.id < best_id)
                    {
                        Some((distance, node.id))
                    } else {
                        Some((best_distance, best_id))
                    }
                }
            };
        }

        let (_, matched) = best?;
        let (source, target) = match role {
            AnchorRole::Output => (origin, matched),
            AnchorRole::Input => (matched, origin),
        };
        self.add_connection(source, target)
    }

    // ----- composites -----

    /// Move the given top-level nodes into a new composite. The composite
    /// anchors at the minimum x/y of its members and sizes to their
    /// bounding box.
    pub fn group_nodes(&mut self, ids: &[Uuid], name: &str) -> Option<Uuid> {
        let mut members = Vec::new();
        let mut remaining = Vec::new();
        for node in self.nodes.drain(..) {
            if ids.contains(&node.id) {
                members.push(node);
            } else {
                remaining.push(node);
            }
        }
        self.nodes = remaining;
        if members.is_empty() {
            return None;
        }

        let min_x = members.iter().map(|n| n.position.x).fold(f64::MAX, f64::min);
        let min_y = members.iter().map(|n| n.position.y).fold(f64::MAX, f64::min);
        let max_x = members
            .iter()
            .map(|n| n.position.x + n.size.width)
            .fold(f64::MIN, f64::max);
        let max_y = members
            .iter()
            .map(|n| n.position.y + n.size.height)
            .fold(f64::MIN, f64::max);

        let mut composite = CompositeBlock::new(name, Point::new(min_x, min_y));
        composite.size = Size {
            width: (max_x - min_x).max(Size::default().width),
            height: (max_y - min_y).max(Size::default().height),
        };
        composite.children = members;
        let id = composite.id;
        self.composites.push(composite);
        Some(id)
    }

    /// Dissolve a composite, returning its children to the top level
    /// unchanged. If the active scope was that composite, scope resets to
    /// root.
    pub fn ungroup(&mut self, composite_id: Uuid) -> bool {
        let Some(index) = self.composites.iter().position(|c| c.id == composite_id) else {
            return false;
        };
        let composite = self.composites.remove(index);
        self.nodes.extend(composite.children);
        if self.scope == Scope::Composite(composite_id) {
            self.scope = Scope::Root;
        }
        true
    }

    pub fn enter_composite(&mut self, composite_id: Uuid) -> bool {
        if self.composites.iter().any(|c| c.id == composite_id) {
            self.scope = Scope::Composite(composite_id);
            true
        } else {
            false
        }
    }

    pub fn exit_to_root(&mut self) {
        self.scope = Scope::Root;
    }

    // ----- queries -----

    /// True iff any other node's property values reference this node's
    /// (type, terraform-name) pair.
    pub fn is_referenced(&self, node_id: Uuid) -> bool {
        let Some(target) = self.find_node(node_id) else {
            return false;
        };
        let wanted = (target.type_name.clone(), target.terraform_name());
        self.all_nodes()
            .filter(|n| n.id != node_id)
            .flat_map(|n| n.properties().values())
            .any(|value| {
                analyzer::find_resource_references(&codec::encode(value))
                    .iter()
                    .any(|(t, n)| *t == wanted.0 && *n == wanted.1)
            })
    }

    fn scoped_nodes(&self) -> &[ResourceNode] {
        match self.scope {
            Scope::Root => &self.nodes,
            Scope::Composite(id) => self
                .composites
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn scoped_nodes_mut(&mut self) -> &mut Vec<ResourceNode> {
        if let Scope::Composite(id) = self.scope {
            if let Some(index) = self.composites.iter().position(|c| c.id == id) {
                return &mut self.composites[index].children;
            }
        }
        &mut self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::schema::ResourceKind;

    fn graph() -> ResourceGraph {
        ResourceGraph::new(SchemaProvider::new())
    }

    fn node(kind: ResourceKind, name: &str, x: f64, y: f64) -> ResourceNode {
        let mut n = ResourceNode::new(kind, name);
        n.set_position(Point::new(x, y));
        n
    }

    #[test]
    fn test_add_node_applies_schema_defaults() {
        let mut g = graph();
        let id = g.add_node(ResourceNode::new(ResourceKind::Vpc, "main"));
        let n = g.find_node(id).unwrap();
        assert_eq!(n.property("cidr_block"), Some("10.0.0.0/16"));
        assert_eq!(n.property("enable_dns_support"), Some("true"));
    }

    #[test]
    fn test_defaults_do_not_overwrite_existing_properties() {
        let mut g = graph();
        let mut n = ResourceNode::new(ResourceKind::Vpc, "main");
        n.set_property("cidr_block", "172.16.0.0/16");
        let id = g.add_node(n);
        assert_eq!(
            g.find_node(id).unwrap().property("cidr_block"),
            Some("172.16.0.0/16")
        );
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        let b = g.add_node(node(ResourceKind::Subnet, "b", 300.0, 0.0));
        g.add_connection(a, b).unwrap();
        assert_eq!(g.connections().len(), 1);
        assert!(g.remove_node(a));
        assert_eq!(g.connections().len(), 0);
    }

    #[test]
    fn test_duplicate_connection_refused() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        let b = g.add_node(node(ResourceKind::Subnet, "b", 300.0, 0.0));
        assert!(g.add_connection(a, b).is_some());
        assert!(g.add_connection(a, b).is_none());
        assert_eq!(g.connections().len(), 1);
    }

    #[test]
    fn test_variable_duplicate_is_noop() {
        let mut g = graph();
        let mut first = Variable::new("x", crate::graph::model::VariableType::String);
        first.description = "first".to_string();
        let mut second = Variable::new("x", crate::graph::model::VariableType::String);
        second.description = "second".to_string();
        assert!(g.add_variable(first));
        assert!(!g.add_variable(second));
        assert_eq!(g.variables().len(), 1);
        assert_eq!(g.variables()[0].description, "first");
    }

    #[test]
    fn test_drag_commits_edge_to_nearest_anchor() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        let b = g.add_node(node(ResourceKind::Subnet, "b", 400.0, 0.0));
        let b_input = g.find_node(b).unwrap().input_anchor;

        g.start_connection_drag(a, AnchorRole::Output);
        g.update_drag_position(Point::new(b_input.x - 5.0, b_input.y));
        let edge = g.end_connection_drag(Point::new(b_input.x - 5.0, b_input.y));
        assert!(edge.is_some());
        assert_eq!(g.connections()[0].source_id, a);
        assert_eq!(g.connections()[0].target_id, b);
    }

    #[test]
    fn test_drag_discarded_outside_threshold() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        g.add_node(node(ResourceKind::Subnet, "b", 400.0, 0.0));

        g.start_connection_drag(a, AnchorRole::Output);
        let edge = g.end_connection_drag(Point::new(1000.0, 1000.0));
        assert!(edge.is_none());
        assert!(g.connections().is_empty());
    }

    #[test]
    fn test_drag_tie_breaks_on_lowest_node_id() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        // Two candidates at identical positions, so both input anchors are
        // equidistant from the drop point.
        let b = g.add_node(node(ResourceKind::Subnet, "b", 400.0, 0.0));
        let c = g.add_node(node(ResourceKind::Subnet, "c", 400.0, 0.0));
        let drop = g.find_node(b).unwrap().input_anchor;

        g.start_connection_drag(a, AnchorRole::Output);
        g.end_connection_drag(drop).unwrap();

        let expected = b.min(c);
        assert_eq!(g.connections()[0].target_id, expected);
    }

    #[test]
    fn test_drag_calls_while_idle_are_noops() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        g.update_drag_position(Point::new(1.0, 1.0));
        assert!(g.end_connection_drag(Point::new(1.0, 1.0)).is_none());
        assert!(g.connections().is_empty());
        // Input-role drags pick the other node's output anchor.
        let b = g.add_node(node(ResourceKind::Subnet, "b", 400.0, 0.0));
        let a_output = g.find_node(a).unwrap().output_anchor;
        g.start_connection_drag(b, AnchorRole::Input);
        g.end_connection_drag(a_output).unwrap();
        assert_eq!(g.connections()[0].source_id, a);
        assert_eq!(g.connections()[0].target_id, b);
    }

    #[test]
    fn test_group_and_ungroup_restore_nodes() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 50.0, 120.0));
        let b = g.add_node(node(ResourceKind::Subnet, "b", 400.0, 40.0));
        let mut expected: Vec<Uuid> = vec![a, b];
        expected.sort();

        let composite_id = g.group_nodes(&[a, b], "network").unwrap();
        assert!(g.nodes().is_empty());
        let composite = g
            .composites()
            .iter()
            .find(|c| c.id == composite_id)
            .unwrap();
        assert_eq!(composite.position, Point::new(50.0, 40.0));
        assert_eq!(composite.children.len(), 2);

        assert!(g.ungroup(composite_id));
        let mut restored: Vec<Uuid> = g.nodes().iter().map(|n| n.id).collect();
        restored.sort();
        assert_eq!(restored, expected);
        assert!(g.composites().is_empty());
    }

    #[test]
    fn test_ungroup_resets_active_scope() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        let composite_id = g.group_nodes(&[a], "net").unwrap();
        assert!(g.enter_composite(composite_id));
        assert_eq!(g.scope(), Scope::Composite(composite_id));
        g.ungroup(composite_id);
        assert_eq!(g.scope(), Scope::Root);
    }

    #[test]
    fn test_scoped_add_inside_composite() {
        let mut g = graph();
        let a = g.add_node(node(ResourceKind::Vpc, "a", 0.0, 0.0));
        let composite_id = g.group_nodes(&[a], "net").unwrap();
        g.enter_composite(composite_id);
        let b = g.add_node(node(ResourceKind::Subnet, "b", 10.0, 10.0));
        assert!(g.nodes().is_empty());
        let composite = g.composites().iter().find(|c| c.id == composite_id).unwrap();
        assert!(composite.children.iter().any(|n| n.id == b));
        g.exit_to_root();
        assert!(g.find_node(b).is_some());
    }

    #[test]
    fn test_is_referenced() {
        let mut g = graph();
        let vpc = g.add_node(node(ResourceKind::Vpc, "main-vpc", 0.0, 0.0));
        let subnet = g.add_node(node(ResourceKind::Subnet, "public", 400.0, 0.0));
        assert!(!g.is_referenced(vpc));
        g.find_node_mut(subnet)
            .unwrap()
            .set_property("vpc_id", "aws_vpc.main_vpc.id");
        assert!(g.is_referenced(vpc));
        assert!(!g.is_referenced(subnet));
    }
}
