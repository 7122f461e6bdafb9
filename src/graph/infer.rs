//! Dependency inference: turns drawn connections into attribute references
//! on the target node, or an explicit `depends_on` ordering constraint when
//! no schema property fits. Best-effort by design; an edge is never dropped
//! and inference never fails generation.

use crate::graph::graph::ResourceGraph;
use crate::terraform::schema::{ResourceKind, SchemaProvider};
use uuid::Uuid;

/// Counts reported back to the caller for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InferenceSummary {
    /// Edges resolved to a concrete attribute reference.
    pub resolved: usize,
    /// Edges degraded to a depends_on ordering constraint.
    pub ordering: usize,
}

enum Write {
    Property {
        target: Uuid,
        name: String,
        value: String,
    },
    DependsOn {
        target: Uuid,
        source_ref: String,
    },
}

/// Re-express every connection as either an attribute reference on the
/// target or a depends_on entry.
pub fn apply(graph: &mut ResourceGraph) -> InferenceSummary {
    let schema = graph.schema().clone();
    let mut writes = Vec::new();

    for connection in graph.connections() {
        let Some(source) = graph.find_node(connection.source_id) else {
            continue;
        };
        let Some(target) = graph.find_node(connection.target_id) else {
            continue;
        };
        let source_ref = source.reference_expr();
        match match_target_property(&schema, source.kind, target.kind) {
            Some(property) => {
                let attribute = schema.attribute_for_property(&property);
                writes.push(Write::Property {
                    target: target.id,
                    name: property,
                    value: format!("{}.{}", source_ref, attribute),
                });
            }
            None => writes.push(Write::DependsOn {
                target: target.id,
                source_ref,
            }),
        }
    }

    let mut summary = InferenceSummary::default();
    for write in writes {
        match write {
            Write::Property {
                target,
                name,
                value,
            } => {
                if let Some(node) = graph.find_node_mut(target) {
                    node.set_property(name, value);
                    summary.resolved += 1;
                }
            }
            Write::DependsOn { target, source_ref } => {
                if let Some(node) = graph.find_node_mut(target) {
                    let merged = append_entry(node.property("depends_on"), &source_ref);
                    node.set_property("depends_on", merged);
                    summary.ordering += 1;
                }
            }
        }
    }
    summary
}

/// First declared property on the target whose name matches one of the
/// source kind's reference patterns.
fn match_target_property(
    schema: &SchemaProvider,
    source_kind: ResourceKind,
    target_kind: ResourceKind,
) -> Option<String> {
    let properties = schema.properties(target_kind)?;
    let patterns = schema.reference_patterns(source_kind);
    properties
        .iter()
        .find(|p| patterns.iter().any(|pattern| pattern == p.name))
        .map(|p| p.name.to_string())
}

/// Append an entry to a list-valued property, de-duplicating against
/// anything already present.
fn append_entry(existing: Option<&str>, entry: &str) -> String {
    let mut entries: Vec<String> = existing
        .map(|value| {
            value
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if !entries.iter().any(|e| e == entry) {
        entries.push(entry.to_string());
    }
    format!("[{}]", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::ResourceNode;

    fn graph_with_edge(
        source_kind: ResourceKind,
        source_name: &str,
        target_kind: ResourceKind,
        target_name: &str,
    ) -> ResourceGraph {
        let mut g = ResourceGraph::new(SchemaProvider::new());
        let s = g.add_node(ResourceNode::new(source_kind, source_name));
        let t = g.add_node(ResourceNode::new(target_kind, target_name));
        g.add_connection(s, t).unwrap();
        g
    }

    #[test]
    fn test_vpc_to_subnet_writes_vpc_id() {
        let mut g = graph_with_edge(
            ResourceKind::Vpc,
            "main-vpc",
            ResourceKind::Subnet,
            "public-subnet",
        );
        let summary = apply(&mut g);
        assert_eq!(summary.resolved, 1);
        let subnet = g
            .nodes()
            .iter()
            .find(|n| n.display_name == "public-subnet")
            .unwrap();
        assert_eq!(subnet.property("vpc_id"), Some("aws_vpc.main_vpc.id"));
    }

    #[test]
    fn test_role_to_lambda_reads_arn() {
        let mut g = graph_with_edge(
            ResourceKind::IamRole,
            "app role",
            ResourceKind::LambdaFunction,
            "worker",
        );
        apply(&mut g);
        let lambda = g
            .nodes()
            .iter()
            .find(|n| n.display_name == "worker")
            .unwrap();
        assert_eq!(lambda.property("role"), Some("aws_iam_role.app_role.arn"));
    }

    #[test]
    fn test_unmatched_edge_degrades_to_depends_on() {
        let mut g = graph_with_edge(ResourceKind::S3Bucket, "logs", ResourceKind::Vpc, "main");
        let summary = apply(&mut g);
        assert_eq!(summary.ordering, 1);
        let vpc = g.nodes().iter().find(|n| n.display_name == "main").unwrap();
        assert_eq!(vpc.property("depends_on"), Some("[aws_s3_bucket.logs]"));
    }

    #[test]
    fn test_depends_on_is_deduplicated() {
        let mut g = graph_with_edge(ResourceKind::S3Bucket, "logs", ResourceKind::Vpc, "main");
        apply(&mut g);
        apply(&mut g);
        let vpc = g.nodes().iter().find(|n| n.display_name == "main").unwrap();
        assert_eq!(vpc.property("depends_on"), Some("[aws_s3_bucket.logs]"));
    }

    #[test]
    fn test_reference_overwrites_prior_value() {
        let mut g = graph_with_edge(
            ResourceKind::Vpc,
            "new-vpc",
            ResourceKind::Subnet,
            "public",
        );
        let subnet_id = g
            .nodes()
            .iter()
            .find(|n| n.display_name == "public")
            .unwrap()
            .id;
        g.find_node_mut(subnet_id)
            .unwrap()
            .set_property("vpc_id", "aws_vpc.old.id");
        apply(&mut g);
        assert_eq!(
            g.find_node(subnet_id).unwrap().property("vpc_id"),
            Some("aws_vpc.new_vpc.id")
        );
    }

    #[test]
    fn test_schema_lookup_miss_falls_back_to_depends_on() {
        let mut g = ResourceGraph::new(SchemaProvider::new());
        let s = g.add_node(ResourceNode::new(ResourceKind::Vpc, "main"));
        let t = g.add_node(ResourceNode::with_type(
            ResourceKind::Unknown,
            "google_thing",
            "external",
        ));
        g.add_connection(s, t).unwrap();
        let summary = apply(&mut g);
        assert_eq!(summary.ordering, 1);
        assert_eq!(
            g.find_node(t).unwrap().property("depends_on"),
            Some("[aws_vpc.main]")
        );
    }
}
