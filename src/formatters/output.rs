use crate::graph::model::ResourceNode;
use crate::terraform::document::ParseResult;
use crate::terraform::schema::SchemaProvider;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Output formatter for structured, user-friendly results
pub struct OutputFormatter;

impl OutputFormatter {
    /// Format a parse result as a structured analysis summary
    pub fn format_analysis(result: &ParseResult, schema: &SchemaProvider) -> Value {
        let mut by_kind: HashMap<&'static str, usize> = HashMap::new();
        for record in &result.resources {
            let kind = schema.categorize(&record.resource_type);
            *by_kind.entry(kind.display_name()).or_insert(0) += 1;
        }
        let mut kind_counts: Vec<(&str, usize)> = by_kind.into_iter().collect();
        kind_counts.sort();

        json!({
            "summary": {
                "resource_count": result.resources.len(),
                "variable_count": result.variables.len(),
                "description": "Resources and variables discovered in the supplied configuration"
            },
            "resources": result.resources.iter().map(|record| {
                json!({
                    "type": record.resource_type,
                    "name": record.name,
                    "kind": schema.categorize(&record.resource_type).display_name(),
                    "property_count": record.properties.len()
                })
            }).collect::<Vec<_>>(),
            "kinds": kind_counts.iter().map(|(kind, count)| {
                json!({ "kind": kind, "count": count })
            }).collect::<Vec<_>>(),
            "variables": result.variables.iter().map(|variable| {
                json!({
                    "name": variable.name,
                    "type": variable.var_type.type_token(),
                    "has_default": variable.default.is_some(),
                    "sensitive": variable.sensitive
                })
            }).collect::<Vec<_>>(),
            "usage_note": "Run 'tfcanvas generate' to emit Terraform for these resources"
        })
    }

    /// Format the nodes currently on the canvas
    pub fn format_nodes(nodes: &[ResourceNode]) -> Value {
        json!({
            "node_count": nodes.len(),
            "nodes": nodes.iter().map(|node| {
                json!({
                    "id": node.id,
                    "kind": node.kind.display_name(),
                    "type": node.type_name,
                    "name": node.display_name,
                    "terraform_name": node.terraform_name(),
                })
            }).collect::<Vec<_>>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::document;

    #[test]
    fn test_format_analysis() {
        let result = document::parse(
            r#"
resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }
variable "region" { type = string }
"#,
        )
        .unwrap();
        let schema = SchemaProvider::new();
        let formatted = OutputFormatter::format_analysis(&result, &schema);
        assert_eq!(formatted["summary"]["resource_count"], 1);
        assert_eq!(formatted["summary"]["variable_count"], 1);
        assert_eq!(formatted["resources"][0]["kind"], "VPC");
        assert_eq!(formatted["variables"][0]["name"], "region");
    }
}
