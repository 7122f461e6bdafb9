//! Code generator: renders the node graph back into Terraform text.
//!
//! Output is deterministic: an unchanged graph regenerates byte-identical
//! artifacts, and artifacts parsed back through the document parser
//! regenerate themselves (generator fixed point).

use crate::graph::model::{ResourceNode, Variable, VariableType};
use crate::shared::utils::{escape_string, is_bool, is_number};
use crate::terraform::codec;
use crate::terraform::schema::{ResourceKind, SchemaProvider};

pub const PROVIDER_FILE: &str = "provider.tf";
pub const MAIN_FILE: &str = "main.tf";
pub const VARIABLES_FILE: &str = "variables.tf";
pub const OUTPUTS_FILE: &str = "outputs.tf";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("nothing to generate: the canvas has no resources")]
    EmptyGraph,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// The named text artifacts of one generation pass, rendered fully in
/// memory before anything touches disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedArtifacts {
    pub files: Vec<GeneratedFile>,
}

impl GeneratedArtifacts {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.content.as_str())
    }

    /// All artifacts concatenated, used by round-trip checks.
    pub fn combined(&self) -> String {
        self.files
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct CodeGenerator<'a> {
    schema: &'a SchemaProvider,
    region: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(schema: &'a SchemaProvider, region: impl Into<String>) -> Self {
        Self {
            schema,
            region: region.into(),
        }
    }

    /// Render the full artifact set. Refused up front on an empty node
    /// set; otherwise each node and variable renders independently and a
    /// malformed node degrades to a placeholder comment instead of
    /// aborting the batch.
    pub fn generate(
        &self,
        nodes: &[ResourceNode],
        variables: &[Variable],
    ) -> Result<GeneratedArtifacts, GenerateError> {
        if nodes.is_empty() {
            return Err(GenerateError::EmptyGraph);
        }

        let mut artifacts = GeneratedArtifacts::default();
        artifacts.files.push(GeneratedFile {
            name: PROVIDER_FILE.to_string(),
            content: self.render_provider(),
        });

        let blocks: Vec<String> = nodes
            .iter()
            .map(|node| {
                self.render_resource(node, variables).unwrap_or_else(|| {
                    tracing::warn!(node = %node.display_name, "node skipped during generation");
                    format!("# resource \"{}\" could not be rendered\n", node.display_name)
                })
            })
            .collect();
        artifacts.files.push(GeneratedFile {
            name: MAIN_FILE.to_string(),
            content: blocks.join("\n"),
        });

        if !variables.is_empty() {
            let blocks: Vec<String> = variables.iter().map(render_variable).collect();
            artifacts.files.push(GeneratedFile {
                name: VARIABLES_FILE.to_string(),
                content: blocks.join("\n"),
            });
        }

        let outputs = self.render_outputs(nodes);
        if !outputs.is_empty() {
            artifacts.files.push(GeneratedFile {
                name: OUTPUTS_FILE.to_string(),
                content: outputs,
            });
        }

        Ok(artifacts)
    }

    fn render_provider(&self) -> String {
        format!(
            r#"terraform {{
  required_providers {{
    aws = {{
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }}
  }}
}}

provider "aws" {{
  region = "{}"
}}
"#,
            self.region
        )
    }

    /// One resource (or module) block. None when the node cannot produce a
    /// legal block header.
    fn render_resource(&self, node: &ResourceNode, variables: &[Variable]) -> Option<String> {
        let name = node.terraform_name();
        if name.is_empty() || node.type_name.is_empty() {
            return None;
        }
        let header = if node.kind == ResourceKind::Module {
            format!("module \"{}\" {{\n", name)
        } else {
            format!("resource \"{}\" \"{}\" {{\n", node.type_name, name)
        };
        let mut block = header;
        for (property, value) in node.properties() {
            block.push_str(&format!(
                "  {} = {}\n",
                property,
                format_value(property, value, variables)
            ));
        }
        block.push_str("}\n");
        Some(block)
    }

    fn render_outputs(&self, nodes: &[ResourceNode]) -> String {
        let mut blocks = Vec::new();
        for node in nodes {
            let Some(attribute) = self.schema.output_export(node.kind) else {
                continue;
            };
            let name = node.terraform_name();
            if name.is_empty() {
                continue;
            }
            blocks.push(format!(
                "output \"{}_{}\" {{\n  value = {}.{}\n}}\n",
                name, attribute, node.reference_expr(), attribute
            ));
        }
        blocks.join("\n")
    }
}

fn render_variable(variable: &Variable) -> String {
    let mut block = format!("variable \"{}\" {{\n", variable.name);
    block.push_str(&format!("  type = {}\n", variable.var_type.type_token()));
    if !variable.description.is_empty() {
        block.push_str(&format!(
            "  description = \"{}\"\n",
            escape_string(&variable.description)
        ));
    }
    if let Some(default) = &variable.default {
        block.push_str(&format!(
            "  default = {}\n",
            format_default(variable.var_type, default)
        ));
    }
    if variable.sensitive {
        block.push_str("  sensitive = true\n");
    }
    block.push_str("}\n");
    block
}

/// Default-value formatting keyed on the variable's declared type.
fn format_default(var_type: VariableType, default: &str) -> String {
    match var_type {
        VariableType::String => format!("\"{}\"", escape_string(default)),
        VariableType::Number | VariableType::Bool => default.to_string(),
        VariableType::List | VariableType::Map => default.to_string(),
    }
}

/// Value formatting precedence, applied in order: empty, known variable,
/// attribute reference, policy document, tags block, list, depends_on,
/// interpolated string, then bool / number / quoted string.
pub fn format_value(property: &str, value: &str, variables: &[Variable]) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    if variables.iter().any(|v| v.name == value) {
        return format!("var.{}", value);
    }
    if is_attribute_reference(value) {
        return value.to_string();
    }
    if is_policy_property(property) && value.trim_start().starts_with('{') {
        return format!("jsonencode({})", value);
    }
    if property == "tags" && value.trim_start().starts_with('{') {
        return format_tags_block(value);
    }
    if value.starts_with('[') && value.ends_with(']') {
        return format_list(value, variables);
    }
    if property == "depends_on" {
        return value.to_string();
    }
    if value.contains("${") {
        // Interpolation is preserved verbatim; only text outside the
        // spans is escaped.
        return format!("\"{}\"", codec::escape_outside_spans(value));
    }
    if is_bool(value) || is_number(value) {
        return value.to_string();
    }
    format!("\"{}\"", escape_string(value))
}

/// `type.name.attribute` shape with at least three dot-separated segments
/// and a resource-type first segment.
fn is_attribute_reference(value: &str) -> bool {
    let segments: Vec<&str> = value.split('.').collect();
    if segments.len() < 3 {
        return false;
    }
    let first = segments[0];
    (first.contains('_') || first == "module")
        && segments
            .iter()
            .all(|s| !s.is_empty() && !s.contains(char::is_whitespace))
}

fn is_policy_property(property: &str) -> bool {
    property.contains("policy")
}

/// Re-render a canonical single-line map as an indented tags block.
fn format_tags_block(value: &str) -> String {
    let inner = value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if inner.is_empty() {
        return "{}".to_string();
    }
    let mut block = String::from("{\n");
    for entry in split_top_level(inner, ',') {
        let Some((key, val)) = split_once_top_level(&entry, '=') else {
            continue;
        };
        block.push_str(&format!("    {} = {}\n", key.trim(), val.trim()));
    }
    block.push_str("  }");
    block
}

/// Each list element is re-classified independently: variable, reference,
/// boolean, number, or string.
fn format_list(value: &str, variables: &[Variable]) -> String {
    let inner = &value[1..value.len() - 1];
    let parts: Vec<String> = split_top_level(inner, ',')
        .into_iter()
        .map(|e| format_list_element(e.trim(), variables))
        .filter(|e| !e.is_empty())
        .collect();
    format!("[{}]", parts.join(", "))
}

fn format_list_element(element: &str, variables: &[Variable]) -> String {
    if element.is_empty() {
        return String::new();
    }
    if element.starts_with('"') {
        return element.to_string();
    }
    if variables.iter().any(|v| v.name == element) {
        return format!("var.{}", element);
    }
    if element.starts_with("var.") || is_reference_like(element) {
        return element.to_string();
    }
    if is_bool(element) || is_number(element) {
        return element.to_string();
    }
    format!("\"{}\"", escape_string(element))
}

/// `type.name` or deeper, with a resource-type first segment.
fn is_reference_like(element: &str) -> bool {
    let segments: Vec<&str> = element.split('.').collect();
    segments.len() >= 2
        && (segments[0].contains('_') || segments[0] == "module")
        && segments.iter().all(|s| !s.is_empty())
}

/// Split at top-level separators, respecting quotes and nested brackets.
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_string = !in_string;
                current.push(c);
            }
            '\\' if in_string => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '(' | '[' | '{' if !in_string => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' if !in_string => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            _ if c == separator && depth == 0 && !in_string => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn split_once_top_level(text: &str, separator: char) -> Option<(String, String)> {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' | '{' if !in_string => depth += 1,
            ')' | ']' | '}' if !in_string => depth = depth.saturating_sub(1),
            _ if c == separator && depth == 0 && !in_string => {
                return Some((text[..i].to_string(), text[i + 1..].to_string()));
            }
            _ => {}
        }
    }
    None
}
