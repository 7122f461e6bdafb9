//! Document parser: Terraform text into typed records.
//!
//! The document is first run through the interpolation codec so `${...}`
//! spans cannot be misread as structure, then scanned with a generic
//! nested-block grammar (block type, quoted labels, attribute map, nested
//! blocks). Resource and variable records are produced from the tree;
//! unrecognized block kinds are acknowledged and dropped. Attribute values
//! stay loosely typed until the property-map boundary, where they are
//! flattened to generation-ready strings with interpolation restored.

use crate::graph::model::{Point, ResourceNode, Variable, VariableType};
use crate::shared::utils::escape_string;
use crate::terraform::codec;
use crate::terraform::schema::SchemaProvider;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: usize },

    #[error("unterminated block starting at line {line}")]
    UnterminatedBlock { line: usize },
}

/// Loosely typed attribute value as it appears in the block tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Quoted string, escapes resolved, interpolation still marker-encoded.
    Str(String),
    /// Bare expression token (number, bool, reference, function call).
    Bare(String),
    List(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
}

/// One parsed block: `kind "label" ... { attributes / nested blocks }`.
#[derive(Debug, Clone)]
struct Block {
    kind: String,
    labels: Vec<String>,
    attributes: IndexMap<String, RawValue>,
    line: usize,
}

/// Flattened record for one resource or module declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_type: String,
    pub name: String,
    pub properties: IndexMap<String, String>,
}

#[derive(Debug, Default)]
pub struct ParseResult {
    pub resources: Vec<ResourceRecord>,
    pub variables: Vec<Variable>,
}

/// Parse a full document into resource and variable records.
pub fn parse(text: &str) -> Result<ParseResult, DocumentError> {
    let encoded = codec::encode(text);
    let blocks = Scanner::new(&encoded).parse_document()?;

    let mut result = ParseResult::default();
    for block in blocks {
        match block.kind.as_str() {
            "resource" => {
                if block.labels.len() < 2 {
                    return Err(DocumentError::Syntax {
                        line: block.line,
                        message: "resource block requires type and name labels".to_string(),
                    });
                }
                push_resource(
                    &mut result.resources,
                    ResourceRecord {
                        resource_type: block.labels[0].clone(),
                        name: block.labels[1].clone(),
                        properties: flatten_attributes(&block.attributes),
                    },
                );
            }
            "module" => {
                if block.labels.is_empty() {
                    return Err(DocumentError::Syntax {
                        line: block.line,
                        message: "module block requires a name label".to_string(),
                    });
                }
                push_resource(
                    &mut result.resources,
                    ResourceRecord {
                        resource_type: "module".to_string(),
                        name: block.labels[0].clone(),
                        properties: flatten_attributes(&block.attributes),
                    },
                );
            }
            "variable" => {
                if block.labels.is_empty() {
                    return Err(DocumentError::Syntax {
                        line: block.line,
                        message: "variable block requires a name label".to_string(),
                    });
                }
                let variable = variable_from_block(&block.labels[0], &block.attributes);
                if !result.variables.iter().any(|v| v.name == variable.name) {
                    result.variables.push(variable);
                }
            }
            other => {
                tracing::debug!(kind = other, line = block.line, "skipping block");
            }
        }
    }
    Ok(result)
}

/// Build canvas nodes from parsed records: catalog kind via the
/// categorizer, display description from the kind, and a simple grid
/// layout. Property values carry over unchanged.
pub fn convert_to_nodes(records: &[ResourceRecord], schema: &SchemaProvider) -> Vec<ResourceNode> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let kind = schema.categorize(&record.resource_type);
            let mut node = ResourceNode::with_type(kind, &record.resource_type, &record.name);
            node.set_position(grid_position(i));
            for (name, value) in &record.properties {
                node.set_property(name, value);
            }
            node
        })
        .collect()
}

fn grid_position(index: usize) -> Point {
    let column = (index % 4) as f64;
    let row = (index / 4) as f64;
    Point::new(80.0 + column * 260.0, 80.0 + row * 180.0)
}

/// Duplicate (type, name) pairs within one document are last-write-wins: the
/// later block replaces the earlier record in place.
fn push_resource(records: &mut Vec<ResourceRecord>, record: ResourceRecord) {
    if let Some(existing) = records
        .iter_mut()
        .find(|r| r.resource_type == record.resource_type && r.name == record.name)
    {
        *existing = record;
    } else {
        records.push(record);
    }
}

fn variable_from_block(name: &str, attributes: &IndexMap<String, RawValue>) -> Variable {
    let var_type = match attributes.get("type") {
        Some(RawValue::Bare(token)) | Some(RawValue::Str(token)) => {
            VariableType::from_token(&codec::decode(token))
        }
        _ => VariableType::String,
    };
    let description = match attributes.get("description") {
        Some(RawValue::Str(text)) => codec::decode(text),
        _ => String::new(),
    };
    let default = attributes.get("default").map(flatten_value);
    let sensitive = matches!(attributes.get("sensitive"), Some(RawValue::Bare(token)) if token == "true");

    Variable {
        name: name.to_string(),
        var_type,
        default,
        description,
        sensitive,
    }
}

/// Flatten a block's attribute tree into generation-ready property strings.
fn flatten_attributes(attributes: &IndexMap<String, RawValue>) -> IndexMap<String, String> {
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), flatten_value(value)))
        .collect()
}

/// Top-level value flattening: strings lose their quotes, `var.` references
/// are stored as the bare variable name, `jsonencode(...)` policy calls are
/// stored as their inner map text. Interpolation markers are restored here,
/// never earlier.
fn flatten_value(value: &RawValue) -> String {
    match value {
        RawValue::Str(text) => codec::decode(text),
        RawValue::Bare(token) => {
            let decoded = codec::decode(token);
            if let Some(name) = decoded.strip_prefix("var.") {
                if is_identifier(name) {
                    return name.to_string();
                }
            }
            if let Some(inner) = decoded
                .strip_prefix("jsonencode(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                return inner.trim().to_string();
            }
            decoded
        }
        RawValue::List(_) | RawValue::Map(_) => canonical_value(value),
    }
}

/// Canonical nested form: strings stay quoted (escaped), lists and maps are
/// rendered single-line so regeneration is deterministic.
fn canonical_value(value: &RawValue) -> String {
    match value {
        RawValue::Str(text) => format!(
            "\"{}\"",
            codec::escape_outside_spans(&codec::decode(text))
        ),
        RawValue::Bare(token) => codec::decode(token),
        RawValue::List(items) => {
            let parts: Vec<String> = items.iter().map(canonical_value).collect();
            format!("[{}]", parts.join(", "))
        }
        RawValue::Map(entries) => {
            if entries.is_empty() {
                return "{}".to_string();
            }
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{} = {}", canonical_key(k), canonical_value(v)))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
    }
}

fn canonical_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_string(key))
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !text.starts_with(|c: char| c.is_ascii_digit())
}

/// Generic nested-block scanner over marker-encoded text.
struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn parse_document(mut self) -> Result<Vec<Block>, DocumentError> {
        let mut blocks = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                return Ok(blocks);
            }
            blocks.push(self.parse_block()?);
        }
    }

    fn parse_block(&mut self) -> Result<Block, DocumentError> {
        let line = self.line;
        let kind = self.parse_identifier()?;
        let mut labels = Vec::new();
        loop {
            self.skip_inline_space();
            match self.peek() {
                Some(b'"') => labels.push(self.parse_quoted()?),
                Some(b'{') => break,
                _ => {
                    return Err(DocumentError::Syntax {
                        line: self.line,
                        message: format!("expected label or '{{' after '{}'", kind),
                    })
                }
            }
        }
        self.bump(); // consume '{'
        let attributes = self.parse_body(line)?;
        Ok(Block {
            kind,
            labels,
            attributes,
            line,
        })
    }

    /// Body of a block: attributes and nested blocks until the closing '}'.
    /// Nested blocks surface as map-valued attributes under their type name.
    fn parse_body(
        &mut self,
        opened_at: usize,
    ) -> Result<IndexMap<String, RawValue>, DocumentError> {
        let mut attributes = IndexMap::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(DocumentError::UnterminatedBlock { line: opened_at }),
                Some(b'}') => {
                    self.bump();
                    return Ok(attributes);
                }
                _ => {}
            }
            let name = self.parse_identifier()?;
            self.skip_inline_space();
            match self.peek() {
                Some(b'=') => {
                    self.bump();
                    self.skip_inline_space();
                    let value = self.parse_value()?;
                    attributes.insert(name, value);
                }
                Some(b'{') => {
                    let line = self.line;
                    self.bump();
                    let nested = self.parse_body(line)?;
                    attributes.insert(name, RawValue::Map(nested));
                }
                Some(b'"') => {
                    // Labeled nested block; labels are folded away, the body
                    // is kept under the block's type name.
                    let line = self.line;
                    while let Some(b'"') = self.peek() {
                        self.parse_quoted()?;
                        self.skip_inline_space();
                    }
                    if self.peek() != Some(b'{') {
                        return Err(DocumentError::Syntax {
                            line: self.line,
                            message: format!("expected '{{' after labels of '{}'", name),
                        });
                    }
                    self.bump();
                    let nested = self.parse_body(line)?;
                    attributes.insert(name, RawValue::Map(nested));
                }
                _ => {
                    return Err(DocumentError::Syntax {
                        line: self.line,
                        message: format!("expected '=' or block body after '{}'", name),
                    })
                }
            }
        }
    }

    fn parse_value(&mut self) -> Result<RawValue, DocumentError> {
        match self.peek() {
            Some(b'"') => Ok(RawValue::Str(self.parse_quoted()?)),
            Some(b'[') => self.parse_list(),
            Some(b'{') => {
                let line = self.line;
                self.bump();
                Ok(RawValue::Map(self.parse_object(line)?))
            }
            Some(_) => Ok(RawValue::Bare(self.parse_bare()?)),
            None => Err(DocumentError::Syntax {
                line: self.line,
                message: "expected a value".to_string(),
            }),
        }
    }

    fn parse_list(&mut self) -> Result<RawValue, DocumentError> {
        let opened_at = self.line;
        self.bump(); // consume '['
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    return Err(DocumentError::Syntax {
                        line: opened_at,
                        message: "unterminated list".to_string(),
                    })
                }
                Some(b']') => {
                    self.bump();
                    return Ok(RawValue::List(items));
                }
                Some(b',') => {
                    self.bump();
                }
                _ => items.push(self.parse_value()?),
            }
        }
    }

    /// Object literal value: `{ key = value, ... }`. Unlike a nested block
    /// body, entries may be separated by commas and keys may be quoted.
    fn parse_object(
        &mut self,
        opened_at: usize,
    ) -> Result<IndexMap<String, RawValue>, DocumentError> {
        let mut entries = IndexMap::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(DocumentError::UnterminatedBlock { line: opened_at }),
                Some(b'}') => {
                    self.bump();
                    return Ok(entries);
                }
                Some(b',') => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            let key = if self.peek() == Some(b'"') {
                self.parse_quoted()?
            } else {
                self.parse_identifier()?
            };
            self.skip_inline_space();
            match self.peek() {
                Some(b'=') => {
                    self.bump();
                    self.skip_inline_space();
                    let value = self.parse_value()?;
                    entries.insert(key, value);
                }
                Some(b':') => {
                    self.bump();
                    self.skip_inline_space();
                    let value = self.parse_value()?;
                    entries.insert(key, value);
                }
                Some(b'{') => {
                    let line = self.line;
                    self.bump();
                    let nested = self.parse_object(line)?;
                    entries.insert(key, RawValue::Map(nested));
                }
                _ => {
                    return Err(DocumentError::Syntax {
                        line: self.line,
                        message: format!("expected '=' after key '{}'", key),
                    })
                }
            }
        }
    }

    /// Bare expression token. Consumes until a newline, comma, or closing
    /// bracket at nesting depth zero, so function calls spanning brackets
    /// (`jsonencode({...})`) are kept whole.
    fn parse_bare(&mut self) -> Result<String, DocumentError> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                b',' | b'\n' | b'#' => {
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }
        let token = self.text[start..self.pos].trim().to_string();
        if token.is_empty() {
            return Err(DocumentError::Syntax {
                line: self.line,
                message: "expected a value".to_string(),
            });
        }
        Ok(token)
    }

    /// Quoted string content with escape sequences resolved. Interpolation
    /// is already marker-encoded, so no quote or brace inside a span can
    /// terminate the scan early.
    fn parse_quoted(&mut self) -> Result<String, DocumentError> {
        let opened_at = self.line;
        self.bump(); // consume opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(DocumentError::UnterminatedString { line: opened_at }),
                Some(b'"') => {
                    self.bump();
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.bump();
                    match self.peek() {
                        Some(b'n') => {
                            out.push('\n');
                            self.bump();
                        }
                        Some(b't') => {
                            out.push('\t');
                            self.bump();
                        }
                        Some(b'"') => {
                            out.push('"');
                            self.bump();
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            self.bump();
                        }
                        Some(_) => {
                            let c = self.current_char();
                            out.push('\\');
                            out.push(c);
                            self.bump_char(c);
                        }
                        None => return Err(DocumentError::UnterminatedString { line: opened_at }),
                    }
                }
                Some(_) => {
                    let c = self.current_char();
                    out.push(c);
                    self.bump_char(c);
                }
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<String, DocumentError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(DocumentError::Syntax {
                line: self.line,
                message: "expected an identifier".to_string(),
            });
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn skip_inline_space(&mut self) {
        while let Some(b' ') | Some(b'\t') = self.peek() {
            self.bump();
        }
    }

    /// Skip whitespace and `#` / `//` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'#') => self.skip_to_eol(),
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => self.skip_to_eol(),
                _ => return,
            }
        }
    }

    fn skip_to_eol(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                return;
            }
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn current_char(&self) -> char {
        self.text[self.pos..].chars().next().unwrap_or('\0')
    }

    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn bump_char(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }
        self.pos += c.len_utf8();
    }
}
