//! Reference analyzer: decomposes a marker-encoded property value into
//! typed segments and answers "which variables / resources does this value
//! reference" queries. Pure functions of their input.

use crate::terraform::codec::{self, MARKER_END, MARKER_START};
use once_cell::sync::Lazy;
use regex::Regex;

static RESOURCE_REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_.\[\]*-]+))?$")
        .expect("Invalid resource reference regex")
});

static FUNCTION_CALL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$").expect("Invalid function call regex")
});

/// One classified piece of a property value, in document order. `raw`
/// carries the exact original expression text so unchanged values re-emit
/// identically.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSegment {
    Text {
        text: String,
    },
    VariableRef {
        name: String,
        raw: String,
    },
    ResourceRef {
        resource_type: String,
        name: String,
        attribute: Option<String>,
        raw: String,
    },
    FunctionCall {
        name: String,
        args: Vec<ValueSegment>,
        raw: String,
    },
    Expression {
        raw: String,
    },
}

/// Decompose a marker-encoded value into ordered segments.
pub fn analyze(value: &str) -> Vec<ValueSegment> {
    let mut segments = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find(MARKER_START) {
        if start > 0 {
            segments.push(ValueSegment::Text {
                text: rest[..start].to_string(),
            });
        }
        let after = &rest[start + MARKER_START.len()..];
        let Some(end) = find_span_end(after) else {
            // Dangling marker; keep the remainder as literal text.
            segments.push(ValueSegment::Text {
                text: rest[start..].to_string(),
            });
            return segments;
        };
        let inner = codec::decode(&after[..end]);
        segments.push(classify_expression(inner.trim()));
        rest = &after[end + MARKER_END.len()..];
    }
    if !rest.is_empty() {
        segments.push(ValueSegment::Text {
            text: rest.to_string(),
        });
    }
    segments
}

/// Classify one expression, in priority order: variable reference,
/// resource-attribute reference, function call, opaque expression.
fn classify_expression(expr: &str) -> ValueSegment {
    if let Some(name) = expr.strip_prefix("var.") {
        return ValueSegment::VariableRef {
            name: name.to_string(),
            raw: expr.to_string(),
        };
    }
    if let Some(caps) = RESOURCE_REF_REGEX.captures(expr) {
        return ValueSegment::ResourceRef {
            resource_type: caps[1].to_string(),
            name: caps[2].to_string(),
            attribute: caps.get(3).map(|m| m.as_str().to_string()),
            raw: expr.to_string(),
        };
    }
    if let Some(caps) = FUNCTION_CALL_REGEX.captures(expr) {
        let name = caps[1].to_string();
        let args = split_top_level_args(caps.get(2).map_or("", |m| m.as_str()))
            .into_iter()
            .map(|arg| classify_argument(&arg))
            .collect();
        return ValueSegment::FunctionCall {
            name,
            args,
            raw: expr.to_string(),
        };
    }
    ValueSegment::Expression {
        raw: expr.to_string(),
    }
}

/// Function arguments are re-analyzed with the same classifier; quoted
/// literals become text segments.
fn classify_argument(arg: &str) -> ValueSegment {
    let trimmed = arg.trim();
    if trimmed.starts_with('"') {
        return ValueSegment::Text {
            text: trimmed.to_string(),
        };
    }
    classify_expression(trimmed)
}

/// Variable names referenced anywhere in the value, in order of first
/// appearance, including inside function-call arguments.
pub fn find_variable_references(value: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_variable_refs(&analyze(value), &mut names);
    names
}

fn collect_variable_refs(segments: &[ValueSegment], out: &mut Vec<String>) {
    for segment in segments {
        match segment {
            ValueSegment::VariableRef { name, .. } => {
                // Only the variable's own name; attribute paths trail it.
                let base = name.split('.').next().unwrap_or(name).to_string();
                if !out.contains(&base) {
                    out.push(base);
                }
            }
            ValueSegment::FunctionCall { args, .. } => collect_variable_refs(args, out),
            _ => {}
        }
    }
}

/// (type, name) pairs referenced anywhere in the value. Marker-delimited
/// spans are analyzed; bare whole-value references (as written by
/// dependency inference) and bare list entries are recognized as well.
pub fn find_resource_references(value: &str) -> Vec<(String, String)> {
    let mut refs = Vec::new();
    collect_resource_refs(&analyze(value), &mut refs);
    if !codec::contains_marker(value) {
        for token in bare_tokens(value) {
            if let Some(caps) = RESOURCE_REF_REGEX.captures(token) {
                if caps[1].contains('_') || &caps[1] == "module" {
                    push_unique(&mut refs, (caps[1].to_string(), caps[2].to_string()));
                }
            }
        }
    }
    refs
}

fn collect_resource_refs(segments: &[ValueSegment], out: &mut Vec<(String, String)>) {
    for segment in segments {
        match segment {
            ValueSegment::ResourceRef {
                resource_type,
                name,
                ..
            } => push_unique(out, (resource_type.clone(), name.clone())),
            ValueSegment::FunctionCall { args, .. } => collect_resource_refs(args, out),
            _ => {}
        }
    }
}

fn push_unique(refs: &mut Vec<(String, String)>, entry: (String, String)) {
    if !refs.contains(&entry) {
        refs.push(entry);
    }
}

/// Candidate reference tokens of an unmarked value: the whole value, or
/// each element of a `[...]` list.
fn bare_tokens(value: &str) -> Vec<&str> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        inner.split(',').map(str::trim).collect()
    } else {
        vec![trimmed]
    }
}

/// Split function-call arguments at top-level commas, respecting nested
/// brackets and quoted strings.
fn split_top_level_args(args: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut current = String::new();
    let mut chars = args.chars();
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
            ',' if depth == 0 && !in_string => {
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

/// Byte offset of the MARKER_END matching an already-opened span.
fn find_span_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with(MARKER_START) {
            depth += 1;
            i += MARKER_START.len();
        } else if text[i..].starts_with(MARKER_END) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
            i += MARKER_END.len();
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::codec::encode;

    #[test]
    fn test_literal_only() {
        let segments = analyze("just text");
        assert_eq!(
            segments,
            vec![ValueSegment::Text {
                text: "just text".to_string()
            }]
        );
    }

    #[test]
    fn test_variable_reference() {
        let segments = analyze(&encode("${var.region}"));
        assert_eq!(segments.len(), 1);
        match &segments[0] {
            ValueSegment::VariableRef { name, raw } => {
                assert_eq!(name, "region");
                assert_eq!(raw, "var.region");
            }
            other => panic!("expected variable ref, got {:?}", other),
        }
    }

    #[test]
    fn test_resource_reference_with_attribute() {
        let segments = analyze(&encode("${aws_vpc.main.id}"));
        match &segments[0] {
            ValueSegment::ResourceRef {
                resource_type,
                name,
                attribute,
                ..
            } => {
                assert_eq!(resource_type, "aws_vpc");
                assert_eq!(name, "main");
                assert_eq!(attribute.as_deref(), Some("id"));
            }
            other => panic!("expected resource ref, got {:?}", other),
        }
    }

    #[test]
    fn test_resource_reference_without_attribute() {
        let segments = analyze(&encode("${aws_subnet.public}"));
        match &segments[0] {
            ValueSegment::ResourceRef { attribute, .. } => assert_eq!(attribute, &None),
            other => panic!("expected resource ref, got {:?}", other),
        }
    }

    #[test]
    fn test_function_call_args_recursively_analyzed() {
        let segments = analyze(&encode(r#"${lookup(var.amis, "us-east-1")}"#));
        match &segments[0] {
            ValueSegment::FunctionCall { name, args, .. } => {
                assert_eq!(name, "lookup");
                assert_eq!(args.len(), 2);
                assert!(
                    matches!(&args[0], ValueSegment::VariableRef { name, .. } if name == "amis")
                );
                assert!(
                    matches!(&args[1], ValueSegment::Text { text } if text == "\"us-east-1\"")
                );
            }
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_opaque_expression() {
        let segments = analyze(&encode("${count.index + 1}"));
        assert!(
            matches!(&segments[0], ValueSegment::Expression { raw } if raw == "count.index + 1")
        );
    }

    #[test]
    fn test_mixed_value_preserves_order_and_text() {
        let segments = analyze(&encode("${var.env}-assets-${var.suffix}"));
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[0], ValueSegment::VariableRef { name, .. } if name == "env"));
        assert!(matches!(&segments[1], ValueSegment::Text { text } if text == "-assets-"));
        assert!(matches!(&segments[2], ValueSegment::VariableRef { name, .. } if name == "suffix"));
    }

    #[test]
    fn test_find_variable_references_inside_function_args() {
        let refs = find_variable_references(&encode(r#"${format("%s-%s", var.env, var.app)}"#));
        assert_eq!(refs, ["env", "app"]);
    }

    #[test]
    fn test_find_resource_references_in_spans() {
        let refs = find_resource_references(&encode("${aws_vpc.main.id}/${aws_subnet.a.id}"));
        assert_eq!(
            refs,
            [
                ("aws_vpc".to_string(), "main".to_string()),
                ("aws_subnet".to_string(), "a".to_string())
            ]
        );
    }

    #[test]
    fn test_find_resource_references_bare_value() {
        let refs = find_resource_references("aws_vpc.main_vpc.id");
        assert_eq!(refs, [("aws_vpc".to_string(), "main_vpc".to_string())]);
    }

    #[test]
    fn test_find_resource_references_bare_list() {
        let refs = find_resource_references("[aws_vpc.main_vpc, aws_subnet.public]");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].0, "aws_vpc");
        assert_eq!(refs[1].0, "aws_subnet");
    }

    #[test]
    fn test_bare_plain_string_is_not_a_reference() {
        assert!(find_resource_references("t2.micro").is_empty());
        assert!(find_resource_references("10.0.0.0/16").is_empty());
        assert!(find_variable_references("plain").is_empty());
    }
}
