use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("Invalid identifier regex"));

/// Normalize a display name into a Terraform-safe identifier.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9_]` into a
/// single underscore, and trims leading/trailing underscores.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let collapsed = UNSAFE_CHARS.replace_all(&lowered, "_");
    collapsed.trim_matches('_').to_string()
}

/// Escape a string for use inside a quoted HCL literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// True when the value is a bare integer or float literal.
pub fn is_number(value: &str) -> bool {
    !value.is_empty()
        && value.parse::<f64>().is_ok()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e' || c == 'E')
}

/// True when the value is a bare boolean literal.
pub fn is_bool(value: &str) -> bool {
    value == "true" || value == "false"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("main-vpc"), "main_vpc");
        assert_eq!(normalize_name("Public Subnet #1"), "public_subnet_1");
        assert_eq!(normalize_name("--edge--"), "edge");
        assert_eq!(normalize_name("already_safe"), "already_safe");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_string("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_is_number() {
        assert!(is_number("8080"));
        assert!(is_number("3.14"));
        assert!(is_number("-2"));
        assert!(!is_number("10.0.0.0/16"));
        assert!(!is_number("t2.micro"));
        assert!(!is_number(""));
    }
}
