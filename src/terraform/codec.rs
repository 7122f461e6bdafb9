//! Reversible interpolation markers.
//!
//! `${...}` expressions would be misread by the block scanner as structure
//! (braces, quotes inside function calls), so documents are encoded before
//! scanning: each balanced `${...}` span becomes a pair of sentinel markers
//! wrapping the inner content, with quotes inside the span neutralized.
//! `decode` is the exact inverse and `decode(encode(s)) == s` holds for every
//! input, including text that already contains the sentinel tokens.

/// Marker opening an interpolation span. Long enough to be implausible in
/// real configuration text.
pub const MARKER_START: &str = "@__TFC_INTERP_OPEN__@";
/// Marker closing an interpolation span.
pub const MARKER_END: &str = "@__TFC_INTERP_CLOSE__@";
/// Stand-in for a double quote inside an interpolation span.
pub const MARKER_QUOTE: &str = "@__TFC_INTERP_QUOTE__@";

// Escaped forms for input that already contains the sentinel tokens.
const ESC_START: &str = "@__TFC_INTERP_OPEN_LIT__@";
const ESC_END: &str = "@__TFC_INTERP_CLOSE_LIT__@";
const ESC_QUOTE: &str = "@__TFC_INTERP_QUOTE_LIT__@";

/// Replace every `${...}` span (balanced braces, recursively) with sentinel
/// markers wrapping the inner content.
pub fn encode(text: &str) -> String {
    // Neutralize pre-existing sentinel text first so decode can restore it.
    let text = text
        .replace(MARKER_START, ESC_START)
        .replace(MARKER_END, ESC_END)
        .replace(MARKER_QUOTE, ESC_QUOTE);
    encode_spans(&text)
}

fn encode_spans(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = find_balanced_end(bytes, i + 1) {
                let inner = &text[i + 2..end];
                out.push_str(MARKER_START);
                // Nested interpolations are marked as well.
                out.push_str(&encode_spans(inner).replace('"', MARKER_QUOTE));
                out.push_str(MARKER_END);
                i = end + 1;
                continue;
            }
        }
        // Safe: every marker boundary above lands on an ASCII byte.
        let ch_len = utf8_len(bytes[i]);
        out.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Restore `${...}` delimiters and any escaped sentinel text. Exact inverse
/// of [`encode`].
pub fn decode(text: &str) -> String {
    text.replace(MARKER_START, "${")
        .replace(MARKER_END, "}")
        .replace(MARKER_QUOTE, "\"")
        .replace(ESC_START, MARKER_START)
        .replace(ESC_END, MARKER_END)
        .replace(ESC_QUOTE, MARKER_QUOTE)
}

/// True when the text contains at least one marked span.
pub fn contains_marker(text: &str) -> bool {
    text.contains(MARKER_START)
}

/// Escape quotes, backslashes and control characters that sit outside
/// `${...}` spans, leaving span contents untouched. Used when a decoded
/// value is re-quoted for emission.
pub fn escape_outside_spans(text: &str) -> String {
    decode(&crate::shared::utils::escape_string(&encode(text)))
}

/// Inner contents of every top-level marked span, in document order. Quote
/// stand-ins are restored; nested markers inside a span are left intact.
pub fn extract_marked_spans(text: &str) -> Vec<String> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARKER_START) {
        let after = &rest[start + MARKER_START.len()..];
        let Some(end) = find_span_end(after) else {
            break;
        };
        spans.push(after[..end].replace(MARKER_QUOTE, "\""));
        rest = &after[end + MARKER_END.len()..];
    }
    spans
}

/// Byte offset of the MARKER_END matching the span that has just been
/// opened, skipping over nested marker pairs.
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
            i += utf8_len(text.as_bytes()[i]);
        }
    }
    None
}

/// Given the byte offset of an opening `{`, return the offset of its
/// balanced closing `}`, or None when the span never terminates.
fn find_balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_plain() {
        for s in ["", "no interpolation", "a $ b { c } d", "${var.region}"] {
            assert_eq!(decode(&encode(s)), s);
        }
    }

    #[test]
    fn test_round_trip_nested_braces() {
        let s = r#"${merge(var.tags, {Name = "x"})}"#;
        assert_eq!(decode(&encode(s)), s);
    }

    #[test]
    fn test_round_trip_contains_sentinel() {
        let s = format!("literal {} in input ${{var.a}}", MARKER_START);
        assert_eq!(decode(&encode(&s)), s);
    }

    #[test]
    fn test_encode_hides_braces_and_quotes() {
        let encoded = encode(r#"${lookup(var.amis, "us-east-1")}"#);
        assert!(!encoded.contains('{'));
        assert!(!encoded.contains('"'));
        assert!(encoded.starts_with(MARKER_START));
        assert!(encoded.ends_with(MARKER_END));
    }

    #[test]
    fn test_unterminated_span_left_alone() {
        let s = "broken ${var.a";
        assert_eq!(encode(s), s);
        assert_eq!(decode(&encode(s)), s);
    }

    #[test]
    fn test_extract_marked_spans() {
        let encoded = encode(r#"${var.env}-app-${lookup(var.amis, "x")}"#);
        let spans = extract_marked_spans(&encoded);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], "var.env");
        assert_eq!(spans[1], r#"lookup(var.amis, "x")"#);
    }

    #[test]
    fn test_contains_marker() {
        assert!(contains_marker(&encode("${var.a}")));
        assert!(!contains_marker(&encode("plain")));
    }
}
