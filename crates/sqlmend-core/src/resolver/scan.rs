//! Reference scanning - dotted identifier chains and the comment heuristic

use regex::Regex;

/// A dotted identifier chain found in raw text: 2 or 3 tokens plus its
/// byte span within the fragment.
#[derive(Debug, Clone)]
pub struct RawReference<'a> {
    pub tokens: Vec<&'a str>,
    pub start: usize,
    pub end: usize,
}

/// Scanner for dotted references.
pub struct ReferenceScanner {
    pattern: Regex,
}

impl ReferenceScanner {
    pub fn new() -> Self {
        // Each segment is a bare identifier or a bracket-delimited one; the
        // third segment is optional (schema-qualified form). The regex crate
        // has no lookbehind, so the "not mid-token and not a longer chain"
        // guard is a manual check on the preceding byte.
        let pattern = Regex::new(
            r"([A-Za-z_][A-Za-z0-9_]*|\[[^\]]+\])\.([A-Za-z_][A-Za-z0-9_]*|\[[^\]]+\])(?:\.([A-Za-z_][A-Za-z0-9_]*|\[[^\]]+\]))?",
        )
        .expect("static regex");
        Self { pattern }
    }

    /// All well-formed dotted chains in `sql`, in document order.
    pub fn scan<'a>(&self, sql: &'a str) -> Vec<RawReference<'a>> {
        let bytes = sql.as_bytes();
        let mut references = Vec::new();

        for caps in self.pattern.captures_iter(sql) {
            let whole = caps.get(0).expect("group 0 always present");
            if !boundary_before(bytes, whole.start()) {
                continue;
            }

            let mut tokens = vec![
                caps.get(1).map(|g| g.as_str()).unwrap_or_default(),
                caps.get(2).map(|g| g.as_str()).unwrap_or_default(),
            ];
            if let Some(third) = caps.get(3) {
                tokens.push(third.as_str());
            }

            references.push(RawReference {
                tokens,
                start: whole.start(),
                end: whole.end(),
            });
        }

        references
    }
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the match start is not preceded by a word character, a dot,
/// or a closing bracket (which would make it the tail of a longer chain).
fn boundary_before(bytes: &[u8], start: usize) -> bool {
    if start == 0 {
        return true;
    }
    let prev = bytes[start - 1];
    !(prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'.' || prev == b']')
}

/// Whether a reference starting at `offset` falls inside a comment.
///
/// Line/offset heuristic, not a tokenizer: an inline `--` earlier on the
/// same line, or an unmatched `/*` anywhere before the offset, counts as a
/// comment. String literals are not tracked (known limitation).
pub fn in_comment(sql: &str, offset: usize) -> bool {
    let line_start = sql[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if sql[line_start..offset].contains("--") {
        return true;
    }

    let before = &sql[..offset];
    match (before.rfind("/*"), before.rfind("*/")) {
        (Some(open), Some(close)) => close < open,
        (Some(_), None) => true,
        _ => false,
    }
}
