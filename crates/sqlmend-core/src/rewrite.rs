//! Rewrite rendering - minimal-diff replacement text for resolved references

use crate::ident;

/// Render a reference with its column token replaced.
///
/// `drop_first` removes a redundant leading qualifier from a 3-part chain
/// (the 3→2 rewrite); everything else joins back with dots, byte-for-byte.
pub fn render_reference(
    tokens: &[&str],
    column_index: usize,
    drop_first: bool,
    new_column: &str,
) -> String {
    let mut rendered: Vec<&str> = tokens.to_vec();
    rendered[column_index] = new_column;
    let kept = if drop_first && rendered.len() > 2 {
        &rendered[1..]
    } else {
        &rendered[..]
    };
    kept.join(".")
}

/// Render a canonical column in the quoting style of the original token.
pub fn render_column(original_token: &str, canonical: &str) -> String {
    ident::format_identifier(original_token, canonical)
}

/// Incremental output builder: copies untouched bytes verbatim and splices
/// in replacements, guaranteeing everything outside matched spans stays
/// byte-identical.
#[derive(Debug, Default)]
pub struct Splicer {
    parts: Vec<String>,
    last_index: usize,
    modified: bool,
}

impl Splicer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `source[start..end]` with `replacement`.
    pub fn replace(&mut self, source: &str, start: usize, end: usize, replacement: &str) {
        self.parts.push(source[self.last_index..start].to_string());
        if replacement != &source[start..end] {
            self.modified = true;
        }
        self.parts.push(replacement.to_string());
        self.last_index = end;
    }

    pub fn modified(&self) -> bool {
        self.modified
    }

    /// Finish, appending the unprocessed tail of `source`.
    pub fn finish(mut self, source: &str) -> String {
        self.parts.push(source[self.last_index..].to_string());
        self.parts.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_drops_redundant_qualifier() {
        assert_eq!(
            render_reference(&["Customers", "c", "Email"], 2, true, "PrimaryEmail"),
            "c.PrimaryEmail"
        );
    }

    #[test]
    fn test_render_keeps_trailing_segment() {
        // Rule-4 shape: column is the middle token, tail is untouched
        assert_eq!(
            render_reference(&["Orders", "total", "foo"], 1, false, "Total"),
            "Orders.Total.foo"
        );
    }

    #[test]
    fn test_splicer_byte_identity() {
        let source = "SELECT o.total FROM Orders o";
        let mut splicer = Splicer::new();
        let start = source.find("o.total").unwrap();
        splicer.replace(source, start, start + "o.total".len(), "o.Total");
        assert!(splicer.modified());
        assert_eq!(splicer.finish(source), "SELECT o.Total FROM Orders o");
    }

    #[test]
    fn test_splicer_unmodified_roundtrip() {
        let source = "SELECT 1";
        let splicer = Splicer::new();
        assert!(!splicer.modified());
        assert_eq!(splicer.finish(source), source);
    }
}
