//! Markdown document rewriting - fenced SQL blocks in, fixed blocks out
//!
//! Only the bodies of fenced code blocks carrying a SQL language tag (or no
//! tag) are handed to the resolver; all prose and non-SQL blocks pass
//! through byte-identical.

use regex::Regex;

use crate::remap::RemapTable;
use crate::report::RunReport;
use crate::resolver::{ReferenceResolver, ResolverOptions};
use crate::rewrite::Splicer;
use crate::schema::Catalog;

/// Language tags treated as SQL. The empty tag is included: untagged blocks
/// in these documents are overwhelmingly SQL, and non-SQL text rarely
/// contains resolvable references anyway.
const SQL_LANGUAGE_TAGS: &[&str] = &["", "sql", "tsql"];

/// Rewrites the SQL fragments inside one markdown document at a time.
pub struct DocumentRewriter<'a> {
    catalog: &'a Catalog,
    options: ResolverOptions,
    fence: Regex,
}

impl<'a> DocumentRewriter<'a> {
    pub fn new(catalog: &'a Catalog, fuzzy_threshold: f64, remaps: RemapTable) -> Self {
        let options = ResolverOptions {
            fuzzy_threshold,
            remaps,
        };
        // A fenced block: opening fence with an optional info string, a
        // body (non-greedy, may span lines), and a closing fence.
        let fence =
            Regex::new(r"```([^\n]*)\n((?s:.*?))```").expect("static regex");
        Self {
            catalog,
            options,
            fence,
        }
    }

    /// Rewrite every SQL block in `content`, recording into `report`.
    ///
    /// Returns the rewritten document and whether anything changed.
    /// Everything outside rewritten reference spans is byte-identical to
    /// the input.
    pub fn rewrite(&self, content: &str, file: &str, report: &mut RunReport) -> (String, bool) {
        let resolver = ReferenceResolver::new(self.catalog, &self.options);
        let mut splicer = Splicer::new();

        for caps in self.fence.captures_iter(content) {
            let tag = caps.get(1).map(|g| g.as_str().trim()).unwrap_or("");
            let body = match caps.get(2) {
                Some(body) => body,
                None => continue,
            };
            if !SQL_LANGUAGE_TAGS.contains(&tag.to_lowercase().as_str()) {
                continue;
            }

            // First body line sits one line below the opening fence
            let base_line = content[..body.start()].matches('\n').count() + 1;
            let fixed = resolver.fix_fragment(body.as_str(), file, base_line, report);
            splicer.replace(content, body.start(), body.end(), &fixed);
        }

        let changed = splicer.modified();
        (splicer.finish(content), changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_column("Orders", "OrderID");
        catalog.add_column("Orders", "Total");
        catalog.add_column("Customers", "CustomerID");
        catalog.add_column("Customers", "PrimaryEmail");
        catalog
    }

    fn rewriter(catalog: &Catalog) -> DocumentRewriter<'_> {
        DocumentRewriter::new(catalog, 0.8, RemapTable::customers_legacy())
    }

    #[test]
    fn test_prose_untouched() {
        let catalog = catalog();
        let doc = "The o.total column is described here, outside any fence.\n";
        let mut report = RunReport::new();
        let (out, changed) = rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        assert_eq!(out, doc);
        assert!(!changed);
    }

    #[test]
    fn test_sql_block_rewritten() {
        let catalog = catalog();
        let doc = "# Report\n\n```sql\nSELECT o.total FROM Orders o\n```\n";
        let mut report = RunReport::new();
        let (out, changed) = rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        assert_eq!(out, "# Report\n\n```sql\nSELECT o.Total FROM Orders o\n```\n");
        assert!(changed);
        assert_eq!(report.changes()[0].line, 4);
    }

    #[test]
    fn test_non_sql_block_skipped() {
        let catalog = catalog();
        let doc = "```python\nprint(o.total)\n```\n";
        let mut report = RunReport::new();
        let (out, changed) = rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        assert_eq!(out, doc);
        assert!(!changed);
    }

    #[test]
    fn test_untagged_block_treated_as_sql() {
        let catalog = catalog();
        let doc = "```\nSELECT c.Email FROM Customers c\n```\n";
        let mut report = RunReport::new();
        let (out, _) = rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        assert_eq!(out, "```\nSELECT c.PrimaryEmail FROM Customers c\n```\n");
    }

    #[test]
    fn test_multiple_blocks_independent_bindings() {
        let catalog = catalog();
        let doc = "```sql\nSELECT o.total FROM Orders o\n```\ntext\n```sql\nSELECT o.anything\n```\n";
        let mut report = RunReport::new();
        let (out, _) = rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        // Second block has no FROM clause, so `o` is unbound there
        assert!(out.contains("SELECT o.Total FROM Orders o"));
        assert!(out.contains("SELECT o.anything"));
    }

    #[test]
    fn test_line_numbers_count_from_file_start() {
        let catalog = catalog();
        let doc = "line1\nline2\n```sql\nSELECT 1;\nSELECT o.total FROM Orders o\n```\n";
        let mut report = RunReport::new();
        rewriter(&catalog).rewrite(doc, "doc.md", &mut report);
        assert_eq!(report.changes()[0].line, 5);
    }
}
