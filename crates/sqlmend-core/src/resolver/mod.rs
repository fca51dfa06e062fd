//! Reference resolver - classifies dotted chains and fixes one SQL fragment
//!
//! Per fragment, the pipeline is: bind aliases, scan dotted chains, classify
//! each chain against the binding and catalog, resolve the column through the
//! tiered strategy (exact, case-normalized, semantic remap, fuzzy), and
//! splice replacements back in. A second pass handles bare column names when
//! the fragment binds exactly one table.

mod alias;
mod scan;

pub use alias::{AliasBinder, AliasBinding};
pub use scan::{in_comment, RawReference, ReferenceScanner};

use regex::Regex;

use crate::ident;
use crate::remap::{RemapAction, RemapTable};
use crate::report::{RunReport, UnresolvedRecord};
use crate::rewrite::{render_column, render_reference, Splicer};
use crate::schema::{Catalog, TableDef};

/// Default similarity threshold for the fuzzy tier.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Engine knobs, passed in explicitly so the resolver stays pure.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Minimum `strsim::normalized_levenshtein` score for a fuzzy match
    pub fuzzy_threshold: f64,
    /// Semantic remap table
    pub remaps: RemapTable,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            remaps: RemapTable::new(),
        }
    }
}

/// Outcome of resolving one reference; never more than one per reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Already canonical, nothing to change
    Exact,
    /// Case/bracket-insensitive match; carries the canonical column name
    CaseNormalized(String),
    /// Registered semantic remap; carries the full replacement text for the
    /// matched span
    SemanticRemap(String),
    /// Unique similarity match at or above the threshold; carries the
    /// canonical column name
    FuzzyMatch(String),
    /// No declared column, no remap, no qualifying fuzzy candidate
    Unresolved,
}

/// A classified reference: which token is the column, which table owns it,
/// and whether the leading qualifier is redundant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReferenceContext {
    pub column_index: usize,
    pub table_key: String,
    pub drop_first: bool,
}

/// Schema-aware reference resolver and fragment fixer.
pub struct ReferenceResolver<'a> {
    catalog: &'a Catalog,
    options: &'a ResolverOptions,
    binder: AliasBinder,
    scanner: ReferenceScanner,
    bare_word: Regex,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(catalog: &'a Catalog, options: &'a ResolverOptions) -> Self {
        Self {
            catalog,
            options,
            binder: AliasBinder::new(),
            scanner: ReferenceScanner::new(),
            bare_word: Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex"),
        }
    }

    /// Fix one SQL fragment, recording changes and diagnostics into
    /// `report`. `base_line` is the 1-based file line of the fragment's
    /// first line; bytes outside matched reference spans are untouched.
    pub fn fix_fragment(
        &self,
        sql: &str,
        file: &str,
        base_line: usize,
        report: &mut RunReport,
    ) -> String {
        let binding = self.binder.bind(sql, self.catalog);
        let fixed = self.fix_qualified(sql, &binding, file, base_line, report);

        // Bare pass only when the fragment's table context is unambiguous
        let bound = binding.bound_tables();
        if let [only_table] = bound.as_slice() {
            let table_key = only_table.to_string();
            self.fix_bare(&fixed, &binding, &table_key, file, base_line, report)
        } else {
            fixed
        }
    }

    /// Qualified pass: every dotted chain the scanner finds.
    fn fix_qualified(
        &self,
        sql: &str,
        binding: &AliasBinding,
        file: &str,
        base_line: usize,
        report: &mut RunReport,
    ) -> String {
        let mut splicer = Splicer::new();

        for raw in self.scanner.scan(sql) {
            let original = &sql[raw.start..raw.end];

            if in_comment(sql, raw.start) {
                splicer.replace(sql, raw.start, raw.end, original);
                continue;
            }

            let Some(ctx) = self.classify(&raw.tokens, binding) else {
                splicer.replace(sql, raw.start, raw.end, original);
                continue;
            };

            report.saw_reference();
            let line = base_line + sql[..raw.start].matches('\n').count();
            let column_token = raw.tokens[ctx.column_index];
            let qualifier = (ctx.column_index > 0).then(|| raw.tokens[ctx.column_index - 1]);
            let full_span = ctx.column_index == raw.tokens.len() - 1;

            let Some(table) = self.catalog.get_table(&ctx.table_key) else {
                splicer.replace(sql, raw.start, raw.end, original);
                continue;
            };
            let resolution = self.resolve_column(table, column_token, qualifier, &ctx, &raw, full_span);

            let (new_text, reason) = self.apply(table, &ctx, &raw, column_token, &resolution);
            report.count_usage(&ctx.table_key, &usage_key(table, column_token, &resolution));

            if resolution == Resolution::Unresolved {
                report.record_unresolved(UnresolvedRecord {
                    file: file.to_string(),
                    line,
                    table: table.display_name.clone(),
                    column: ident::strip_brackets(column_token).to_string(),
                    snippet: original.to_string(),
                    suggestions: self.catalog.tables_with_column(column_token, &ctx.table_key),
                });
            }

            if new_text != original {
                tracing::debug!(%file, line, before = original, after = %new_text, "rewrote reference");
                report.record_change(file, line, original, &new_text, &reason);
            }
            splicer.replace(sql, raw.start, raw.end, &new_text);
        }

        splicer.finish(sql)
    }

    /// Classify a 2- or 3-token chain against the binding and catalog.
    ///
    /// Returns `None` when the chain is not recognizable as a table-column
    /// reference; such chains are left untouched.
    pub(crate) fn classify(
        &self,
        tokens: &[&str],
        binding: &AliasBinding,
    ) -> Option<ReferenceContext> {
        match tokens.len() {
            2 => {
                let left = ident::normalize(tokens[0]);
                let table_key = binding
                    .resolve(&left)
                    .map(str::to_string)
                    .or_else(|| self.catalog.table_exists(&left).then_some(left))?;
                Some(ReferenceContext {
                    column_index: 1,
                    table_key,
                    drop_first: false,
                })
            }
            3 => {
                let first = ident::normalize(tokens[0]);
                let second = ident::normalize(tokens[1]);

                if let Some(bound) = binding.resolve(&second) {
                    // Redundant `Table.alias.col` qualifier, or an alias
                    // prefixed by something that is not a table at all
                    if bound == first || !self.catalog.table_exists(&first) {
                        return Some(ReferenceContext {
                            column_index: 2,
                            table_key: bound.to_string(),
                            drop_first: true,
                        });
                    }
                }
                if self.catalog.table_exists(&second) {
                    // `schema.Table.col`: drop the schema qualifier
                    return Some(ReferenceContext {
                        column_index: 2,
                        table_key: second,
                        drop_first: true,
                    });
                }
                if self.catalog.table_exists(&first) {
                    // Two-part interpretation wins over misreading an
                    // unrelated dotted expression; the tail stays as-is
                    return Some(ReferenceContext {
                        column_index: 1,
                        table_key: first,
                        drop_first: false,
                    });
                }
                None
            }
            _ => None,
        }
    }

    /// Tiered column resolution; first match wins.
    fn resolve_column(
        &self,
        table: &TableDef,
        column_token: &str,
        qualifier: Option<&str>,
        ctx: &ReferenceContext,
        raw: &RawReference<'_>,
        full_span: bool,
    ) -> Resolution {
        let stripped = ident::strip_brackets(column_token);

        if let Some(canonical) = table.canonical_column(column_token) {
            if canonical == stripped {
                return Resolution::Exact;
            }
            return Resolution::CaseNormalized(canonical.to_string());
        }

        match self.options.remaps.get(&table.key, column_token) {
            Some(RemapAction::Rename(canonical)) => {
                let rendered = render_column(column_token, canonical);
                return Resolution::SemanticRemap(render_reference(
                    &raw.tokens,
                    ctx.column_index,
                    ctx.drop_first,
                    &rendered,
                ));
            }
            Some(RemapAction::Expression(template)) if full_span => {
                return Resolution::SemanticRemap(RemapAction::render_expression(
                    template, qualifier,
                ));
            }
            // An expression cannot replace a chain that keeps a trailing
            // segment; fall through to the similarity tier
            Some(RemapAction::Expression(_)) | None => {}
        }

        self.fuzzy_match(table, stripped)
    }

    /// Similarity tier: accept only a unique candidate at or above the
    /// threshold. Ties and all-below-threshold both mean Unresolved.
    fn fuzzy_match(&self, table: &TableDef, stripped: &str) -> Resolution {
        let needle = stripped.to_lowercase();
        let mut qualifying: Vec<&str> = Vec::new();
        let mut best = 0.0f64;

        for key in table.column_keys() {
            let score = strsim::normalized_levenshtein(&needle, key);
            if score >= self.options.fuzzy_threshold {
                qualifying.push(key);
            }
            if score > best {
                best = score;
            }
        }

        match qualifying.as_slice() {
            [only] => match table.canonical_column(only) {
                Some(canonical) => Resolution::FuzzyMatch(canonical.to_string()),
                None => Resolution::Unresolved,
            },
            [] => {
                tracing::debug!(column = stripped, best_score = best, "no fuzzy candidate cleared threshold");
                Resolution::Unresolved
            }
            _ => {
                tracing::debug!(column = stripped, candidates = qualifying.len(), "ambiguous fuzzy candidates");
                Resolution::Unresolved
            }
        }
    }

    /// Turn a resolution into replacement text plus a human-readable reason.
    fn apply(
        &self,
        table: &TableDef,
        ctx: &ReferenceContext,
        raw: &RawReference<'_>,
        column_token: &str,
        resolution: &Resolution,
    ) -> (String, String) {
        let mut reason_bits: Vec<String> = Vec::new();
        if ctx.drop_first {
            reason_bits.push("removed duplicate qualifier".to_string());
        }

        let new_text = match resolution {
            Resolution::Exact | Resolution::Unresolved => {
                render_reference(&raw.tokens, ctx.column_index, ctx.drop_first, column_token)
            }
            Resolution::CaseNormalized(canonical) => {
                let rendered = render_column(column_token, canonical);
                if rendered != column_token {
                    reason_bits.push(format!("column -> {} ({})", canonical, table.display_name));
                }
                render_reference(&raw.tokens, ctx.column_index, ctx.drop_first, &rendered)
            }
            Resolution::FuzzyMatch(canonical) => {
                reason_bits.push(format!(
                    "column -> {} ({} fuzzy)",
                    canonical, table.display_name
                ));
                let rendered = render_column(column_token, canonical);
                render_reference(&raw.tokens, ctx.column_index, ctx.drop_first, &rendered)
            }
            Resolution::SemanticRemap(replacement) => {
                reason_bits.push(format!(
                    "semantic remap -> {} ({})",
                    replacement, table.display_name
                ));
                replacement.clone()
            }
        };

        (new_text, reason_bits.join(", "))
    }

    /// Bare pass: unqualified column names in a single-table fragment get
    /// case normalization and semantic remaps by literal-name matching.
    fn fix_bare(
        &self,
        sql: &str,
        binding: &AliasBinding,
        table_key: &str,
        file: &str,
        base_line: usize,
        report: &mut RunReport,
    ) -> String {
        let Some(table) = self.catalog.get_table(table_key) else {
            return sql.to_string();
        };
        let bytes = sql.as_bytes();
        let mut splicer = Splicer::new();

        for m in self.bare_word.find_iter(sql) {
            if !bare_boundaries(bytes, m.start(), m.end()) {
                continue;
            }
            let token = m.as_str();
            if ident::is_sql_keyword(token) {
                continue;
            }
            let lower = token.to_lowercase();
            // Table names and aliases are qualifiers, not columns
            if binding.contains(&lower) {
                continue;
            }
            if in_comment(sql, m.start()) {
                continue;
            }

            // Declared columns only get their casing fixed; remaps apply to
            // names the table does not declare
            let replacement = if let Some(canonical) = table.canonical_column(token) {
                (canonical != token).then(|| canonical.to_string())
            } else {
                match self.options.remaps.get(table_key, token) {
                    Some(RemapAction::Rename(canonical)) => Some(canonical.clone()),
                    Some(RemapAction::Expression(template)) => {
                        Some(RemapAction::render_expression(template, None))
                    }
                    None => None,
                }
            };

            if let Some(new_text) = replacement {
                let line = base_line + sql[..m.start()].matches('\n').count();
                let reason = format!("bare column -> {} ({})", new_text, table.display_name);
                report.record_change(file, line, token, &new_text, &reason);
                report.count_usage(table_key, &lower);
                splicer.replace(sql, m.start(), m.end(), &new_text);
            }
        }

        splicer.finish(sql)
    }
}

/// Lower-cased usage key for the frequency table.
fn usage_key(table: &TableDef, column_token: &str, resolution: &Resolution) -> String {
    match resolution {
        Resolution::CaseNormalized(c) | Resolution::FuzzyMatch(c) => c.to_lowercase(),
        Resolution::Exact => table
            .canonical_column(column_token)
            .unwrap_or(column_token)
            .to_lowercase(),
        _ => ident::strip_brackets(column_token).to_lowercase(),
    }
}

/// A bare identifier must not touch a dot or bracket on either side and
/// must not be a function call.
fn bare_boundaries(bytes: &[u8], start: usize, end: usize) -> bool {
    if start > 0 {
        let prev = bytes[start - 1];
        if prev == b'.' || prev == b'[' || prev == b']' || prev.is_ascii_alphanumeric() || prev == b'_'
        {
            return false;
        }
    }
    if end < bytes.len() {
        let next = bytes[end];
        if next == b'.' || next == b'(' {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for col in ["CustomerID", "CustomerName", "PrimaryEmail", "ContactFirstName", "ContactLastName"] {
            catalog.add_column("Customers", col);
        }
        for col in ["OrderID", "CustomerID", "Total", "OrderDate"] {
            catalog.add_column("Orders", col);
        }
        catalog
    }

    fn options() -> ResolverOptions {
        ResolverOptions {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            remaps: RemapTable::customers_legacy(),
        }
    }

    fn fix(sql: &str) -> (String, RunReport) {
        let catalog = catalog();
        let options = options();
        let resolver = ReferenceResolver::new(&catalog, &options);
        let mut report = RunReport::new();
        let fixed = resolver.fix_fragment(sql, "test.md", 1, &mut report);
        (fixed, report)
    }

    #[test]
    fn test_exact_reference_unchanged() {
        let sql = "SELECT o.Total FROM Orders o";
        let (fixed, report) = fix(sql);
        assert_eq!(fixed, sql);
        assert_eq!(report.changes().len(), 0);
        assert_eq!(report.references_seen(), 1);
    }

    #[test]
    fn test_case_normalization() {
        let (fixed, report) = fix("SELECT o.Total FROM Orders o WHERE o.total = 5");
        assert_eq!(fixed, "SELECT o.Total FROM Orders o WHERE o.Total = 5");
        assert_eq!(report.changes().len(), 1);
        assert!(report.changes()[0].reason.contains("Total"));
    }

    #[test]
    fn test_semantic_remap_rename() {
        let (fixed, report) = fix("SELECT c.Email FROM Customers c");
        assert_eq!(fixed, "SELECT c.PrimaryEmail FROM Customers c");
        assert_eq!(report.changes().len(), 1);
        assert!(report.changes()[0].reason.contains("semantic remap"));
    }

    #[test]
    fn test_semantic_remap_expression() {
        let (fixed, _) = fix("SELECT c.ContactName FROM Customers c");
        assert_eq!(
            fixed,
            "SELECT CONCAT(c.ContactFirstName, ' ', c.ContactLastName) FROM Customers c"
        );
    }

    #[test]
    fn test_redundant_qualifier_dropped() {
        let (fixed, report) = fix("SELECT Customers.c.PrimaryEmail FROM Customers c");
        assert_eq!(fixed, "SELECT c.PrimaryEmail FROM Customers c");
        assert_eq!(report.changes()[0].reason, "removed duplicate qualifier");
    }

    #[test]
    fn test_schema_qualifier_dropped() {
        let (fixed, _) = fix("SELECT dbo.Orders.Total FROM Orders");
        assert_eq!(fixed, "SELECT Orders.Total FROM Orders");
    }

    #[test]
    fn test_three_part_rename_keeps_trailing_segment() {
        // Only the first token names a table: the middle token is the
        // column and the tail survives untouched
        let (fixed, report) = fix("SELECT Customers.email.value FROM Customers c");
        assert_eq!(fixed, "SELECT Customers.PrimaryEmail.value FROM Customers c");
        assert_eq!(report.unresolved().len(), 0);
    }

    #[test]
    fn test_three_part_expression_remap_skipped() {
        // An expression cannot replace a span that keeps a trailing
        // segment; the reference is left alone and reported
        let sql = "SELECT Customers.contactname.foo FROM Customers c";
        let (fixed, report) = fix(sql);
        assert_eq!(fixed, sql);
        assert_eq!(report.unresolved().len(), 1);
        assert_eq!(report.unresolved()[0].column, "contactname");
    }

    #[test]
    fn test_fuzzy_match() {
        // "OrderDat" vs "orderdate": distance 1 over 9 chars -> ~0.89
        let (fixed, report) = fix("SELECT o.OrderDat FROM Orders o");
        assert_eq!(fixed, "SELECT o.OrderDate FROM Orders o");
        assert!(report.changes()[0].reason.contains("fuzzy"));
    }

    #[test]
    fn test_fuzzy_below_threshold_unresolved() {
        let (fixed, report) = fix("SELECT o.Shipment FROM Orders o");
        assert_eq!(fixed, "SELECT o.Shipment FROM Orders o");
        assert_eq!(report.unresolved().len(), 1);
        assert_eq!(report.unresolved()[0].table, "Orders");
        assert_eq!(report.unresolved()[0].column, "Shipment");
    }

    #[test]
    fn test_unresolved_suggests_other_tables() {
        let (_, report) = fix("SELECT o.CustomerName FROM Orders o");
        assert_eq!(report.unresolved()[0].suggestions, vec!["Customers"]);
    }

    #[test]
    fn test_comment_immunity() {
        let sql = "SELECT o.Total FROM Orders o -- was o.total\n/* o.total */ WHERE o.OrderID = 1";
        let (fixed, _) = fix(sql);
        assert_eq!(fixed, sql);
    }

    #[test]
    fn test_unknown_qualifier_untouched() {
        let sql = "SELECT x.anything FROM Orders o";
        let (fixed, report) = fix(sql);
        assert_eq!(fixed, sql);
        assert_eq!(report.references_seen(), 0);
    }

    #[test]
    fn test_bare_remap_single_table() {
        let (fixed, _) = fix("SELECT ContactName FROM Customers");
        assert_eq!(
            fixed,
            "SELECT CONCAT(ContactFirstName, ' ', ContactLastName) FROM Customers"
        );
    }

    #[test]
    fn test_bare_case_normalization() {
        let (fixed, _) = fix("SELECT total FROM Orders");
        assert_eq!(fixed, "SELECT Total FROM Orders");
    }

    #[test]
    fn test_bare_pass_skipped_with_two_tables() {
        let sql = "SELECT total FROM Orders o JOIN Customers c ON c.CustomerID = o.CustomerID";
        let (fixed, _) = fix(sql);
        // Two tables bound: bare identifiers are ambiguous and left alone
        assert!(fixed.starts_with("SELECT total"));
    }

    #[test]
    fn test_idempotence() {
        let sql = "SELECT c.Email, Customers.c.contactname FROM Customers c WHERE c.customerid > 3";
        let (once, _) = fix(sql);
        let (twice, report) = fix(&once);
        assert_eq!(once, twice);
        assert_eq!(report.changes().len(), 0);
    }

    #[test]
    fn test_fuzzy_threshold_boundary() {
        let catalog = catalog();
        // "Totaly" vs "total": levenshtein 1, max len 6 -> 1 - 1/6 = 0.833
        let mut low = ResolverOptions::default();
        low.fuzzy_threshold = 0.83;
        let resolver = ReferenceResolver::new(&catalog, &low);
        let mut report = RunReport::new();
        let fixed = resolver.fix_fragment("SELECT o.Totaly FROM Orders o", "t.md", 1, &mut report);
        assert_eq!(fixed, "SELECT o.Total FROM Orders o");

        let mut high = ResolverOptions::default();
        high.fuzzy_threshold = 0.84;
        let resolver = ReferenceResolver::new(&catalog, &high);
        let mut report = RunReport::new();
        let fixed = resolver.fix_fragment("SELECT o.Totaly FROM Orders o", "t.md", 1, &mut report);
        assert_eq!(fixed, "SELECT o.Totaly FROM Orders o");
        assert_eq!(report.unresolved().len(), 1);
    }
}
