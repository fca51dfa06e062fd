//! Run report - change records, unresolved diagnostics, and usage counts
//!
//! One `RunReport` accumulates across every file in a run; the output layer
//! decides how to render it.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// One applied rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub file: String,
    /// 1-based line in the source file
    pub line: usize,
    pub before: String,
    pub after: String,
    pub reason: String,
}

/// One reference that survived every resolution tier without a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRecord {
    pub file: String,
    pub line: usize,
    /// Display name of the table the reference was resolved against
    pub table: String,
    pub column: String,
    /// The reference text as it appeared in the source
    pub snippet: String,
    /// Display names of other tables that do declare the column
    pub suggestions: Vec<String>,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    files_scanned: usize,
    files_changed: usize,
    references_seen: usize,
    changes: Vec<ChangeRecord>,
    unresolved: Vec<UnresolvedRecord>,
    /// (table key, column key) -> reference count
    #[serde(serialize_with = "serialize_usage")]
    usage: HashMap<(String, String), usize>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saw_reference(&mut self) {
        self.references_seen += 1;
    }

    pub fn record_file(&mut self, changed: bool) {
        self.files_scanned += 1;
        if changed {
            self.files_changed += 1;
        }
    }

    pub fn record_change(&mut self, file: &str, line: usize, before: &str, after: &str, reason: &str) {
        self.changes.push(ChangeRecord {
            file: file.to_string(),
            line,
            before: before.to_string(),
            after: after.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn record_unresolved(&mut self, record: UnresolvedRecord) {
        self.unresolved.push(record);
    }

    pub fn count_usage(&mut self, table_key: &str, column_key: &str) {
        *self
            .usage
            .entry((table_key.to_string(), column_key.to_string()))
            .or_insert(0) += 1;
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn files_changed(&self) -> usize {
        self.files_changed
    }

    pub fn references_seen(&self) -> usize {
        self.references_seen
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    pub fn unresolved(&self) -> &[UnresolvedRecord] {
        &self.unresolved
    }

    /// True when the run produced anything a check mode should fail on.
    pub fn has_findings(&self) -> bool {
        !self.changes.is_empty() || !self.unresolved.is_empty()
    }

    /// Changes grouped by file, files in path order, records in scan order.
    pub fn changes_by_file(&self) -> BTreeMap<&str, Vec<&ChangeRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&ChangeRecord>> = BTreeMap::new();
        for change in &self.changes {
            grouped.entry(&change.file).or_default().push(change);
        }
        grouped
    }

    /// Usage counts sorted by count descending, then table.column ascending.
    pub fn usage_ranked(&self) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .usage
            .iter()
            .map(|((table, column), count)| (format!("{table}.{column}"), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

fn serialize_usage<S>(
    usage: &HashMap<(String, String), usize>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let ordered: BTreeMap<String, usize> = usage
        .iter()
        .map(|((table, column), count)| (format!("{table}.{column}"), *count))
        .collect();
    ordered.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_changes_by_file_groups_in_path_order() {
        let mut report = RunReport::new();
        report.record_change("b.md", 3, "x", "y", "r");
        report.record_change("a.md", 1, "p", "q", "r");
        report.record_change("b.md", 7, "m", "n", "r");

        let grouped = report.changes_by_file();
        let files: Vec<&str> = grouped.keys().copied().collect();
        assert_eq!(files, vec!["a.md", "b.md"]);
        assert_eq!(grouped["b.md"].len(), 2);
    }

    #[test]
    fn test_usage_ranked_order() {
        let mut report = RunReport::new();
        report.count_usage("orders", "total");
        report.count_usage("orders", "total");
        report.count_usage("customers", "customerid");
        report.count_usage("orders", "orderid");

        assert_eq!(
            report.usage_ranked(),
            vec![
                ("orders.total".to_string(), 2),
                ("customers.customerid".to_string(), 1),
                ("orders.orderid".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_has_findings() {
        let mut report = RunReport::new();
        assert!(!report.has_findings());
        report.record_change("a.md", 1, "x", "y", "r");
        assert!(report.has_findings());
    }

    #[test]
    fn test_file_counters() {
        let mut report = RunReport::new();
        report.record_file(false);
        report.record_file(true);
        assert_eq!(report.files_scanned(), 2);
        assert_eq!(report.files_changed(), 1);
    }
}
