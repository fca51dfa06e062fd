//! Alias binder - maps aliases and table names to catalog keys
//!
//! Scoped to a single SQL fragment; a binding never survives into the next
//! fragment or file.

use std::collections::HashMap;

use regex::Regex;

use crate::ident;
use crate::schema::Catalog;

/// Alias-or-table-name (lower-cased) -> table key, for one fragment.
#[derive(Debug, Clone, Default)]
pub struct AliasBinding {
    map: HashMap<String, String>,
}

impl AliasBinding {
    /// Resolve a lower-cased alias or table name to a table key.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Distinct table keys bound in this fragment.
    pub fn bound_tables(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.map.values().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    fn bind(&mut self, name: String, table_key: String) {
        self.map.insert(name, table_key);
    }
}

/// Extracts FROM/JOIN clauses and builds the per-fragment binding.
pub struct AliasBinder {
    pattern: Regex,
}

impl AliasBinder {
    pub fn new() -> Self {
        // Captures the table token after FROM or any JOIN variant, plus an
        // optional alias with or without AS. A lone `(` as the table token
        // marks a derived table.
        let pattern = Regex::new(
            r"(?i)\b(?:FROM|(?:INNER|LEFT|RIGHT|FULL|CROSS)(?:\s+OUTER)?\s+JOIN|JOIN)\s+(\(|[A-Za-z0-9_\[\]\.]+)(?:\s+(?:AS\s+)?([A-Za-z_][A-Za-z0-9_\[\]]*))?",
        )
        .expect("static regex");
        Self { pattern }
    }

    /// Build the binding for one SQL fragment.
    ///
    /// Derived tables (token opening with `(`) and tables unknown to the
    /// catalog are skipped, not errors. Each bound table also binds its own
    /// canonical key to itself so unaliased references keep resolving.
    pub fn bind(&self, sql: &str, catalog: &Catalog) -> AliasBinding {
        let mut binding = AliasBinding::default();

        for caps in self.pattern.captures_iter(sql) {
            let table_token = caps.get(1).map(|g| g.as_str()).unwrap_or_default();
            if table_token.starts_with('(') {
                continue; // derived table / subquery
            }

            let table_key = ident::normalize(table_token);
            if !catalog.table_exists(&table_key) {
                tracing::debug!(table = table_token, "skipping unknown table in FROM/JOIN");
                continue;
            }

            binding.bind(table_key.clone(), table_key.clone());

            if let Some(alias_token) = caps.get(2).map(|g| g.as_str()) {
                // The "alias" slot can swallow the next keyword when a bare
                // FROM is followed by WHERE/ON/etc.
                if !ident::is_sql_keyword(alias_token) {
                    binding.bind(ident::normalize(alias_token), table_key);
                }
            }
        }

        binding
    }
}

impl Default for AliasBinder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_column("Customers", "CustomerID");
        catalog.add_column("Orders", "OrderID");
        catalog
    }

    #[test]
    fn test_bind_alias_and_table_key() {
        let binding = AliasBinder::new().bind("SELECT c.CustomerID FROM Customers c", &catalog());
        assert_eq!(binding.resolve("c"), Some("customers"));
        assert_eq!(binding.resolve("customers"), Some("customers"));
    }

    #[test]
    fn test_join_variants() {
        let sql = "SELECT * FROM Customers c LEFT OUTER JOIN Orders AS o ON o.OrderID = c.CustomerID";
        let binding = AliasBinder::new().bind(sql, &catalog());
        assert_eq!(binding.resolve("o"), Some("orders"));
        assert_eq!(binding.resolve("orders"), Some("orders"));
        assert_eq!(binding.resolve("c"), Some("customers"));
    }

    #[test]
    fn test_keyword_never_bound_as_alias() {
        let binding = AliasBinder::new().bind("SELECT * FROM Orders WHERE OrderID = 1", &catalog());
        assert!(!binding.contains("where"));
        assert_eq!(binding.resolve("orders"), Some("orders"));
    }

    #[test]
    fn test_derived_table_skipped() {
        let binding = AliasBinder::new().bind("SELECT * FROM (SELECT 1 AS x) t", &catalog());
        assert!(!binding.contains("t"));
        assert!(binding.bound_tables().is_empty());
    }

    #[test]
    fn test_unknown_table_ignored() {
        let binding = AliasBinder::new().bind("SELECT * FROM Shipments s", &catalog());
        assert!(!binding.contains("s"));
        assert!(!binding.contains("shipments"));
    }

    #[test]
    fn test_schema_qualified_table() {
        let binding = AliasBinder::new().bind("SELECT * FROM dbo.Customers c", &catalog());
        assert_eq!(binding.resolve("c"), Some("customers"));
    }
}
