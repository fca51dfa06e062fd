//! Schema catalog - normalized table and column definitions

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::Serialize;

use crate::ident;

/// Table definition with case-insensitive column lookup.
///
/// `columns` maps the lower-cased column name to its canonical casing; the
/// IndexMap doubles as the declaration-order sequence used by summaries.
#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
    /// Lower-cased, bracket/schema-stripped identifier
    pub key: String,
    /// Original casing as declared in the schema source
    pub display_name: String,
    columns: IndexMap<String, String>,
}

impl TableDef {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            columns: IndexMap::new(),
        }
    }

    /// Insert a column, keeping declaration order. For duplicate keys the
    /// last-seen casing wins but the original position is kept.
    pub fn insert_column(&mut self, canonical: impl Into<String>) {
        let canonical = canonical.into();
        self.columns.insert(canonical.to_lowercase(), canonical);
    }

    /// Canonical casing for a column, looked up by any casing/quoting.
    pub fn canonical_column(&self, name: &str) -> Option<&str> {
        self.columns.get(&ident::normalize(name)).map(|s| s.as_str())
    }

    /// Whether a column exists (case- and bracket-insensitive).
    pub fn column_exists(&self, name: &str) -> bool {
        self.canonical_column(name).is_some()
    }

    /// Canonical column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.values().map(|s| s.as_str())
    }

    /// Lower-cased column keys in declaration order.
    pub(crate) fn column_keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Schema catalog - holds every table plus a reverse column index.
///
/// Built once per run by [`super::SchemaBuilder`] and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    tables: IndexMap<String, TableDef>,
    /// Lower-cased column name -> table keys declaring it. Used to suggest
    /// alternate tables for unresolved references. BTreeSet keeps the
    /// suggestion order deterministic.
    column_index: HashMap<String, BTreeSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column into a table, creating the table on first sight.
    ///
    /// `table_raw` and `column_raw` may carry brackets or a schema
    /// qualifier; keys are normalized, display casing is preserved.
    pub fn add_column(&mut self, table_raw: &str, column_raw: &str) {
        let table_key = ident::normalize(table_raw);
        if table_key.is_empty() {
            return;
        }
        let trimmed = table_raw.trim();
        let display = ident::strip_brackets(trimmed.rsplit('.').next().unwrap_or(trimmed)).to_string();
        let table = self
            .tables
            .entry(table_key.clone())
            .or_insert_with(|| TableDef::new(table_key.clone(), display));

        let canonical = ident::strip_brackets(column_raw);
        if canonical.is_empty() {
            return;
        }
        table.insert_column(canonical);
        self.column_index
            .entry(canonical.to_lowercase())
            .or_default()
            .insert(table_key);
    }

    /// Look up a table by normalized key.
    pub fn get_table(&self, key: &str) -> Option<&TableDef> {
        self.tables.get(key)
    }

    /// Whether a table key is known.
    pub fn table_exists(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    /// Display name for a table key, falling back to the key itself.
    pub fn display_table<'a>(&'a self, key: &'a str) -> &'a str {
        self.tables
            .get(key)
            .map(|t| t.display_name.as_str())
            .unwrap_or(key)
    }

    /// Display names of the tables declaring a column with this name,
    /// excluding `except_key`. Used as "found elsewhere" suggestions.
    pub fn tables_with_column(&self, column: &str, except_key: &str) -> Vec<String> {
        let Some(keys) = self.column_index.get(&ident::normalize(column)) else {
            return Vec::new();
        };
        keys.iter()
            .filter(|k| k.as_str() != except_key)
            .map(|k| self.display_table(k).to_string())
            .collect()
    }

    /// Iterate tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
