//! Semantic remap table
//!
//! Some documents reference columns by a prior schema generation's naming,
//! including names whose data has since been split across two physical
//! columns. The remap table carries those correspondences as explicit
//! configuration: a tagged action per `(table, column)` pair, either a
//! plain rename or a textual expression template reconstructing the value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ident;

/// Placeholder in expression templates, expanded to `"<qualifier>."` for
/// qualified references and to `""` for bare ones.
pub const QUALIFIER_PLACEHOLDER: &str = "{q}";

/// What to do with a legacy column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemapAction {
    /// The column was renamed; render like any other identifier rewrite.
    Rename(String),
    /// The value must be reconstructed; replaces the whole reference.
    /// Template uses `{q}` for the qualifier prefix.
    Expression(String),
}

impl RemapAction {
    /// Fill the qualifier placeholder of an expression template.
    /// `qualifier` is the alias/table token as written, without the dot.
    pub fn render_expression(template: &str, qualifier: Option<&str>) -> String {
        let prefix = match qualifier {
            Some(q) => format!("{}.", q),
            None => String::new(),
        };
        template.replace(QUALIFIER_PLACEHOLDER, &prefix)
    }
}

/// Per-table, per-column semantic remaps, keyed by normalized names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemapTable {
    tables: HashMap<String, HashMap<String, RemapAction>>,
}

impl<'de> Deserialize<'de> for RemapTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Normalize table/column keys on the way in so config files may use
        // any casing or bracket style.
        let raw: HashMap<String, HashMap<String, RemapAction>> =
            HashMap::deserialize(deserializer)?;
        let mut table = RemapTable::new();
        for (table_name, columns) in raw {
            for (column, action) in columns {
                table.insert(&table_name, &column, action);
            }
        }
        Ok(table)
    }
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a remap. Table and column are normalized on insert.
    pub fn insert(&mut self, table: &str, column: &str, action: RemapAction) {
        self.tables
            .entry(ident::normalize(table))
            .or_default()
            .insert(ident::normalize(column), action);
    }

    /// Look up the action for a `(table_key, column)` pair.
    pub fn get(&self, table_key: &str, column: &str) -> Option<&RemapAction> {
        self.tables
            .get(table_key)
            .and_then(|cols| cols.get(&ident::normalize(column)))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|cols| cols.is_empty())
    }

    /// Merge another table into this one; entries in `other` win.
    pub fn merge(&mut self, other: RemapTable) {
        for (table, cols) in other.tables {
            self.tables.entry(table).or_default().extend(cols);
        }
    }

    /// The legacy Customers mapping from the generation-one schema. Kept as
    /// a ready-made table for documents written against the old naming.
    pub fn customers_legacy() -> Self {
        let mut table = Self::new();
        let renames = [
            ("companyname", "CustomerName"),
            ("email", "PrimaryEmail"),
            ("emailaddress", "PrimaryEmail"),
            ("phone", "PrimaryPhone"),
            ("phonenumber", "PrimaryPhone"),
            ("country", "CountryID"),
            ("address", "StreetAddress"),
        ];
        for (old, new) in renames {
            table.insert("customers", old, RemapAction::Rename(new.to_string()));
        }
        // ContactName was split into first/last name columns
        table.insert(
            "customers",
            "contactname",
            RemapAction::Expression("CONCAT({q}ContactFirstName, ' ', {q}ContactLastName)".to_string()),
        );
        table
    }
}
