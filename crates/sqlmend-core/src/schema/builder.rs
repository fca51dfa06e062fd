//! Schema builder - constructs a Catalog from DDL text or flat records

use regex::Regex;
use serde::Deserialize;

use crate::error::SchemaError;
use crate::ident;
use crate::schema::Catalog;

/// Constraint-only lines inside a CREATE TABLE body, identified by their
/// leading keyword.
const CONSTRAINT_KEYWORDS: &[&str] = &["CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK"];

/// A flat table/column record, matching the JSON export shape
/// (`[{"TableName": "...", "ColumnName": "..."}, ...]`).
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRecord {
    #[serde(rename = "TableName", alias = "table")]
    pub table: String,
    #[serde(rename = "ColumnName", alias = "column")]
    pub column: String,
}

/// Builder for constructing a [`Catalog`] from schema sources.
///
/// Accepts any mix of DDL text and flat records; [`SchemaBuilder::build`]
/// fails on an empty result so that resolution never runs against nothing.
pub struct SchemaBuilder {
    catalog: Catalog,
    create_table: Regex,
    column_line: Regex,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            create_table: Regex::new(r"(?i)^\s*CREATE\s+TABLE\s+([A-Za-z0-9_\[\]\.]+)\s*\(")
                .expect("static regex"),
            column_line: Regex::new(r"^(\[[^\]]+\]|[A-Za-z0-9_]+)\s+\S").expect("static regex"),
        }
    }

    /// Scan DDL text for `CREATE TABLE <name> ( ... )` blocks.
    ///
    /// Inside a block, one column declaration per line; constraint lines,
    /// blanks, and `--` comments are skipped. The first whitespace-delimited
    /// token of a declaration line is the column name.
    pub fn parse_ddl(&mut self, sql: &str) {
        let lines: Vec<&str> = sql.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let Some(m) = self.create_table.captures(lines[i]) else {
                i += 1;
                continue;
            };
            let table_raw = m.get(1).map(|g| g.as_str()).unwrap_or_default();
            i += 1;

            while i < lines.len() {
                let current = lines[i].trim();
                if current.starts_with(')') {
                    break;
                }
                if current.is_empty() || current.starts_with("--") {
                    i += 1;
                    continue;
                }
                let leading = current
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_uppercase();
                if CONSTRAINT_KEYWORDS.contains(&leading.as_str()) {
                    i += 1;
                    continue;
                }
                if let Some(col) = self.column_line.captures(current) {
                    let col_raw = col.get(1).map(|g| g.as_str()).unwrap_or_default();
                    self.catalog.add_column(table_raw, col_raw.trim());
                }
                i += 1;
            }

            // Skip to the end of the block so a trailing `);` is not
            // mistaken for a new table start.
            while i < lines.len() {
                let current = lines[i].trim();
                if self.create_table.is_match(lines[i]) {
                    break;
                }
                i += 1;
                if current.starts_with(')') {
                    break;
                }
            }
        }
    }

    /// Insert a single flat table/column pair.
    pub fn add_record(&mut self, table: &str, column: &str) {
        self.catalog.add_column(table.trim(), column.trim());
    }

    /// Insert a batch of flat records.
    pub fn load_records(&mut self, records: &[ColumnRecord]) {
        for record in records {
            self.add_record(&record.table, &record.column);
        }
    }

    /// Finish building. `source_name` labels the schema source in the
    /// fatal-empty error.
    pub fn build(self, source_name: &str) -> Result<Catalog, SchemaError> {
        if self.catalog.is_empty() {
            return Err(SchemaError::Empty {
                source_name: source_name.to_string(),
            });
        }
        tracing::debug!(tables = self.catalog.len(), "schema catalog built");
        Ok(self.catalog)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DDL: &str = r#"
-- master schema
CREATE TABLE [dbo].[Customers] (
    CustomerID INT IDENTITY(1,1) NOT NULL,
    CustomerName NVARCHAR(100) NOT NULL,
    [PrimaryEmail] NVARCHAR(255) NULL,
    -- legacy column removed
    CONSTRAINT PK_Customers PRIMARY KEY (CustomerID)
);

CREATE TABLE Orders (
    OrderID INT NOT NULL,
    Total DECIMAL(10, 2) NULL,
    PRIMARY KEY (OrderID)
);
"#;

    #[test]
    fn test_parse_ddl_tables_and_columns() {
        let mut builder = SchemaBuilder::new();
        builder.parse_ddl(DDL);
        let catalog = builder.build("test").unwrap();

        assert_eq!(catalog.len(), 2);
        let customers = catalog.get_table("customers").unwrap();
        assert_eq!(customers.display_name, "Customers");
        let names: Vec<&str> = customers.column_names().collect();
        assert_eq!(names, vec!["CustomerID", "CustomerName", "PrimaryEmail"]);

        let orders = catalog.get_table("orders").unwrap();
        let names: Vec<&str> = orders.column_names().collect();
        assert_eq!(names, vec!["OrderID", "Total"]);
    }

    #[test]
    fn test_constraint_lines_skipped() {
        let mut builder = SchemaBuilder::new();
        builder.parse_ddl(DDL);
        let catalog = builder.build("test").unwrap();

        let customers = catalog.get_table("customers").unwrap();
        assert!(!customers.column_exists("constraint"));
        assert!(!customers.column_exists("pk_customers"));
    }

    #[test]
    fn test_flat_records() {
        let mut builder = SchemaBuilder::new();
        builder.load_records(&[
            ColumnRecord {
                table: "[Customers]".into(),
                column: "[CustomerName]".into(),
            },
            ColumnRecord {
                table: "Customers".into(),
                column: "PrimaryEmail".into(),
            },
        ]);
        let catalog = builder.build("records").unwrap();

        let customers = catalog.get_table("customers").unwrap();
        assert_eq!(customers.canonical_column("customername"), Some("CustomerName"));
        assert_eq!(customers.canonical_column("primaryemail"), Some("PrimaryEmail"));
    }

    #[test]
    fn test_empty_schema_is_fatal() {
        let builder = SchemaBuilder::new();
        assert!(matches!(
            builder.build("empty.sql"),
            Err(SchemaError::Empty { .. })
        ));
    }
}
