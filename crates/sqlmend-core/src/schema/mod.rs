//! Schema management module

mod builder;
mod catalog;

pub use builder::{ColumnRecord, SchemaBuilder};
pub use catalog::{Catalog, TableDef};
