//! sqlmend-core: schema-aware SQL reference repair library
//!
//! This library resolves and corrects dotted `table.column` (and
//! `alias.column`) references embedded in SQL fragments against an
//! authoritative schema catalog, and reports what it changed or could not
//! resolve. No database connection and no SQL AST are involved: the engine
//! works on raw text with minimal, byte-preserving rewrites.

pub mod document;
pub mod error;
pub mod ident;
pub mod remap;
pub mod report;
pub mod resolver;
pub mod rewrite;
pub mod schema;

pub use document::DocumentRewriter;
pub use error::SchemaError;
pub use remap::{RemapAction, RemapTable};
pub use report::{ChangeRecord, RunReport, UnresolvedRecord};
pub use resolver::{ReferenceResolver, Resolution, ResolverOptions};
pub use schema::{Catalog, ColumnRecord, SchemaBuilder, TableDef};
