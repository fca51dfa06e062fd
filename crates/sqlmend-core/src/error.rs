//! Error types

use thiserror::Error;

/// Errors raised while building the schema catalog.
///
/// An unusable schema is fatal: the engine must never run resolution
/// against an empty catalog, because every reference would silently pass
/// through as "not recognized".
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema source yielded no tables at all
    #[error("schema source '{source_name}' produced an empty catalog")]
    Empty { source_name: String },
}
