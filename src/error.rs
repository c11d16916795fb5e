//! Error types for schema construction and document transformation.

use crate::schema::convert::ConvertError;
use crate::schema::path::PathError;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced to callers of the flattening API.
///
/// Document-level aborts are not represented here: a `skip_document_if_empty`
/// column with no matches is an internal control signal that degrades to an
/// empty row list, never an error.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// The schema config was not valid JSON for [`crate::schema::SchemaConfig`].
    #[error("failed to parse schema config")]
    SchemaParse(#[source] serde_json::Error),

    /// A column's path expression failed to compile at schema build time.
    #[error("invalid path expression `{path}` for column `{column}`")]
    Path {
        column: String,
        path: String,
        #[source]
        source: PathError,
    },

    /// A column named a converter the registry does not know.
    #[error("unknown converter `{name}` for column `{column}`")]
    UnknownConverter { column: String, name: String },

    /// A converter rejected a matched value. Carries enough context to fix
    /// the schema: the column, the offending value, and the converter error.
    #[error("conversion failed for column `{column}` on value `{value}`")]
    Conversion {
        column: String,
        value: Value,
        #[source]
        source: ConvertError,
    },
}
