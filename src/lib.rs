//! # Flatiron - schema-driven JSON flattening
//!
//! A library for flattening arbitrarily nested JSON documents into lists of
//! flat JSON objects ("rows"), driven by a declarative column schema that
//! describes which paths to extract, how multi-valued matches group, and how
//! nested arrays combine into output rows.
//!
//! ## Modules
//!
//! - **flatten**: the core engine (evaluator, row expander, materializer)
//! - **schema**: the declarative column model, path expressions, converters
//!
//! ## Quick Start
//!
//! ```rust
//! use flatiron::{JsonFlattener, Schema};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = Schema::from_json_str(r#"{
//!     "columns": [
//!         {"name": "a", "columns": [{"name": "b", "path": "b[*]"}]},
//!         {"name": "c"}
//!     ]
//! }"#)?;
//!
//! let flattener = JsonFlattener::new(schema);
//! let rows = flattener.transform(&json!({"a": {"b": [1, 2]}, "c": 3}))?;
//!
//! assert_eq!(rows, vec![
//!     json!({"a_b": 1, "c": 3}),
//!     json!({"a_b": 2, "c": 3}),
//! ]);
//! # Ok(())
//! # }
//! ```
//!
//! Multi-valued matches group per column: `no_group` fans out into separate
//! rows (above), `array` collapses into one JSON array cell, `concat` joins
//! as text, and `columns` spreads into index-suffixed sibling fields.
//! Documents transform independently against an immutable schema, so one
//! [`JsonFlattener`] can serve many threads.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

pub mod error;
pub mod flatten;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::FlattenError;
pub use flatten::{JsonFlattener, RowWriter};
pub use schema::{Column, ColumnConfig, GroupPolicy, Schema, SchemaConfig};

/// Main entry point for streams: flatten each NDJSON document from a reader
/// into rows written through `writer`.
pub fn flatten_ndjson<R: BufRead, W: Write>(
    reader: R,
    writer: &mut RowWriter<W>,
    flattener: &JsonFlattener,
) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let document: Value = serde_json::from_str(&line).context("Failed to parse JSON")?;

        let rows = flattener.transform(&document)?;
        writer.write_rows(&rows)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_flattening() {
        let schema = Schema::from_json_str(
            r#"{
                "columns": [
                    {"name": "name"},
                    {"name": "posts", "path": "posts[*]", "columns": [{"name": "title"}]}
                ]
            }"#,
        )
        .unwrap();

        let flattener = JsonFlattener::new(schema);
        let rows = flattener
            .transform(&json!({
                "name": "Alice",
                "posts": [
                    {"title": "First Post"},
                    {"title": "Second Post"}
                ]
            }))
            .unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_flatten_ndjson_stream() {
        let schema = Schema::from_json_str(r#"{"columns": [{"name": "id"}]}"#).unwrap();
        let flattener = JsonFlattener::new(schema);

        let input = "{\"id\": 1}\n\n{\"id\": 2}\n";
        let mut writer = RowWriter::new(Vec::new());
        flatten_ndjson(input.as_bytes(), &mut writer, &flattener).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 2);
    }
}
