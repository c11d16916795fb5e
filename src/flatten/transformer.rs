//! The document-level driver.

use crate::error::FlattenError;
use crate::flatten::cell::{EvaluatedColumn, NamedCell};
use crate::flatten::eval::{Evaluator, Interrupt};
use crate::flatten::rows::{cartesian_product, materialize_row};
use crate::schema::Schema;
use serde_json::Value;
use tracing::debug;

/// Flattens JSON documents into flat row objects according to a compiled
/// schema. The flattener holds no per-document state, so one instance can
/// serve any number of documents, from any number of threads.
pub struct JsonFlattener {
    schema: Schema,
}

impl JsonFlattener {
    pub fn new(schema: Schema) -> JsonFlattener {
        JsonFlattener { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Transform one document into its ordered list of flat row objects.
    ///
    /// A `skip_document_if_empty` column with no matches yields an empty
    /// list, discarding every column already computed for this document.
    /// Conversion failures surface as errors; batch callers should catch
    /// them per document.
    pub fn transform(&self, document: &Value) -> Result<Vec<Value>, FlattenError> {
        let evaluator = Evaluator::new(&self.schema);

        let mut columns: Vec<EvaluatedColumn> = Vec::with_capacity(self.schema.columns.len());
        for column in &self.schema.columns {
            match evaluator.eval(Some(document), column, column.name.clone()) {
                Ok(evaluated) => columns.push(evaluated),
                Err(Interrupt::DocumentSkipped) => {
                    debug!("document skipped, a required-anywhere column had no matches");
                    return Ok(Vec::new());
                }
                Err(Interrupt::Error(error)) => return Err(error),
            }
        }

        let axes: Vec<Vec<NamedCell>> = columns
            .into_iter()
            .map(EvaluatedColumn::into_named_cells)
            .collect();
        let candidates = cartesian_product(axes);

        let rows: Vec<Value> = candidates
            .iter()
            // A row in which every cell is empty would materialize as a
            // vacuous object.
            .filter(|row| !row.iter().all(|named| named.cell.is_empty()))
            .filter_map(|row| materialize_row(row))
            .map(Value::Object)
            .collect();

        debug!(rows = rows.len(), "document flattened");
        Ok(rows)
    }
}
