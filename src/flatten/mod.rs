//! JSON flattening - turn nested documents into flat rows
//!
//! This module holds the core engine: the recursive evaluator that walks a
//! column schema against a document, the cell model its results live in,
//! the cartesian row expander, and the row materializer.

pub mod cell;
pub mod eval;
pub mod rows;
pub mod transformer;
pub mod writer;

pub use cell::{Cell, EvaluatedColumn, FlattenedCells, NamedCell};
pub use rows::{cartesian_product, materialize_row};
pub use transformer::JsonFlattener;
pub use writer::RowWriter;
