//! The recursive schema evaluator.
//!
//! One evaluation walks one schema column against one input node and
//! produces the column's alternative cells. Branch columns recurse into
//! their sub-columns per matched element; leaf columns convert and group
//! their matched values directly.

use crate::error::FlattenError;
use crate::flatten::cell::{Cell, EvaluatedColumn, NamedCell};
use crate::flatten::rows::composite_cells;
use crate::schema::convert::value_text;
use crate::schema::{Column, GroupPolicy, Schema};
use serde_json::Value;
use tracing::trace;

/// Non-local exits threaded back through the recursion. `DocumentSkipped`
/// is a control signal, not an error: it unwinds every enclosing call and
/// is caught only by the document driver, which yields zero rows.
#[derive(Debug)]
pub(crate) enum Interrupt {
    DocumentSkipped,
    Error(FlattenError),
}

impl From<FlattenError> for Interrupt {
    fn from(error: FlattenError) -> Interrupt {
        Interrupt::Error(error)
    }
}

pub(crate) struct Evaluator<'s> {
    schema: &'s Schema,
}

impl<'s> Evaluator<'s> {
    pub(crate) fn new(schema: &'s Schema) -> Evaluator<'s> {
        Evaluator { schema }
    }

    /// Evaluate `column` against `node` (`None` when recursing into a
    /// missing branch). `name` is the column's fully composed output name.
    pub(crate) fn eval(
        &self,
        node: Option<&Value>,
        column: &Column,
        name: String,
    ) -> Result<EvaluatedColumn, Interrupt> {
        let matches: Vec<&Value> = match node {
            Some(node) => column.select(node),
            None => Vec::new(),
        };

        if matches.is_empty() {
            return self.eval_unmatched(column, name);
        }

        if column.is_leaf() {
            let cells = self.process_leaves(&matches, column, &name)?;
            return Ok(EvaluatedColumn::new(name, cells));
        }

        self.eval_branch(&matches, column, name)
    }

    /// No matches: abort the document, emit an explicit absence, or recurse
    /// into every sub-column with a missing node so each decides for itself.
    fn eval_unmatched(
        &self,
        column: &Column,
        name: String,
    ) -> Result<EvaluatedColumn, Interrupt> {
        if column.skip_document_if_empty {
            trace!(column = %name, "required-anywhere column matched nothing, skipping document");
            return Err(Interrupt::DocumentSkipped);
        }
        if column.is_leaf() {
            return Ok(EvaluatedColumn::new(
                name,
                vec![Cell::absent(column.required_value)],
            ));
        }
        let delimiter = self.schema.delimiter_for(column);
        let mut sub_results = Vec::with_capacity(column.columns.len());
        for sub in &column.columns {
            let child_name = format!("{name}{delimiter}{}", sub.name);
            sub_results.push(self.eval(None, sub, child_name)?);
        }
        Ok(EvaluatedColumn::new(name, composite_cells(sub_results)))
    }

    /// Matched branch column: recurse into sub-columns per element. Under
    /// `COLUMNS` every element feeds one shared accumulator flattened once
    /// at the end; under any other policy each element gets its own
    /// accumulator and fans out as an independent composite.
    fn eval_branch(
        &self,
        matches: &[&Value],
        column: &Column,
        name: String,
    ) -> Result<EvaluatedColumn, Interrupt> {
        let delimiter = self.schema.delimiter_for(column);
        let grouped_columns = column.group == GroupPolicy::Columns;

        let mut cells: Vec<Cell> = Vec::new();
        let mut shared: Vec<EvaluatedColumn> = Vec::new();

        for (index, &element) in matches.iter().enumerate() {
            let element_name = if grouped_columns {
                format!("{name}{delimiter}{index}")
            } else {
                name.clone()
            };

            let mut locals: Vec<EvaluatedColumn> = Vec::new();
            let accumulator = if grouped_columns { &mut shared } else { &mut locals };

            let mut kept_any = false;
            for sub in &column.columns {
                let child_name = format!("{element_name}{delimiter}{}", sub.name);
                let evaluated = self.eval(Some(element), sub, child_name)?;
                // A required empty result must reach materialization so it
                // drops exactly its dependent rows; skip_row_if_empty keeps
                // the empty cell without requiring it.
                if !evaluated.is_empty() || sub.skip_row_if_empty || sub.required_value {
                    accumulator.push(evaluated);
                    kept_any = true;
                }
            }

            if !kept_any {
                // Elements none of the sub-columns mapped: scalars and
                // arrays fall through to leaf handling, objects are dropped.
                if !element.is_object() {
                    let leaf_cells =
                        self.process_leaves(&[element], column, &element_name)?;
                    if grouped_columns {
                        shared.push(EvaluatedColumn::new(element_name, leaf_cells));
                    } else {
                        cells.extend(leaf_cells);
                    }
                }
            } else if !grouped_columns {
                cells.extend(composite_cells(locals));
            }
        }

        if grouped_columns {
            cells.extend(composite_cells(shared));
        }

        Ok(EvaluatedColumn::new(name, cells))
    }

    /// Convert matched values and group them into cells, for leaf columns
    /// and for branch elements that fell through to leaf handling.
    fn process_leaves(
        &self,
        values: &[&Value],
        column: &Column,
        name: &str,
    ) -> Result<Vec<Cell>, Interrupt> {
        let mut converted = Vec::with_capacity(values.len());
        for &value in values {
            let output =
                column
                    .converter
                    .convert(value)
                    .map_err(|source| FlattenError::Conversion {
                        column: name.to_string(),
                        value: value.clone(),
                        source,
                    })?;
            converted.push(output);
        }

        let required = column.required_value;
        let cells = match column.group {
            GroupPolicy::Array => {
                if converted.len() == 1 {
                    vec![Cell::value(converted.into_iter().next().unwrap(), required)]
                } else {
                    vec![Cell::value(Value::Array(converted), required)]
                }
            }
            GroupPolicy::Concat => {
                if converted.len() == 1 {
                    vec![Cell::value(converted.into_iter().next().unwrap(), required)]
                } else {
                    let joined = converted
                        .iter()
                        .map(value_text)
                        .collect::<Vec<_>>()
                        .join(&self.schema.concat_separator);
                    vec![Cell::value(Value::String(joined), required)]
                }
            }
            GroupPolicy::Columns => {
                let delimiter = self.schema.delimiter_for(column);
                let members = converted
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| {
                        NamedCell::new(
                            format!("{name}{delimiter}{index}"),
                            Cell::value(value, required),
                        )
                    })
                    .collect();
                vec![Cell::Composite(members)]
            }
            GroupPolicy::NoGroup => converted
                .into_iter()
                .map(|value| Cell::value(value, required))
                .collect(),
        };
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnConfig, SchemaConfig};
    use serde_json::json;

    fn schema(columns: Vec<ColumnConfig>) -> Schema {
        Schema::from_config(SchemaConfig {
            columns,
            ..Default::default()
        })
        .unwrap()
    }

    fn leaf(name: &str, path: &str) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            path: Some(path.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_leaf_no_group_fans_out() {
        let schema = schema(vec![leaf("b", "b[*]")]);
        let evaluator = Evaluator::new(&schema);
        let doc = json!({"b": [1, 2]});

        let column = evaluator
            .eval(Some(&doc), &schema.columns[0], "b".to_string())
            .unwrap();
        assert_eq!(
            column.cells,
            vec![Cell::value(json!(1), false), Cell::value(json!(2), false)]
        );
    }

    #[test]
    fn test_missing_leaf_is_explicit_absence() {
        let schema = schema(vec![leaf("b", "nope")]);
        let evaluator = Evaluator::new(&schema);
        let doc = json!({"b": 1});

        let column = evaluator
            .eval(Some(&doc), &schema.columns[0], "b".to_string())
            .unwrap();
        assert_eq!(column.cells, vec![Cell::absent(false)]);
    }

    #[test]
    fn test_unmapped_object_elements_are_dropped() {
        let schema = schema(vec![ColumnConfig {
            name: "items".to_string(),
            path: Some("items[*]".to_string()),
            columns: vec![leaf("v", "v")],
            ..Default::default()
        }]);
        let evaluator = Evaluator::new(&schema);
        // One mapped object, one unmapped object, one scalar.
        let doc = json!({"items": [{"v": 1}, {"w": 2}, 7]});

        let column = evaluator
            .eval(Some(&doc), &schema.columns[0], "items".to_string())
            .unwrap();
        assert_eq!(column.cells.len(), 2);
        assert!(matches!(column.cells[0], Cell::Composite(_)));
        assert_eq!(column.cells[1], Cell::value(json!(7), false));
    }

    #[test]
    fn test_columns_policy_shares_one_accumulator() {
        let schema = schema(vec![ColumnConfig {
            name: "pair".to_string(),
            path: Some("pair[*]".to_string()),
            group: GroupPolicy::Columns,
            columns: vec![leaf("x", "x")],
            ..Default::default()
        }]);
        let evaluator = Evaluator::new(&schema);
        let doc = json!({"pair": [{"x": 1}, {"x": 2}]});

        let column = evaluator
            .eval(Some(&doc), &schema.columns[0], "pair".to_string())
            .unwrap();
        // One composite holding both elements' sub-columns, not two
        // fan-out alternatives.
        assert_eq!(column.cells.len(), 1);
        match &column.cells[0] {
            Cell::Composite(members) => {
                let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["pair_0_x", "pair_1_x"]);
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_document_signal_propagates_from_nested_column() {
        let schema = schema(vec![ColumnConfig {
            name: "a".to_string(),
            path: Some("a".to_string()),
            columns: vec![ColumnConfig {
                name: "must".to_string(),
                path: Some("missing".to_string()),
                skip_document_if_empty: true,
                ..Default::default()
            }],
            ..Default::default()
        }]);
        let evaluator = Evaluator::new(&schema);
        let doc = json!({"a": {"other": 1}});

        let result = evaluator.eval(Some(&doc), &schema.columns[0], "a".to_string());
        assert!(matches!(result, Err(Interrupt::DocumentSkipped)));
    }

    #[test]
    fn test_conversion_failure_names_the_column() {
        let schema = schema(vec![ColumnConfig {
            name: "n".to_string(),
            path: Some("n".to_string()),
            converter: Some("to_integer".to_string()),
            ..Default::default()
        }]);
        let evaluator = Evaluator::new(&schema);
        let doc = json!({"n": "not a number"});

        let result = evaluator.eval(Some(&doc), &schema.columns[0], "n".to_string());
        match result {
            Err(Interrupt::Error(FlattenError::Conversion { column, value, .. })) => {
                assert_eq!(column, "n");
                assert_eq!(value, json!("not a number"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
