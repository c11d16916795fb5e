//! Cartesian row expansion and row materialization.
//!
//! The expander treats each column's alternative cells as one axis and
//! takes one cell per axis per output row. The materializer turns a row
//! into a flat JSON object, enforcing required-value semantics.

use crate::flatten::cell::{flatten_row, Cell, EvaluatedColumn, NamedCell};
use serde_json::{Map, Value};

/// Cartesian product across axes: one item per axis per combination,
/// earlier axes varying slowest. An empty input yields zero combinations,
/// not one empty combination; so does any empty axis.
pub fn cartesian_product<T: Clone>(axes: Vec<Vec<T>>) -> Vec<Vec<T>> {
    if axes.is_empty() {
        return Vec::new();
    }
    let mut combinations: Vec<Vec<T>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(combinations.len() * axis.len());
        for combination in &combinations {
            for item in &axis {
                let mut extended = combination.clone();
                extended.push(item.clone());
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

/// Combine sibling sub-column results into composite cells: one composite
/// per cross-column combination. A sub-column with no cells erases every
/// combination it would participate in.
pub fn composite_cells(columns: Vec<EvaluatedColumn>) -> Vec<Cell> {
    let axes: Vec<Vec<NamedCell>> = columns
        .into_iter()
        .map(EvaluatedColumn::into_named_cells)
        .collect();
    cartesian_product(axes)
        .into_iter()
        .map(Cell::Composite)
        .collect()
}

/// Materialize one row as a flat JSON object, or `None` if the row is
/// dropped. An empty required cell drops the row immediately; an empty
/// optional cell contributes no field. Later fields win name collisions,
/// which well-formed schemas never produce.
pub fn materialize_row(row: &[NamedCell]) -> Option<Map<String, Value>> {
    let mut object = Map::new();
    for named in flatten_row(row) {
        if named.cell.is_empty() {
            if named.cell.is_required() {
                return None;
            }
            continue;
        }
        if let Cell::Value { value, .. } = &named.cell {
            object.insert(named.name.clone(), value.clone());
        }
    }
    Some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cartesian_sizes_and_order() {
        let product = cartesian_product(vec![vec![1, 2], vec![10, 20, 30]]);
        assert_eq!(product.len(), 6);
        assert_eq!(product[0], vec![1, 10]);
        assert_eq!(product[1], vec![1, 20]);
        assert_eq!(product[5], vec![2, 30]);
    }

    #[test]
    fn test_cartesian_empty_input_yields_no_rows() {
        let product: Vec<Vec<i32>> = cartesian_product(vec![]);
        assert!(product.is_empty());
    }

    #[test]
    fn test_cartesian_empty_axis_yields_no_rows() {
        let product = cartesian_product(vec![vec![1, 2], vec![]]);
        assert!(product.is_empty());
    }

    #[test]
    fn test_composite_cells_pairs_names() {
        let cells = composite_cells(vec![
            EvaluatedColumn::new("a", vec![Cell::value(json!(1), false), Cell::value(json!(2), false)]),
            EvaluatedColumn::new("b", vec![Cell::value(json!(9), false)]),
        ]);
        assert_eq!(cells.len(), 2);
        match &cells[0] {
            Cell::Composite(members) => {
                assert_eq!(members[0].name, "a");
                assert_eq!(members[1].name, "b");
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn test_materialize_sets_fields() {
        let row = vec![
            NamedCell::new("a", Cell::value(json!(1), false)),
            NamedCell::new("b", Cell::value(json!("x"), false)),
        ];
        let object = materialize_row(&row).unwrap();
        assert_eq!(Value::Object(object), json!({"a": 1, "b": "x"}));
    }

    #[test]
    fn test_materialize_omits_empty_optional() {
        let row = vec![
            NamedCell::new("a", Cell::value(json!(1), false)),
            NamedCell::new("gone", Cell::absent(false)),
            NamedCell::new("null_too", Cell::value(Value::Null, false)),
        ];
        let object = materialize_row(&row).unwrap();
        assert_eq!(Value::Object(object), json!({"a": 1}));
    }

    #[test]
    fn test_materialize_drops_row_on_empty_required() {
        let row = vec![
            NamedCell::new("a", Cell::value(json!(1), false)),
            NamedCell::new("must", Cell::absent(true)),
        ];
        assert!(materialize_row(&row).is_none());
    }

    #[test]
    fn test_materialize_expands_nested_composites() {
        let row = vec![NamedCell::new(
            "wrap",
            Cell::Composite(vec![
                NamedCell::new("x_0", Cell::value(json!(1), false)),
                NamedCell::new("x_1", Cell::value(json!(2), false)),
            ]),
        )];
        let object = materialize_row(&row).unwrap();
        assert_eq!(Value::Object(object), json!({"x_0": 1, "x_1": 2}));
    }
}
