//! The per-column result model.
//!
//! Evaluating one schema column against one node produces an
//! [`EvaluatedColumn`]: the resolved output name plus an ordered list of
//! [`Cell`]s. Each cell in the list is one alternative for that column;
//! alternatives fan out into separate rows during cartesian expansion.

use serde_json::Value;

/// One computed result for a column. Every leaf is either a concrete value
/// or an explicit absence marker; composites mirror schema nesting and are
/// fully flattened before rows are materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A concrete value. JSON `null` counts as empty.
    Value { value: Value, required: bool },
    /// The path matched nothing.
    Absent { required: bool },
    /// A cross-branch combination of named sub-results.
    Composite(Vec<NamedCell>),
}

impl Cell {
    pub fn value(value: Value, required: bool) -> Cell {
        Cell::Value { value, required }
    }

    pub fn absent(required: bool) -> Cell {
        Cell::Absent { required }
    }

    /// A composite is empty iff every nested cell is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Value { value, .. } => value.is_null(),
            Cell::Absent { .. } => true,
            Cell::Composite(members) => members.iter().all(|m| m.cell.is_empty()),
        }
    }

    /// A composite is required iff any nested cell is required.
    pub fn is_required(&self) -> bool {
        match self {
            Cell::Value { required, .. } | Cell::Absent { required } => *required,
            Cell::Composite(members) => members.iter().any(|m| m.cell.is_required()),
        }
    }
}

/// A resolved output name paired with its cell.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCell {
    pub name: String,
    pub cell: Cell,
}

impl NamedCell {
    pub fn new(name: impl Into<String>, cell: Cell) -> NamedCell {
        NamedCell {
            name: name.into(),
            cell,
        }
    }
}

/// The result of evaluating one schema column against one input node.
#[derive(Debug, Clone)]
pub struct EvaluatedColumn {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl EvaluatedColumn {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> EvaluatedColumn {
        EvaluatedColumn {
            name: name.into(),
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    /// Pair each alternative cell with the column's name; these are the
    /// items of one cartesian axis.
    pub fn into_named_cells(self) -> Vec<NamedCell> {
        let name = self.name;
        self.cells
            .into_iter()
            .map(|cell| NamedCell::new(name.clone(), cell))
            .collect()
    }
}

/// Depth-first traversal over a row's leaf cells, expanding nested
/// composites with an explicit stack so traversal depth is bounded by the
/// stack we control, not the call stack.
pub struct FlattenedCells<'a> {
    stack: Vec<std::slice::Iter<'a, NamedCell>>,
}

impl<'a> Iterator for FlattenedCells<'a> {
    type Item = &'a NamedCell;

    fn next(&mut self) -> Option<&'a NamedCell> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(named) => match &named.cell {
                    Cell::Composite(members) => self.stack.push(members.iter()),
                    _ => return Some(named),
                },
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// Iterate the leaf cells of a row, composites expanded in order.
pub fn flatten_row(row: &[NamedCell]) -> FlattenedCells<'_> {
    FlattenedCells {
        stack: vec![row.iter()],
    }
}
