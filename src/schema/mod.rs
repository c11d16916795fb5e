//! The declarative column schema and its collaborators.
//!
//! A schema is an ordered tree of columns. Each column names an output
//! field, addresses input values with a compiled path expression, and
//! decides how multiple matches group into cells and rows. Schemas are
//! built once, are immutable afterwards, and are safe to share across
//! concurrent document transforms.

pub mod convert;
pub mod filter;
pub mod path;

use crate::error::FlattenError;
use path::CompiledPath;
use serde::{Deserialize, Serialize};

pub use convert::{ConvertError, Converter, ConverterRef};
pub use filter::{Exist, Filter};
pub use path::PathError;

/// How multiple matched values for one column combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPolicy {
    /// Each match is an independent cell; multiple matches fan out into
    /// separate rows.
    #[default]
    #[serde(alias = "NO_GROUP")]
    NoGroup,
    /// All matches collapse into one cell holding a JSON array.
    #[serde(alias = "ARRAY")]
    Array,
    /// All matches collapse into one cell holding a separator-joined string.
    #[serde(alias = "CONCAT")]
    Concat,
    /// Matches become index-suffixed sibling cells that stay in one row.
    #[serde(alias = "COLUMNS")]
    Columns,
}

/// Serde-facing schema description, compiled into a [`Schema`] with
/// [`Schema::from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Joins parent and child names, and `COLUMNS` index suffixes.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Joins values under the `CONCAT` policy.
    #[serde(default = "default_concat_separator")]
    pub concat_separator: String,

    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig {
            delimiter: default_delimiter(),
            concat_separator: default_concat_separator(),
            columns: Vec::new(),
        }
    }
}

/// One column in a [`SchemaConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    /// Path expression; the column name doubles as the path when omitted.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub group: GroupPolicy,

    /// Registry name of the converter applied to each matched value.
    #[serde(default)]
    pub converter: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnConfig>,

    /// Rows in which this column resolves empty are dropped.
    #[serde(default)]
    pub required_value: bool,

    /// An empty result for this column is kept in the row structure (and
    /// omitted at materialization) instead of making the branch disappear.
    #[serde(default)]
    pub skip_row_if_empty: bool,

    /// No match anywhere for this column aborts the whole document's output.
    #[serde(default)]
    pub skip_document_if_empty: bool,

    /// Overrides the schema delimiter for names this column composes.
    #[serde(default)]
    pub delimiter: Option<String>,
}

fn default_delimiter() -> String {
    "_".to_string()
}

fn default_concat_separator() -> String {
    ",".to_string()
}

/// A compiled, immutable schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<Column>,
    pub delimiter: String,
    pub concat_separator: String,
}

/// A compiled column: path parsed, converter resolved.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    path: CompiledPath,
    pub group: GroupPolicy,
    pub(crate) converter: ConverterRef,
    pub columns: Vec<Column>,
    pub required_value: bool,
    pub skip_row_if_empty: bool,
    pub skip_document_if_empty: bool,
    delimiter: Option<String>,
}

impl Schema {
    /// Compile a schema description. Malformed paths and unknown converter
    /// names fail here, naming the offending column, so transform-time code
    /// never revalidates.
    pub fn from_config(config: SchemaConfig) -> Result<Schema, FlattenError> {
        let columns = config
            .columns
            .into_iter()
            .map(Column::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Schema {
            columns,
            delimiter: config.delimiter,
            concat_separator: config.concat_separator,
        })
    }

    /// Compile a schema from its JSON rendering.
    pub fn from_json_str(json: &str) -> Result<Schema, FlattenError> {
        let config: SchemaConfig =
            serde_json::from_str(json).map_err(FlattenError::SchemaParse)?;
        Schema::from_config(config)
    }

    /// The delimiter `column` uses for the names it composes.
    pub(crate) fn delimiter_for<'a>(&'a self, column: &'a Column) -> &'a str {
        column.delimiter.as_deref().unwrap_or(&self.delimiter)
    }
}

impl Column {
    fn from_config(config: ColumnConfig) -> Result<Column, FlattenError> {
        let raw_path = config.path.as_deref().unwrap_or(&config.name);
        let path = CompiledPath::parse(raw_path).map_err(|source| FlattenError::Path {
            column: config.name.clone(),
            path: raw_path.to_string(),
            source,
        })?;

        let converter = match &config.converter {
            Some(name) => {
                convert::lookup(name).ok_or_else(|| FlattenError::UnknownConverter {
                    column: config.name.clone(),
                    name: name.clone(),
                })?
            }
            None => convert::identity(),
        };

        let columns = config
            .columns
            .into_iter()
            .map(Column::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Column {
            name: config.name,
            path,
            group: config.group,
            converter,
            columns,
            required_value: config.required_value,
            skip_row_if_empty: config.skip_row_if_empty,
            skip_document_if_empty: config.skip_document_if_empty,
            delimiter: config.delimiter,
        })
    }

    pub(crate) fn select<'a>(&self, node: &'a serde_json::Value) -> Vec<&'a serde_json::Value> {
        self.path.select(node)
    }

    pub fn is_leaf(&self) -> bool {
        self.columns.is_empty()
    }

    /// Replace this column's converter with a caller-supplied one, for
    /// converters the stock registry does not cover.
    pub fn with_converter(mut self, converter: ConverterRef) -> Column {
        self.converter = converter;
        self
    }
}
