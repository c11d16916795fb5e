//! Per-column value converters.
//!
//! A converter is a pure transform applied to every matched value before
//! grouping. Conversion failure is a schema authoring error, not a data
//! condition, so it surfaces as an error identifying the offending value
//! rather than being swallowed.

use once_cell::sync::Lazy;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a converter rejected a value.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConvertError(pub String);

/// A pure value-to-value transform. Implementations are stateless and shared
/// across concurrent document transforms.
pub trait Converter: fmt::Debug + Send + Sync {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError>;
}

/// Shared handle to a converter, cheap to clone into every column.
pub type ConverterRef = Arc<dyn Converter>;

/// Passes values through untouched. The default for columns that name no
/// converter.
#[derive(Debug)]
pub struct Identity;

impl Converter for Identity {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        Ok(value.clone())
    }
}

/// Parses the value's text rendering as a signed integer.
#[derive(Debug)]
pub struct ToInteger;

impl Converter for ToInteger {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        let text = value_text(value);
        text.parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| ConvertError(format!("`{text}` is not an integer")))
    }
}

/// Parses the value's text rendering as a floating-point number.
#[derive(Debug)]
pub struct ToFloat;

impl Converter for ToFloat {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        let text = value_text(value);
        let parsed = text
            .parse::<f64>()
            .map_err(|_| ConvertError(format!("`{text}` is not a number")))?;
        Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| ConvertError(format!("`{text}` is not a finite number")))
    }
}

/// Renders the value as a JSON string.
#[derive(Debug)]
pub struct ToText;

impl Converter for ToText {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        Ok(Value::String(value_text(value)))
    }
}

/// Parses `true`/`false` (any case) from the value's text rendering.
#[derive(Debug)]
pub struct ToBoolean;

impl Converter for ToBoolean {
    fn convert(&self, value: &Value) -> Result<Value, ConvertError> {
        match value_text(value).to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(ConvertError(format!("`{other}` is not a boolean"))),
        }
    }
}

/// Text rendering used by converters and `CONCAT` grouping: strings as-is,
/// everything else as its JSON rendering.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

static IDENTITY: Lazy<ConverterRef> = Lazy::new(|| Arc::new(Identity));

static REGISTRY: Lazy<HashMap<&'static str, ConverterRef>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, ConverterRef> = HashMap::new();
    map.insert("identity", Arc::new(Identity));
    map.insert("to_integer", Arc::new(ToInteger));
    map.insert("to_float", Arc::new(ToFloat));
    map.insert("to_text", Arc::new(ToText));
    map.insert("to_boolean", Arc::new(ToBoolean));
    map
});

/// The converter used when a column names none.
pub fn identity() -> ConverterRef {
    IDENTITY.clone()
}

/// Look up a stock converter by its registry name.
pub fn lookup(name: &str) -> Option<ConverterRef> {
    REGISTRY.get(name).cloned()
}
