//! Document predicates.
//!
//! Filters are an extension point for callers that want to pre- or
//! post-select documents around a transform; the core transform never
//! invokes them.

use crate::schema::path::{CompiledPath, PathError};
use serde_json::Value;

/// A boolean predicate over a document.
pub trait Filter: Send + Sync {
    fn matches(&self, document: &Value) -> bool;
}

/// Passes documents in which a path has at least one match.
#[derive(Debug, Clone)]
pub struct Exist {
    path: CompiledPath,
}

impl Exist {
    pub fn new(path: &str) -> Result<Exist, PathError> {
        Ok(Exist {
            path: CompiledPath::parse(path)?,
        })
    }
}

impl Filter for Exist {
    fn matches(&self, document: &Value) -> bool {
        !self.path.select(document).is_empty()
    }
}
