//! Variable bindings for template loads.
//!
//! A binding set is global for one load: every file reached through imports
//! sees the same values.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Mapping from variable name to substitution value.
///
/// Values are inserted as written. Markers a value carries are found by the
/// loader's next scan of the text they were spliced into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    values: BTreeMap<String, String>,
}

impl Bindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Bind a variable.
    ///
    /// # Example
    ///
    /// ```
    /// use temple_core::Bindings;
    ///
    /// let bindings = Bindings::new()
    ///     .set("page_title", "Home")
    ///     .set("page_content", "Welcome!");
    /// assert_eq!(bindings.get("page_title"), Some("Home"));
    /// ```
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind a variable in place, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Look up the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a `name=value` assignment, as given on a command line.
    ///
    /// Only the first `=` separates; the value may contain further `=`.
    pub fn parse_assignment(assignment: &str) -> Option<(String, String)> {
        let (name, value) = assignment.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), value.to_string()))
    }

    /// Parse bindings from a JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read bindings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| crate::TempleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Overlay `other` on top of `self`; later values win.
    pub fn merge(mut self, other: Bindings) -> Self {
        self.values.extend(other.values);
        self
    }
}

impl<K, V> FromIterator<(K, V)> for Bindings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Bindings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
