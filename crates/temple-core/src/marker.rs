//! Marker parsing.
//!
//! Templates contain two kinds of markers:
//! - `{{$path/to/file}}` imports another template in place.
//! - `{{name}}` substitutes the value bound to `name`.
//!
//! Markers never nest and their payloads cannot contain braces.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Pattern for import markers. Format: {{$path}}
const IMPORT_PATTERN: &str = r"\{\{\$([^\{\}]+)\}\}";

/// Pattern for variable markers. Format: {{name}}, name not starting with `$`
const VARIABLE_PATTERN: &str = r"\{\{([^\{\}\$][^\{\}]*)\}\}";

static IMPORT_REGEX: OnceLock<Regex> = OnceLock::new();
static VARIABLE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_import_regex() -> &'static Regex {
    IMPORT_REGEX.get_or_init(|| Regex::new(IMPORT_PATTERN).expect("Invalid import pattern regex"))
}

fn get_variable_regex() -> &'static Regex {
    VARIABLE_REGEX.get_or_init(|| Regex::new(VARIABLE_PATTERN).expect("Invalid variable pattern regex"))
}

/// The kind of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// `{{$path}}`
    Import,
    /// `{{name}}`
    Variable,
}

/// A marker located in template text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Import or variable.
    pub kind: MarkerKind,

    /// Import path or variable name, without braces or sigil.
    pub payload: String,

    /// Byte offset of the opening braces.
    pub start: usize,

    /// Byte offset just past the closing braces.
    pub end: usize,
}

impl Marker {
    fn from_captures(kind: MarkerKind, cap: &Captures<'_>) -> Self {
        let full = cap.get(0).expect("capture group 0 is always present");
        Self {
            kind,
            payload: cap[1].to_string(),
            start: full.start(),
            end: full.end(),
        }
    }

    pub fn is_import(&self) -> bool {
        self.kind == MarkerKind::Import
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MarkerKind::Import => write!(f, "{{{{${}}}}}", self.payload),
            MarkerKind::Variable => write!(f, "{{{{{}}}}}", self.payload),
        }
    }
}

/// Find the first import marker at or after byte offset `from`.
pub fn find_import(text: &str, from: usize) -> Option<Marker> {
    get_import_regex()
        .captures_at(text, from)
        .map(|cap| Marker::from_captures(MarkerKind::Import, &cap))
}

/// Find the first variable marker at or after byte offset `from`.
pub fn find_variable(text: &str, from: usize) -> Option<Marker> {
    get_variable_regex()
        .captures_at(text, from)
        .map(|cap| Marker::from_captures(MarkerKind::Variable, &cap))
}

/// List every marker in `text`, in document order.
///
/// Nothing is resolved; markers that would only appear after an import is
/// expanded are not reported.
pub fn scan(text: &str) -> Vec<Marker> {
    let imports = get_import_regex()
        .captures_iter(text)
        .map(|cap| Marker::from_captures(MarkerKind::Import, &cap));
    let variables = get_variable_regex()
        .captures_iter(text)
        .map(|cap| Marker::from_captures(MarkerKind::Variable, &cap));

    let mut markers: Vec<Marker> = imports.chain(variables).collect();
    markers.sort_by_key(|m| m.start);
    markers
}
