//! Template sources.
//!
//! Defines the interface the loader uses to read template text by path.
//! Import paths are opaque to the loader: they are handed to the source
//! verbatim and are never made relative to the importing file.

use crate::{Result, TempleError};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Trait that template storage backends implement.
///
/// Implementations must return [`TempleError::MissingResource`] when `path`
/// does not exist.
pub trait TemplateSource: Send + Sync {
    /// Read the full text stored at `path`.
    fn read_text(&self, path: &str) -> Result<String>;

    /// Get the source name for logging.
    fn name(&self) -> &str {
        "source"
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for &T {
    fn read_text(&self, path: &str) -> Result<String> {
        (**self).read_text(path)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn read_text(&self, path: &str) -> Result<String> {
        (**self).read_text(path)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Reads templates from the filesystem, relative to a project root.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a source rooted at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::current_dir()
    }
}

impl TemplateSource for FsSource {
    fn read_text(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        trace!(path = %full.display(), "reading template");

        std::fs::read_to_string(&full).map_err(|source| match source.kind() {
            ErrorKind::NotFound => TempleError::MissingResource(path.to_string()),
            _ => TempleError::Io {
                path: path.to_string(),
                source,
            },
        })
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

/// Holds templates in memory, keyed by path.
///
/// # Example
///
/// ```
/// use temple_core::{MemorySource, TemplateSource};
///
/// let source = MemorySource::new()
///     .with_template("views/header.html", "<h1>{{title}}</h1>");
/// assert!(source.read_text("views/header.html").is_ok());
/// assert!(source.read_text("views/missing.html").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Add a template.
    pub fn with_template(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a template.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.templates.insert(path.into(), content.into());
    }
}

impl TemplateSource for MemorySource {
    fn read_text(&self, path: &str) -> Result<String> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| TempleError::MissingResource(path.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
