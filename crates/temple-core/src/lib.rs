//! # Temple Core
//!
//! A minimal template loader ("TeMPLate LoaDeR") for HTML and other
//! structured text.
//!
//! Two substitutions are supported and nothing else:
//!
//! - `{{$path/to/file.html}}` imports another template in place. Paths are
//!   pseudo-absolute: they are always relative to the project root, never to
//!   the importing file.
//! - `{{name}}` substitutes a variable from the binding set.
//!
//! Bindings are global for one load: the same name has the same value in
//! every file reached through imports. Multi-line substitutions keep the
//! indentation of the marker they replace.
//!
//! ## Example
//!
//! ```rust,no_run
//! use temple_core::{Bindings, FsSource, TemplateLoader};
//!
//! let loader = TemplateLoader::new(FsSource::current_dir());
//! let bindings = Bindings::new()
//!     .set("page_title", "Example Page Title")
//!     .set("page_content", "This is some example page content.");
//!
//! let html = loader.load("views/example.tmpl.html", &bindings)?;
//! # Ok::<(), temple_core::TempleError>(())
//! ```

pub mod error;
pub mod config;
pub mod bindings;
pub mod marker;
pub mod indent;
pub mod source;
pub mod engine;

pub use error::{TempleError, Result};
pub use config::{LoaderConfig, UndefinedPolicy};
pub use bindings::Bindings;
pub use marker::{Marker, MarkerKind};
pub use source::{FsSource, MemorySource, TemplateSource};
pub use engine::TemplateLoader;

/// Load a template file relative to the working directory.
///
/// Shorthand for a [`TemplateLoader`] over [`FsSource::current_dir`] with
/// the given undefined-variable behaviour.
pub fn load_file(path: &str, bindings: &Bindings, skip_undefined: bool) -> Result<String> {
    TemplateLoader::new(FsSource::current_dir())
        .skip_undefined(skip_undefined)
        .load(path, bindings)
}

/// Resolve template text, reading imports relative to the working directory.
pub fn load_str(content: &str, bindings: &Bindings, skip_undefined: bool) -> Result<String> {
    TemplateLoader::new(FsSource::current_dir())
        .skip_undefined(skip_undefined)
        .load_str(content, bindings)
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        Bindings, FsSource, LoaderConfig, MemorySource, Result, TempleError, TemplateLoader,
        TemplateSource, UndefinedPolicy,
    };
}
