//! Template Loader - the substitution engine.
//!
//! A load runs in two phases. First every `{{$path}}` import is replaced,
//! depth-first and left to right, by the fully resolved content of the
//! imported template. Only then are `{{name}}` variables substituted, so
//! variables introduced by imported files are covered by the same binding
//! set and import paths are never mistaken for variables.

use crate::{
    indent, marker, Bindings, LoaderConfig, Result, TempleError, TemplateSource, UndefinedPolicy,
};
use tracing::{debug, info, instrument, trace};

/// The main engine for template loading.
///
/// The loader holds no state between calls; concurrent loads are safe
/// whenever the source is.
///
/// # Example
///
/// ```rust
/// use temple_core::{Bindings, MemorySource, TemplateLoader};
///
/// let source = MemorySource::new().with_template("child.tmpl", "Hello, {{name}}!");
/// let loader = TemplateLoader::new(source);
///
/// let bindings = Bindings::new().set("name", "World");
/// let result = loader.load_str("<p>\n\t{{$child.tmpl}}\n</p>\n", &bindings)?;
/// assert_eq!(result, "<p>\n\tHello, World!\n</p>\n");
/// # Ok::<(), temple_core::TempleError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TemplateLoader<S: TemplateSource> {
    /// Where imported (and root) templates are read from.
    source: S,

    /// Policy and limits applied to every load.
    config: LoaderConfig,
}

impl<S: TemplateSource> TemplateLoader<S> {
    /// Create a new loader over the given source with default configuration.
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: LoaderConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Pass undefined variables through literally instead of failing.
    pub fn skip_undefined(mut self, skip: bool) -> Self {
        self.config = self.config.with_skip_undefined(skip);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the template at `path` and resolve it.
    ///
    /// Fails with [`TempleError::MissingResource`] if `path` or any import
    /// cannot be found.
    #[instrument(skip(self, bindings), fields(source = self.source.name()))]
    pub fn load(&self, path: &str, bindings: &Bindings) -> Result<String> {
        info!("Loading template: {}", path);

        let mut chain = Vec::new();
        self.load_nested(path, bindings, &mut chain, 0)
    }

    /// Resolve already-loaded template text.
    #[instrument(skip_all, fields(len = content.len()))]
    pub fn load_str(&self, content: &str, bindings: &Bindings) -> Result<String> {
        let mut chain = Vec::new();
        self.resolve(content.to_string(), bindings, &mut chain, 0)
    }

    /// Read and resolve one template, tracking it on the import chain.
    fn load_nested(
        &self,
        path: &str,
        bindings: &Bindings,
        chain: &mut Vec<String>,
        depth: usize,
    ) -> Result<String> {
        if self.config.detect_cycles && chain.iter().any(|p| p == path) {
            let mut cycle = chain.clone();
            cycle.push(path.to_string());
            return Err(TempleError::ImportCycle(cycle));
        }

        let content = self.source.read_text(path)?;

        chain.push(path.to_string());
        let resolved = self.resolve(content, bindings, chain, depth);
        chain.pop();

        resolved
    }

    /// Run both phases over `content`.
    fn resolve(
        &self,
        content: String,
        bindings: &Bindings,
        chain: &mut Vec<String>,
        depth: usize,
    ) -> Result<String> {
        let content = self.resolve_imports(content, bindings, chain, depth)?;
        self.resolve_variables(content, bindings)
    }

    /// Phase 1: inline every import.
    ///
    /// Markers are located one at a time and every search restarts at the
    /// beginning of the text, because each splice shifts later offsets and
    /// may form new markers.
    fn resolve_imports(
        &self,
        mut content: String,
        bindings: &Bindings,
        chain: &mut Vec<String>,
        depth: usize,
    ) -> Result<String> {
        let mut expansions = Expansions::default();

        while let Some(found) = marker::find_import(&content, 0) {
            expansions.close_before(found.start);
            if self.config.detect_cycles && expansions.contains(&found.payload) {
                let mut cycle = chain.clone();
                cycle.extend(expansions.names());
                cycle.push(found.payload);
                return Err(TempleError::ImportCycle(cycle));
            }

            if let Some(limit) = self.config.max_depth {
                if depth >= limit {
                    return Err(TempleError::DepthExceeded(limit));
                }
            }

            debug!(path = %found.payload, depth = depth + 1, "Resolving import");
            let imported = self.load_nested(&found.payload, bindings, chain, depth + 1)?;

            let imported = indent::indent_for_site(&content, found.start, &imported);
            content.replace_range(found.start..found.end, &imported);
            expansions.record(&found.payload, found.start, found.end, imported.len());
        }

        Ok(content)
    }

    /// Phase 2: substitute variables from the binding set.
    fn resolve_variables(&self, content: String, bindings: &Bindings) -> Result<String> {
        match self.config.undefined {
            UndefinedPolicy::Fail => self.substitute_all(content, bindings),
            UndefinedPolicy::PassThrough => Ok(substitute_bound(content, bindings)),
        }
    }

    /// Replace every variable marker, failing on the first unbound one.
    ///
    /// Like imports, each search restarts at the beginning of the text, so
    /// markers carried in by a value are substituted as well.
    fn substitute_all(&self, mut content: String, bindings: &Bindings) -> Result<String> {
        let mut expansions = Expansions::default();

        while let Some(found) = marker::find_variable(&content, 0) {
            expansions.close_before(found.start);

            let Some(value) = bindings.get(&found.payload) else {
                return Err(TempleError::UnresolvedBinding(found.payload));
            };
            if self.config.detect_cycles && expansions.contains(&found.payload) {
                let mut cycle: Vec<String> = expansions.names().collect();
                cycle.push(found.payload);
                return Err(TempleError::BindingCycle(cycle));
            }

            debug!(name = %found.payload, "Substituting variable");
            let value = indent::indent_for_site(&content, found.start, value);
            content.replace_range(found.start..found.end, &value);
            expansions.record(&found.payload, found.start, found.end, value.len());
        }

        Ok(content)
    }
}

/// Replace the markers of bound names only, one name at a time in name
/// order. Markers without a binding are left as written.
fn substitute_bound(mut content: String, bindings: &Bindings) -> String {
    for (name, value) in bindings.iter() {
        let needle = format!("{{{{{}}}}}", name);
        let mut cursor = 0;

        while let Some(offset) = content[cursor..].find(&needle) {
            let start = cursor + offset;
            trace!(name, offset = start, "Substituting variable");
            let value = indent::indent_for_site(&content, start, value);
            content.replace_range(start..start + needle.len(), &value);
            cursor = start + value.len();
        }
    }

    content
}

/// Substitutions whose inserted text may still contain markers.
///
/// Each entry is a marker payload and the offset where the text that
/// replaced it ends. Entries nest: an inner entry never ends after the
/// entry below it. A marker found inside an entry that carries the same
/// payload can only come from that payload expanding into itself.
#[derive(Debug, Default)]
struct Expansions {
    active: Vec<(String, usize)>,
}

impl Expansions {
    /// Drop entries whose inserted text ends at or before `start`.
    fn close_before(&mut self, start: usize) {
        while self.active.last().is_some_and(|(_, end)| *end <= start) {
            self.active.pop();
        }
    }

    fn contains(&self, payload: &str) -> bool {
        self.active.iter().any(|(p, _)| p == payload)
    }

    fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.active.iter().map(|(p, _)| p.clone())
    }

    /// Record that the marker at `start..end` was replaced by `inserted` bytes.
    fn record(&mut self, payload: &str, start: usize, end: usize, inserted: usize) {
        for (_, region_end) in &mut self.active {
            *region_end = if *region_end >= end {
                *region_end - (end - start) + inserted
            } else {
                // marker straddled the end of this entry
                start + inserted
            };
        }
        self.active.push((payload.to_string(), start + inserted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;

    fn loader(templates: &[(&str, &str)]) -> TemplateLoader<MemorySource> {
        let mut source = MemorySource::new();
        for (path, content) in templates {
            source.insert(*path, *content);
        }
        TemplateLoader::new(source)
    }

    #[test]
    fn test_plain_text_unchanged() {
        let loader = loader(&[]);
        let text = "<p>\n\tno markers { here } at all\n</p>\n";
        assert_eq!(loader.load_str(text, &Bindings::new()).unwrap(), text);
    }

    #[test]
    fn test_import_with_variable() {
        let loader = loader(&[("child.tmpl", "Hello, {{name}}!")]);
        let bindings = Bindings::new().set("name", "World");

        let result = loader
            .load_str("<p>\n\t{{$child.tmpl}}\n</p>\n", &bindings)
            .unwrap();
        assert_eq!(result, "<p>\n\tHello, World!\n</p>\n");
    }

    #[test]
    fn test_missing_import() {
        let loader = loader(&[]);
        match loader.load_str("a {{$missing.tmpl}} b", &Bindings::new()) {
            Err(TempleError::MissingResource(path)) => assert_eq!(path, "missing.tmpl"),
            other => panic!("expected missing resource, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_root() {
        let loader = loader(&[]);
        assert!(matches!(
            loader.load("root.tmpl", &Bindings::new()),
            Err(TempleError::MissingResource(path)) if path == "root.tmpl"
        ));
    }

    #[test]
    fn test_undefined_fails_by_default() {
        let loader = loader(&[]);
        match loader.load_str("x {{undefined_name}} y", &Bindings::new()) {
            Err(TempleError::UnresolvedBinding(name)) => assert_eq!(name, "undefined_name"),
            other => panic!("expected unresolved binding, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_passes_through() {
        let loader = loader(&[]).skip_undefined(true);
        let bindings = Bindings::new().set("known", "K");

        let result = loader
            .load_str("{{known}} {{undefined_name}} {{known}}", &bindings)
            .unwrap();
        assert_eq!(result, "K {{undefined_name}} K");
    }

    #[test]
    fn test_multiline_import_indented() {
        let loader = loader(&[("list.tmpl", "<li>a</li>\n<li>b</li>\n")]);
        let result = loader
            .load_str("<ul>\n    {{$list.tmpl}}\n</ul>", &Bindings::new())
            .unwrap();
        assert_eq!(result, "<ul>\n    <li>a</li>\n    <li>b</li>\n</ul>");
    }

    #[test]
    fn test_marker_after_text_gets_no_prefix() {
        let loader = loader(&[]);
        let bindings = Bindings::new().set("body", "one\ntwo");
        let result = loader.load_str("<p>{{body}}</p>", &bindings).unwrap();
        assert_eq!(result, "<p>one\ntwo</p>");
    }

    #[test]
    fn test_multiline_variable_indented() {
        let loader = loader(&[]);
        let bindings = Bindings::new().set("body", "line1\nline2\n\n");
        let result = loader.load_str("<div>\n\t\t{{body}}\n</div>", &bindings).unwrap();
        assert_eq!(result, "<div>\n\t\tline1\n\t\tline2\n</div>");
    }

    #[test]
    fn test_nested_imports_accumulate_indent() {
        let loader = loader(&[
            ("outer.tmpl", "<section>\n\t{{$inner.tmpl}}\n</section>\n"),
            ("inner.tmpl", "<p>\n\t{{text}}\n</p>"),
        ]);
        let bindings = Bindings::new().set("text", "x");
        let result = loader.load_str("<main>\n\t{{$outer.tmpl}}\n</main>", &bindings).unwrap();
        assert_eq!(
            result,
            "<main>\n\t<section>\n\t\t<p>\n\t\t\tx\n\t\t</p>\n\t</section>\n</main>"
        );
    }

    #[test]
    fn test_bindings_are_global_across_files() {
        let loader = loader(&[
            ("a.tmpl", "a:{{title}}"),
            ("b.tmpl", "b:{{title}} {{$a.tmpl}}"),
        ]);
        let bindings = Bindings::new().set("title", "T");
        let result = loader.load_str("{{title}} {{$b.tmpl}} {{$a.tmpl}}", &bindings).unwrap();
        assert_eq!(result, "T b:T a:T a:T");
    }

    #[test]
    fn test_imports_resolve_depth_first() {
        let loader = loader(&[
            ("first.tmpl", "[{{$nested.tmpl}}]"),
            ("nested.tmpl", "n"),
            ("second.tmpl", "<s>"),
        ]);
        assert!(matches!(
            loader.load_str("{{$first.tmpl}}{{$absent.tmpl}}{{$second.tmpl}}", &Bindings::new()),
            Err(TempleError::MissingResource(path)) if path == "absent.tmpl"
        ));

        let result = loader
            .load_str("{{$first.tmpl}}{{$second.tmpl}}", &Bindings::new())
            .unwrap();
        assert_eq!(result, "[n]<s>");
    }

    #[test]
    fn test_value_markers_are_substituted() {
        let loader = loader(&[]);
        let bindings = Bindings::new().set("a", "{{b}}").set("b", "B");
        let result = loader.load_str("{{a}} {{b}}", &bindings).unwrap();
        assert_eq!(result, "B B");
    }

    #[test]
    fn test_value_markers_same_in_root_and_import() {
        let loader = loader(&[("child.tmpl", "{{a}}")]);
        let bindings = Bindings::new().set("a", "{{b}}").set("b", "B");

        let from_root = loader.load_str("{{a}}", &bindings).unwrap();
        let from_import = loader.load_str("{{$child.tmpl}}", &bindings).unwrap();
        assert_eq!(from_root, "B");
        assert_eq!(from_root, from_import);
    }

    #[test]
    fn test_import_marker_from_value_inside_import() {
        let loader = loader(&[("child.tmpl", "{{v}}"), ("x.tmpl", "X")]);
        let bindings = Bindings::new().set("v", "{{$x.tmpl}}");

        let result = loader.load_str("<{{$child.tmpl}}>", &bindings).unwrap();
        assert_eq!(result, "<X>");
        assert!(!result.contains("{{$"));
    }

    #[test]
    fn test_marker_formed_across_splice() {
        let loader = loader(&[("a.tmpl", "{{"), ("b.tmpl", "B")]);
        let result = loader.load_str("{{$a.tmpl}}$b.tmpl}}", &Bindings::new()).unwrap();
        assert_eq!(result, "B");

        let bindings = Bindings::new().set("open", "{{").set("name", "N");
        let result = loader.load_str("{{open}}name}}", &bindings).unwrap();
        assert_eq!(result, "N");
    }

    #[test]
    fn test_value_expanding_into_itself_is_a_cycle() {
        let loader = loader(&[]);
        let bindings = Bindings::new().set("a", "x{{b}}").set("b", "{{a}}");
        match loader.load_str("{{a}}", &bindings) {
            Err(TempleError::BindingCycle(chain)) => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("expected binding cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_value_markers_are_not_cycles() {
        let loader = loader(&[]);
        let bindings = Bindings::new().set("row", "{{cell}}{{cell}}").set("cell", "<td/>");
        let result = loader.load_str("{{row}}\n{{row}}", &bindings).unwrap();
        assert_eq!(result, "<td/><td/>\n<td/><td/>");
    }

    #[test]
    fn test_import_reintroduced_by_value_is_a_cycle() {
        let loader = loader(&[("child.tmpl", "{{v}}")]);
        let bindings = Bindings::new().set("v", "{{$child.tmpl}}");
        match loader.load_str("{{$child.tmpl}}", &bindings) {
            Err(TempleError::ImportCycle(chain)) => {
                assert_eq!(chain, vec!["child.tmpl", "child.tmpl"]);
            }
            other => panic!("expected import cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_pass_through_indents_multiline_values() {
        let loader = loader(&[]).skip_undefined(true);
        let bindings = Bindings::new().set("body", "first\nsecond\n");
        let result = loader
            .load_str("<div>\n\t{{body}}\n\t{{later}}\n</div>", &bindings)
            .unwrap();
        assert_eq!(result, "<div>\n\tfirst\n\tsecond\n\t{{later}}\n</div>");
    }

    #[test]
    fn test_deep_acyclic_chain_has_no_default_limit() {
        let mut templates: Vec<(String, String)> = (0..80)
            .map(|n| (format!("f{}.tmpl", n), format!("{}{{{{$f{}.tmpl}}}}", n % 10, n + 1)))
            .collect();
        templates.push(("f80.tmpl".to_string(), "!".to_string()));

        let mut source = MemorySource::new();
        for (path, content) in &templates {
            source.insert(path.as_str(), content.as_str());
        }
        let loader = TemplateLoader::new(source);

        let result = loader.load("f0.tmpl", &Bindings::new()).unwrap();
        assert_eq!(result.len(), 81);
        assert!(result.ends_with("789!"));
        assert_eq!(loader.config().max_depth, None);
        assert_eq!(loader.source().name(), "memory");
    }

    #[test]
    fn test_import_paths_are_not_variables() {
        let loader = loader(&[("views/x.html", "X")]).skip_undefined(true);
        let bindings = Bindings::new().set("$views/x.html", "wrong");
        let result = loader.load_str("{{$views/x.html}}", &bindings).unwrap();
        assert_eq!(result, "X");
    }

    #[test]
    fn test_nested_undefined_fails_whole_load() {
        let loader = loader(&[("child.tmpl", "{{missing}}")]);
        assert!(matches!(
            loader.load_str("ok {{$child.tmpl}}", &Bindings::new()),
            Err(TempleError::UnresolvedBinding(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_import_cycle_detected() {
        let loader = loader(&[
            ("a.tmpl", "A {{$b.tmpl}}"),
            ("b.tmpl", "B {{$a.tmpl}}"),
        ]);
        match loader.load("a.tmpl", &Bindings::new()) {
            Err(TempleError::ImportCycle(chain)) => {
                assert_eq!(chain, vec!["a.tmpl", "b.tmpl", "a.tmpl"]);
            }
            other => panic!("expected import cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_import_from_text_detected() {
        let loader = loader(&[("self.tmpl", "{{$self.tmpl}}")]);
        assert!(matches!(
            loader.load_str("{{$self.tmpl}}", &Bindings::new()),
            Err(TempleError::ImportCycle(chain)) if chain == vec!["self.tmpl", "self.tmpl"]
        ));
    }

    #[test]
    fn test_depth_limit_without_cycle_detection() {
        let config = LoaderConfig::default()
            .with_cycle_detection(false)
            .with_max_depth(Some(4));
        let loader = loader(&[("loop.tmpl", "{{$loop.tmpl}}")]).with_config(config);

        assert!(matches!(
            loader.load("loop.tmpl", &Bindings::new()),
            Err(TempleError::DepthExceeded(4))
        ));
    }

    #[test]
    fn test_depth_limit_allows_exact_depth() {
        let config = LoaderConfig::default().with_max_depth(Some(2));
        let loader = loader(&[("one.tmpl", "1{{$two.tmpl}}"), ("two.tmpl", "2")]).with_config(config);
        assert_eq!(loader.load_str("0{{$one.tmpl}}", &Bindings::new()).unwrap(), "012");

        let config = LoaderConfig::default().with_max_depth(Some(1));
        let loader = loader.with_config(config);
        assert!(matches!(
            loader.load_str("0{{$one.tmpl}}", &Bindings::new()),
            Err(TempleError::DepthExceeded(1))
        ));
    }

    #[test]
    fn test_repeated_sibling_imports_are_not_cycles() {
        let loader = loader(&[("item.tmpl", "<li>{{label}}</li>")]);
        let bindings = Bindings::new().set("label", "x");
        let result = loader
            .load_str("{{$item.tmpl}}\n{{$item.tmpl}}", &bindings)
            .unwrap();
        assert_eq!(result, "<li>x</li>\n<li>x</li>");
    }
}
