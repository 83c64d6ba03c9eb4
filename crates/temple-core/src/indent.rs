//! Indentation handling at substitution sites.
//!
//! Multi-line replacement text is aligned with the whitespace that precedes
//! its marker, so an import placed two tabs deep stays two tabs deep on every
//! line.

/// Characters stripped from the end of every replacement.
const TRAILING: &[char] = &['\t', ' ', '\r', '\n'];

/// Collect the run of tabs and spaces immediately before byte offset `pos`.
///
/// The walk stops at the start of the text, a newline, or any other
/// non-blank character.
///
/// ```
/// use temple_core::indent::indent_before;
///
/// assert_eq!(indent_before("<p>\n\t\t{{x}}", 6), "\t\t");
/// assert_eq!(indent_before("a {{x}}", 2), " ");
/// ```
pub fn indent_before(text: &str, pos: usize) -> &str {
    let head = &text[..pos.min(text.len())];
    let trimmed = head.trim_end_matches(['\t', ' ']);
    &head[trimmed.len()..]
}

/// Prefix every line after the first with `indent`, then strip trailing
/// whitespace and newlines from the result.
///
/// ```
/// use temple_core::indent::apply_indent;
///
/// assert_eq!(apply_indent("a\nb\n", "  "), "a\n  b");
/// ```
pub fn apply_indent(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len() + indent.len() * text.matches('\n').count());
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str(indent);
        }
        out.push_str(line);
    }

    let kept = out.trim_end_matches(TRAILING).len();
    out.truncate(kept);
    out
}

/// Indent `replacement` for insertion at byte offset `pos` of `text`.
pub fn indent_for_site(text: &str, pos: usize, replacement: &str) -> String {
    apply_indent(replacement, indent_before(text, pos))
}
