//! Documentation reformatting for command descriptions.
//!
//! Command documentation is written as wrapped prose. Lines are joined
//! with single spaces, a blank line becomes a paragraph break, and a line
//! ending in two spaces followed by `/` forces a line break.

/// Reformat multi-line documentation into display text.
///
/// # Examples
///
/// ```
/// use plugbot_proto::reformat_doc;
///
/// let doc = "Manage plugins.\n    Loads and unloads at runtime.  /\n    Owner only.";
/// assert_eq!(
///     reformat_doc(doc),
///     "Manage plugins. Loads and unloads at runtime.\nOwner only."
/// );
/// ```
pub fn reformat_doc(doc: &str) -> String {
    let mut out = String::with_capacity(doc.len());

    for line in doc.lines() {
        if let Some(forced) = line.strip_suffix("  /") {
            out.push_str(forced.trim());
            out.push('\n');
        } else if line.trim().is_empty() {
            out.push_str("\n\n");
        } else {
            out.push_str(line.trim());
            out.push(' ');
        }
    }

    out.trim().to_string()
}
