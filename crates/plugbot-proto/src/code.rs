//! Fenced code-block extraction.
//!
//! Chat clients wrap code in backtick fences, optionally with a language
//! marker on the opening fence (```` ```py ````). Commands that run code
//! want only the inner text.

/// Strip a backtick fence and optional language marker from `text`.
///
/// Text that is not fenced is returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use plugbot_proto::extract_code;
///
/// assert_eq!(extract_code("```py\nprint(1)\n```"), "print(1)");
/// assert_eq!(extract_code("`1 + 2`"), "1 + 2");
/// assert_eq!(extract_code("1 + 2"), "1 + 2");
/// ```
pub fn extract_code(text: &str) -> &str {
    let trimmed = text.trim();
    let ticks = trimmed.chars().take_while(|&c| c == '`').count();
    if ticks == 0 {
        return trimmed;
    }

    let fence = &trimmed[..ticks.min(3)];
    if trimmed.len() < fence.len() * 2 || !trimmed.ends_with(fence) {
        return trimmed;
    }

    let mut inner = &trimmed[fence.len()..trimmed.len() - fence.len()];
    if fence.len() == 3 {
        if let Some((first, rest)) = inner.split_once('\n') {
            if is_language_marker(first) {
                inner = rest;
            }
        }
    }

    inner.trim_matches(|c| c == '\n' || c == '\r')
}

fn is_language_marker(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '_' | '.'))
}
