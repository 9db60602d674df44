//! Helpers for writing [Newick](https://en.wikipedia.org/wiki/Newick_format) strings.

/// Characters that cannot appear in an unquoted Newick label.
const RESERVED: &[char] = &['(', ')', '[', ']', '\'', ':', ';', ','];

/// Returns a label that is safe to embed in a Newick string.
///
/// Labels with reserved characters or whitespace are single-quoted, with
/// embedded quotes doubled.
///
/// ## Examples
///
/// ```rust
/// use strainer_tree::newick::escape_label;
///
/// assert_eq!(escape_label("snv_1"), "snv_1");
/// assert_eq!(escape_label("scaffold_1:120:A"), "'scaffold_1:120:A'");
/// assert_eq!(escape_label("it's"), "'it''s'");
/// ```
pub fn escape_label(label: &str) -> String {
    let needs_quotes = label.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c));
    match needs_quotes {
        true => format!("'{}'", label.replace('\'', "''")),
        false => label.to_string(),
    }
}

/// Returns a branch length formatted for Newick output.
///
/// ```rust
/// use strainer_tree::newick::format_length;
///
/// assert_eq!(format_length(1.5), "1.5");
/// assert_eq!(format_length(0.0), "0");
/// assert_eq!(format_length(-0.0), "0");
/// ```
pub fn format_length(length: f64) -> String {
    // -0.0 shows up when the two heights are equal
    match length == 0.0 {
        true => "0".to_string(),
        false => format!("{length}"),
    }
}
