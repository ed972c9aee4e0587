//! HTML escaping for interpolated output.

/// Escapes the five HTML-significant characters.
///
/// Applied to every `<%= %>` interpolation before it reaches the output
/// buffer. Raw interpolation (`<%- %>`) bypasses this.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
