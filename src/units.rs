/// Unit written in parentheses inside a column label.
///
/// Returns the text between the first `(` and the next `)` after it, or an
/// empty string when the label has no such pair. `"Temp (C)"` gives `"C"`.
pub fn extract_unit(column_name: &str) -> &str {
    column_name
        .find('(')
        .and_then(|open| {
            let rest = &column_name[open + 1..];
            rest.find(')').map(|close| &rest[..close])
        })
        .unwrap_or("")
}
