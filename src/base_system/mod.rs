pub mod config;
pub mod logging;

/// Clean a name derived from a URL segment so it is safe to use as a file stem.
///
/// Forbidden filename characters (Windows set, which is a superset of the Unix
/// one) are replaced, trailing dots/spaces are stripped, and overly long names
/// are truncated.
pub fn safe_fs_name(name: &str, replacement: char, max_len: usize) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' | '"' | '<' | '>' | '/' | '\\' | '|' | '?' | '*' => replacement,
            c if (c as u32) < 32 => replacement,
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.chars().count() > max_len {
        cleaned = cleaned.chars().take(max_len).collect();
    }

    if cleaned.is_empty() {
        cleaned.push_str("unknown_ebook");
    }
    cleaned
}
