//! Shared utility functions.

/// Convert a slug to title case.
///
/// Splits on `-` and `_`, capitalizes each word.
/// "getting-started" -> "Getting Started"
/// "api_reference" -> "Api Reference"
pub fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a string into a URL-safe, lowercase, hyphenated token.
///
/// Non-ASCII characters are transliterated to ASCII first, so
/// "Grüße aus Köln" and "Grusse aus Koln" produce the same slug.
/// Every run of characters that is not an ASCII letter or digit collapses
/// into a single `-`, and leading/trailing hyphens are dropped.
///
/// "Welcome to Roq!" -> "welcome-to-roq"
pub fn slugify(s: &str) -> String {
    let ascii = deunicode::deunicode(s);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Convert a relative path to a forward-slash string, regardless of platform.
pub fn to_slash(path: &std::path::Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
