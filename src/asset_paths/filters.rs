use regex::Regex;

fn rewrite_ignores() -> &'static [Regex] {
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^[a-z][a-z0-9+.-]*:").expect("invalid URL scheme regex"),
                Regex::new(r"^//").expect("invalid protocol-relative regex"),
            ]
        })
        .as_slice()
}

/// Determine whether a stylesheet `url()` value points somewhere other than the local tree.
///
/// Anything with a scheme (`https:`, `data:`, `blob:`, ...) or a protocol-relative `//host`
/// is not a file in the local tree, so it cannot be given a content key.
pub fn should_skip_rewrite(value: &str) -> bool {
    rewrite_ignores().iter().any(|pattern| pattern.is_match(value))
}
