//! Utility functions and helpers.

pub mod http;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest prefix of `s` with at most `max_chars` characters that does not
/// split a grapheme cluster.
pub fn truncate_graphemes(s: &str, max_chars: usize) -> &str {
    let mut chars = 0;
    let mut end = 0;
    for (offset, grapheme) in s.grapheme_indices(true) {
        chars += grapheme.chars().count();
        if chars > max_chars {
            break;
        }
        end = offset + grapheme.len();
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Java \n\t Developer "), "Java Developer");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("Java", 10), "Java");
        assert_eq!(truncate_graphemes("Разработчик", 3), "Раз");
        // "и" + combining breve is one grapheme
        assert_eq!(truncate_graphemes("аи\u{306}", 2), "а");
        assert_eq!(truncate_graphemes("аи\u{306}", 3), "аи\u{306}");
    }
}
