//! Direct-file link classification.
//!
//! A URL is a "direct file" when it uses `http`/`https` and its path ends in
//! one of the allowed extensions. Classification is pure: no I/O, no state.

use serde::{Deserialize, Serialize};
use url::Url;

/// Extensions allowed when no explicit list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "mp3", "mp4", "docx", "xlsx", "pptx", "png", "jpg", "jpeg", "epub", "txt",
];

/// Ordered set of lowercase, dot-stripped file extensions.
///
/// Construction normalizes every entry (trim, strip leading dots, lowercase)
/// and drops empties and duplicates while keeping first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionAllowlist {
    extensions: Vec<String>,
}

impl ExtensionAllowlist {
    /// Builds an allowlist from arbitrary extension strings.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in extensions {
            let ext = normalize_extension(raw.as_ref());
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self {
            extensions: normalized,
        }
    }

    /// Parses a comma-separated list such as `"pdf, .ZIP,epub"`.
    #[must_use]
    pub fn parse_csv(value: &str) -> Self {
        Self::new(value.split(','))
    }

    /// Returns true if the (normalized) extension is in the list.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        let ext = normalize_extension(extension);
        self.extensions.iter().any(|e| *e == ext)
    }

    /// Keeps only entries of `requested` that are also in `self`, in
    /// `requested` order. Falls back to `self` when nothing survives.
    #[must_use]
    pub fn restrict_to(&self, requested: &Self) -> Self {
        let kept: Vec<String> = requested
            .extensions
            .iter()
            .filter(|ext| self.extensions.contains(ext))
            .cloned()
            .collect();
        if kept.is_empty() {
            self.clone()
        } else {
            Self { extensions: kept }
        }
    }

    /// Iterates over the normalized extensions in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Number of extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// True when no extension is allowed; nothing will ever classify.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ExtensionAllowlist {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl From<Vec<String>> for ExtensionAllowlist {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<ExtensionAllowlist> for Vec<String> {
    fn from(value: ExtensionAllowlist) -> Self {
        value.extensions
    }
}

impl std::fmt::Display for ExtensionAllowlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.extensions.join(","))
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

/// Returns true when `url` is an absolute `http(s)` URL whose path ends in
/// `"." + ext` for some `ext` in `allowed` (case-insensitive).
///
/// The query string and fragment are ignored; relative, scheme-relative and
/// non-http schemes are rejected.
#[must_use]
pub fn is_direct_file(url: &str, allowed: &ExtensionAllowlist) -> bool {
    if !has_http_scheme(url) {
        return false;
    }
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    allowed
        .iter()
        .any(|ext| path.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.')))
}

/// Returns true when the string starts with an `http://` or `https://` scheme.
#[must_use]
pub fn has_http_scheme(url: &str) -> bool {
    let url = url.trim_start();
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_only() -> ExtensionAllowlist {
        ExtensionAllowlist::new(["pdf"])
    }

    #[test]
    fn test_is_direct_file_accepts_matching_extension() {
        assert!(is_direct_file("https://example.edu/os.pdf", &pdf_only()));
        assert!(is_direct_file("http://example.edu/a/b/os.pdf", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_is_case_insensitive() {
        assert!(is_direct_file("https://example.edu/OS.PDF", &pdf_only()));
        let upper = ExtensionAllowlist::new([".PDF"]);
        assert!(is_direct_file("https://example.edu/os.pdf", &upper));
    }

    #[test]
    fn test_is_direct_file_strips_query_string() {
        assert!(is_direct_file(
            "https://host/path/report.pdf?x=1&y=.html",
            &pdf_only()
        ));
        assert!(!is_direct_file("https://host/view?file=report.pdf", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_rejects_other_schemes() {
        assert!(!is_direct_file("ftp://x/file.pdf", &pdf_only()));
        assert!(!is_direct_file("file:///tmp/file.pdf", &pdf_only()));
        assert!(!is_direct_file("javascript:alert('.pdf')", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_rejects_relative_forms() {
        assert!(!is_direct_file("/relative/file.pdf", &pdf_only()));
        assert!(!is_direct_file("//cdn.example.com/file.pdf", &pdf_only()));
        assert!(!is_direct_file("file.pdf", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_rejects_empty_and_malformed() {
        assert!(!is_direct_file("", &pdf_only()));
        assert!(!is_direct_file("   ", &pdf_only()));
        assert!(!is_direct_file("https://", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_requires_dot_before_extension() {
        assert!(!is_direct_file("https://example.com/notapdf", &pdf_only()));
        assert!(!is_direct_file("https://example.com/pdf", &pdf_only()));
    }

    #[test]
    fn test_is_direct_file_empty_allowlist_never_matches() {
        let empty = ExtensionAllowlist::new(Vec::<String>::new());
        assert!(empty.is_empty());
        assert!(!is_direct_file("https://example.com/a.pdf", &empty));
    }

    #[test]
    fn test_is_direct_file_is_idempotent() {
        let allow = ExtensionAllowlist::default();
        let url = "https://example.com/music/track.MP3?dl=1";
        let first = is_direct_file(url, &allow);
        for _ in 0..3 {
            assert_eq!(is_direct_file(url, &allow), first);
        }
        assert!(first);
    }

    #[test]
    fn test_allowlist_normalizes_and_dedups() {
        let allow = ExtensionAllowlist::parse_csv(" PDF, .zip,,pdf, ..Epub ");
        let items: Vec<&str> = allow.iter().collect();
        assert_eq!(items, vec!["pdf", "zip", "epub"]);
        assert_eq!(allow.to_string(), "pdf,zip,epub");
    }

    #[test]
    fn test_allowlist_restrict_to_keeps_known_entries() {
        let allowed = ExtensionAllowlist::new(["pdf", "zip", "epub"]);
        let requested = ExtensionAllowlist::new(["epub", "exe", "pdf"]);
        let restricted = allowed.restrict_to(&requested);
        assert_eq!(restricted.iter().collect::<Vec<_>>(), vec!["epub", "pdf"]);
    }

    #[test]
    fn test_allowlist_restrict_to_falls_back_when_disjoint() {
        let allowed = ExtensionAllowlist::new(["pdf"]);
        let requested = ExtensionAllowlist::new(["exe"]);
        assert_eq!(allowed.restrict_to(&requested), allowed);
    }

    #[test]
    fn test_has_http_scheme() {
        assert!(has_http_scheme("http://a"));
        assert!(has_http_scheme("HTTPS://a"));
        assert!(!has_http_scheme("ftp://a"));
        assert!(!has_http_scheme("//a"));
    }
}
