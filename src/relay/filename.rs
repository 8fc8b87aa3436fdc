//! Display file name resolution for relayed downloads.

use crate::config::DEFAULT_FILE_NAME;
use lazy_regex::lazy_regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Url;
use std::path::Path;

/// Match `filename=value`, `filename="value"` or `filename='value'`
static RE_DISPOSITION_FILENAME: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r#"(?i)(?:^|[;\s])filename\s*=\s*(?:"([^"]*)"|'([^']*)'|([^;]*))"#);

/// Extensions appended to names that lack one, keyed by bare MIME type.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", ".pdf"),
    ("application/zip", ".zip"),
    ("application/json", ".json"),
    ("application/xml", ".xml"),
    ("application/gzip", ".gz"),
    ("application/x-tar", ".tar"),
    ("application/x-7z-compressed", ".7z"),
    ("application/vnd.rar", ".rar"),
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/svg+xml", ".svg"),
    ("video/mp4", ".mp4"),
    ("video/webm", ".webm"),
    ("video/quicktime", ".mov"),
    ("audio/mpeg", ".mp3"),
    ("audio/ogg", ".ogg"),
    ("audio/wav", ".wav"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
    ("text/csv", ".csv"),
];

/// Derives a display file name from response headers or the source URL.
///
/// Resolution order:
/// 1. `filename=` parameter of `Content-Disposition` (quotes stripped)
/// 2. last path segment of the URL, or [`DEFAULT_FILE_NAME`] when empty
/// 3. if the name has no extension (a trailing dot counts as none), one is
///    appended from the `Content-Type`, replacing any trailing dots
///
/// An unparsable URL yields [`DEFAULT_FILE_NAME`]. The result is still
/// percent-encoded; decoding is left to the caller.
///
/// # Examples
///
/// ```
/// use file_relay_bot::relay::filename::resolve_file_name;
/// use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
/// assert_eq!(resolve_file_name("https://example.com/api/data", &headers), "data.json");
/// ```
#[must_use]
pub fn resolve_file_name(url: &str, headers: &HeaderMap) -> String {
    let name = match disposition_file_name(headers) {
        Some(name) => name,
        None => {
            let Ok(parsed) = Url::parse(url) else {
                return DEFAULT_FILE_NAME.to_string();
            };
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map_or_else(|| DEFAULT_FILE_NAME.to_string(), ToString::to_string)
        }
    };

    if Path::new(&name).extension().is_some_and(|ext| !ext.is_empty()) {
        return name;
    }

    match content_type_extension(headers) {
        Some(ext) => {
            let stem = name.trim_end_matches('.');
            let stem = if stem.is_empty() { DEFAULT_FILE_NAME } else { stem };
            format!("{stem}{ext}")
        }
        None => name,
    }
}

/// Returns the bare MIME type of a `Content-Type` value (parameters stripped).
#[must_use]
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

fn disposition_file_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let caps = RE_DISPOSITION_FILENAME.captures(value)?;
    let name = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn content_type_extension(headers: &HeaderMap) -> Option<&'static str> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = essence(content_type);
    MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(mime))
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(reqwest::header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn disposition_wins_over_url() {
        let headers = headers(&[(CONTENT_DISPOSITION, r#"attachment; filename="report.pdf""#)]);
        assert_eq!(
            resolve_file_name("https://example.com/download/other.bin", &headers),
            "report.pdf"
        );
    }

    #[test]
    fn unquoted_and_single_quoted_disposition() {
        let unquoted = headers(&[(CONTENT_DISPOSITION, "attachment; filename=notes.txt; size=10")]);
        assert_eq!(resolve_file_name("https://e.com/x", &unquoted), "notes.txt");

        let single = headers(&[(CONTENT_DISPOSITION, "inline; filename='photo.jpeg'")]);
        assert_eq!(resolve_file_name("https://e.com/x", &single), "photo.jpeg");
    }

    #[test]
    fn url_segment_with_mime_extension() {
        let headers = headers(&[(CONTENT_TYPE, "application/json; charset=utf-8")]);
        assert_eq!(
            resolve_file_name("https://example.com/api/data", &headers),
            "data.json"
        );
    }

    #[test]
    fn existing_extension_is_kept() {
        let headers = headers(&[(CONTENT_TYPE, "image/png")]);
        assert_eq!(
            resolve_file_name("https://example.com/archive.tar.gz?x=1", &headers),
            "archive.tar.gz"
        );
    }

    #[test]
    fn unknown_mime_leaves_name_unchanged() {
        let headers = headers(&[(CONTENT_TYPE, "application/x-custom")]);
        assert_eq!(resolve_file_name("https://example.com/blob", &headers), "blob");
    }

    #[test]
    fn empty_segment_falls_back_to_default() {
        assert_eq!(
            resolve_file_name("https://example.com/", &HeaderMap::new()),
            DEFAULT_FILE_NAME
        );
        let png = headers(&[(CONTENT_TYPE, "image/png")]);
        assert_eq!(
            resolve_file_name("https://example.com/files/", &png),
            "downloaded_file.png"
        );
    }

    #[test]
    fn invalid_url_returns_default() {
        let png = headers(&[(CONTENT_TYPE, "image/png")]);
        assert_eq!(resolve_file_name("not a url", &png), DEFAULT_FILE_NAME);
    }

    #[test]
    fn empty_disposition_name_is_ignored() {
        let headers = headers(&[(CONTENT_DISPOSITION, r#"attachment; filename="""#)]);
        assert_eq!(resolve_file_name("https://e.com/clip.mp4", &headers), "clip.mp4");
    }

    #[test]
    fn trailing_dot_counts_as_missing_extension() {
        let pdf = headers(&[(CONTENT_TYPE, "application/pdf")]);
        assert_eq!(resolve_file_name("https://e.com/report.", &pdf), "report.pdf");
        assert_eq!(resolve_file_name("https://e.com/report.", &HeaderMap::new()), "report.");
    }

    #[test]
    fn essence_strips_parameters() {
        assert_eq!(essence("text/html; charset=utf-8"), "text/html");
        assert_eq!(essence("image/png"), "image/png");
    }
}
