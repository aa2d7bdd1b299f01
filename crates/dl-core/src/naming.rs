//! Local file name derivation.
//!
//! Precedence: explicit name, `Content-Disposition` filename, last URL path
//! segment, then [`FALLBACK_NAME`]. Whatever wins is sanitized.

use percent_encoding::percent_decode_str;

pub const FALLBACK_NAME: &str = "download.bin";

/// Linux `NAME_MAX`.
const MAX_NAME_BYTES: usize = 255;

/// Picks the on-disk file name for a download.
pub fn derive_file_name(
    explicit: Option<&str>,
    content_disposition: Option<&str>,
    url: &str,
) -> String {
    let candidates = [
        explicit.map(str::to_string),
        content_disposition.and_then(disposition_file_name),
        url_file_name(url),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|raw| sanitize(&raw))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Last non-empty path segment of `url`, percent-decoded. Query and fragment
/// are ignored.
pub fn url_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    match decoded.as_str() {
        "" | "." | ".." => None,
        _ => Some(decoded),
    }
}

/// `filename*=UTF-8''…` wins over `filename=…`.
pub fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                    .map(|(_, rest)| rest);
                if let Some(encoded) = encoded {
                    let decoded = percent_decode_str(encoded.trim_matches('"'))
                        .decode_utf8_lossy()
                        .into_owned();
                    if !decoded.is_empty() {
                        return Some(decoded);
                    }
                }
            }
            "filename" => {
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .map(|v| v.replace("\\\"", "\"").replace("\\\\", "\\"))
                    .unwrap_or_else(|| value.to_string());
                if !unquoted.is_empty() {
                    plain = Some(unquoted);
                }
            }
            _ => {}
        }
    }
    plain
}

/// Makes `name` safe as a single path component.
///
/// Separators, whitespace runs and control characters become one `_`;
/// leading/trailing dots, spaces and underscores are dropped; the result is
/// cut to 255 bytes on a char boundary. `.` and `..` become empty.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_' || c == ' ');
    let mut end = trimmed.len().min(MAX_NAME_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins() {
        assert_eq!(
            derive_file_name(
                Some("mine.iso"),
                Some("attachment; filename=\"server.iso\""),
                "https://example.com/url.iso"
            ),
            "mine.iso"
        );
    }

    #[test]
    fn disposition_beats_url() {
        assert_eq!(
            derive_file_name(
                None,
                Some("attachment; filename=\"real-name.tar.gz\""),
                "https://example.com/download?id=7"
            ),
            "real-name.tar.gz"
        );
    }

    #[test]
    fn url_segment_is_decoded_and_query_dropped() {
        assert_eq!(
            derive_file_name(None, None, "https://cdn.example.com/a/my%20file.zip?token=abc#x"),
            "my_file.zip"
        );
        assert_eq!(
            url_file_name("https://example.com/a/b/debian-12.iso").as_deref(),
            Some("debian-12.iso")
        );
    }

    #[test]
    fn falls_back_when_nothing_usable() {
        assert_eq!(derive_file_name(None, None, "https://example.com/"), FALLBACK_NAME);
        assert_eq!(derive_file_name(None, None, "https://example.com/.."), FALLBACK_NAME);
        assert_eq!(derive_file_name(Some("..."), None, "not a url"), FALLBACK_NAME);
    }

    #[test]
    fn disposition_variants() {
        assert_eq!(
            disposition_file_name("attachment; filename=simple.bin").as_deref(),
            Some("simple.bin")
        );
        assert_eq!(
            disposition_file_name(
                "attachment; filename=\"fallback.bin\"; filename*=UTF-8''caf%C3%A9.txt"
            )
            .as_deref(),
            Some("café.txt")
        );
        assert_eq!(disposition_file_name("inline"), None);
    }

    #[test]
    fn sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize("  ..  file.txt  ..  "), "file.txt");
        assert_eq!(sanitize("file\x00\x01name.txt"), "file_name.txt");
        assert_eq!(sanitize(".."), "");
    }

    #[test]
    fn sanitize_limits_length_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize(&long);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
