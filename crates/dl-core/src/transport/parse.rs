//! Parse raw response header lines collected by curl.

use super::HeadInfo;

/// Status code from a status line such as `HTTP/1.1 206 Partial Content`.
pub(crate) fn status_code(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Status of the last response in `lines` (redirects produce several).
pub(crate) fn last_status(lines: &[String]) -> Option<u32> {
    lines.iter().rev().find_map(|l| status_code(l))
}

/// Builds [`HeadInfo`] from the header lines of the final response.
///
/// Lines before the last status line belong to redirects and are ignored.
/// A missing or malformed `Content-Length` is reported as `None`.
pub(crate) fn parse_head_lines(lines: &[String]) -> HeadInfo {
    let start = lines
        .iter()
        .rposition(|l| l.starts_with("HTTP/"))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut info = HeadInfo::default();
    for line in &lines[start..] {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            info.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            info.accept_ranges = Some(value.eq_ignore_ascii_case("bytes"));
        } else if name.eq_ignore_ascii_case("content-disposition") {
            info.content_disposition = Some(value.to_string());
        }
    }
    info
}
