//! HTTP response handlers.

use super::inject::maybe_inject;
use crate::utils::html;
use anyhow::Result;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// Characters escaped in emitted URLs beyond controls.
pub(crate) const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'?')
    .add(b'%');

/// Respond with a static file, injecting the reload script into HTML.
///
/// Read failures turn into a 404, never a 500; in a dev server a file
/// vanishing mid-request is routine.
pub fn respond_file(request: Request, path: &Path, url_path: &str) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    // Range requests (video/audio seeking) bypass injection
    if let Some(range) = get_range_header(&request)
        && !crate::utils::mime::is_html(content_type)
    {
        return respond_range(request, path, content_type, &range, url_path);
    }

    let Ok(body) = fs::read(path) else {
        return respond_not_found(request, url_path);
    };
    let body = maybe_inject(body, content_type);

    send_body(request, 200, content_type, body)
}

/// Handle Range request for media files (video/audio seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
    url_path: &str,
) -> Result<()> {
    use std::io::{Read, Seek, SeekFrom};

    let Ok(file_size) = fs::metadata(path).map(|m| m.len()) else {
        return respond_not_found(request, url_path);
    };
    if file_size == 0 {
        return send_body(request, 200, content_type, Vec::new());
    }

    // Parse "bytes=start-end" format
    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let Some((start, end)) = parse_range(range, file_size) else {
        // Unsatisfiable range, serve the whole file instead
        let Ok(body) = fs::read(path) else {
            return respond_not_found(request, url_path);
        };
        return send_body(request, 200, content_type, body);
    };
    let length = end - start + 1;

    // Stream the requested range without buffering it
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    let content_range = format!("bytes {}-{}/{}", start, end, file_size);
    let response = Response::new(
        StatusCode(206),
        vec![
            make_header("Content-Type", content_type),
            Header::from_bytes("Content-Range", content_range.as_bytes()).unwrap(),
            make_header("Accept-Ranges", "bytes"),
        ],
        reader,
        Some(length as usize),
        None,
    );

    request.respond(response)?;
    Ok(())
}

/// Parse Range header value "start-end" into (start, end) bytes.
///
/// Returns `None` for unsatisfiable ranges (start past end, empty
/// suffix). Callers guarantee `file_size > 0`.
fn parse_range(range: &str, file_size: u64) -> Option<(u64, u64)> {
    let last = file_size - 1;
    let range = range.trim();
    let parts: Vec<&str> = range.split('-').collect();

    let (start, end) = match parts.as_slice() {
        // "0-499" - specific range
        [s, e] if !s.is_empty() && !e.is_empty() => {
            let start: u64 = s.trim().parse().unwrap_or(0);
            let end: u64 = e.trim().parse().unwrap_or(last);
            (start, end.min(last))
        }
        // "0-" - from start to end
        [s, ""] if !s.is_empty() => {
            let start: u64 = s.trim().parse().unwrap_or(0);
            (start, last)
        }
        // "-500" - last 500 bytes
        ["", e] if !e.is_empty() => {
            let suffix: u64 = e.trim().parse().unwrap_or(0);
            (file_size.saturating_sub(suffix), last)
        }
        _ => (0, last),
    };

    if start > end {
        return None;
    }
    Some((start, end))
}

/// Extract Range header from request.
fn get_range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case("range"))
        .map(|h| h.value.to_string())
}

/// Respond with the plain 404 body.
pub fn respond_not_found(request: Request, url_path: &str) -> Result<()> {
    use crate::utils::mime::types::PLAIN;

    if is_head_request(&request) {
        return send_head(request, 404, PLAIN);
    }

    let body = format!("File {url_path} not found.");
    send_body(request, 404, PLAIN, body.into_bytes())
}

/// Respond with a 301 to a directory URL with trailing slash.
///
/// `location` is the decoded path; the header re-encodes it while the
/// body shows it escaped for HTML.
pub fn respond_redirect(request: Request, location: &str) -> Result<()> {
    use crate::utils::mime::types::HTML;

    let encoded = utf8_percent_encode(location, HREF_ESCAPE).to_string();
    let body = format!("Redirecting to {}", html::escape(location));
    let response = Response::from_data(body.into_bytes())
        .with_status_code(StatusCode(301))
        .with_header(Header::from_bytes("Location", encoded.as_bytes()).unwrap())
        .with_header(make_header("Content-Type", HTML));
    request.respond(response)?;
    Ok(())
}

/// Send a generated HTML page (directory listings).
pub(crate) fn send_html_page(request: Request, body: String) -> Result<()> {
    use crate::utils::mime::types::HTML;
    let response = Response::from_string(body).with_header(make_header("Content-Type", HTML));
    request.respond(response)?;
    Ok(())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "public, max-age=0"))
        .with_header(make_header("Accept-Ranges", "bytes"));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "public, max-age=0"))
        .with_header(make_header("Accept-Ranges", "bytes"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("0-499", 1000), Some((0, 499)));
        assert_eq!(parse_range("500-", 1000), Some((500, 999)));
        assert_eq!(parse_range("-200", 1000), Some((800, 999)));
        assert_eq!(parse_range("garbage", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_clamps_end_to_file() {
        assert_eq!(parse_range("0-5000", 1000), Some((0, 999)));
        assert_eq!(parse_range("-5000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_single_byte_file() {
        assert_eq!(parse_range("0-", 1), Some((0, 0)));
        assert_eq!(parse_range("-1", 1), Some((0, 0)));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        // Inverted bounds and past-EOF starts never produce a slice
        assert_eq!(parse_range("500-100", 1000), None);
        assert_eq!(parse_range("2000-", 1000), None);
        assert_eq!(parse_range("1000-2000", 1000), None);
        assert_eq!(parse_range("-0", 1000), None);
    }
}
