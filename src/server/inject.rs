//! Reload script injection for served HTML.
//!
//! Purely textual: the fragment is spliced immediately before the first
//! closing `</body>` tag, falling back to the first `</head>`. Documents
//! with neither tag pass through unmodified.

use crate::embed::RELOAD_SCRIPT;
use crate::utils::mime;

/// Inject the reload client into `content` when `content_type` is HTML.
///
/// Returns the content unchanged for non-HTML types or when no suitable
/// tag is found. Everything outside the splice point is byte-identical.
pub fn maybe_inject(content: Vec<u8>, content_type: &str) -> Vec<u8> {
    if !mime::is_html(content_type) {
        return content;
    }
    inject(content)
}

fn inject(content: Vec<u8>) -> Vec<u8> {
    let Some(pos) = find_tag(&content, b"</body>").or_else(|| find_tag(&content, b"</head>"))
    else {
        return content;
    };

    let mut out = Vec::with_capacity(content.len() + RELOAD_SCRIPT.len());
    out.extend_from_slice(&content[..pos]);
    out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
    out.extend_from_slice(&content[pos..]);
    out
}

/// Byte offset of the first case-insensitive occurrence of `tag`.
fn find_tag(content: &[u8], tag: &[u8]) -> Option<usize> {
    content
        .windows(tag.len())
        .position(|w| w.eq_ignore_ascii_case(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injected(html: &str) -> String {
        String::from_utf8(maybe_inject(html.as_bytes().to_vec(), "text/html")).unwrap()
    }

    #[test]
    fn test_inject_before_first_body_close() {
        let html = "<html><body><p>hi</p></body></html>";
        let out = injected(html);

        let pos = out.find(RELOAD_SCRIPT).unwrap();
        assert_eq!(&out[pos + RELOAD_SCRIPT.len()..], "</body></html>");
        assert_eq!(&out[..pos], "<html><body><p>hi</p>");
    }

    #[test]
    fn test_inject_picks_first_of_two_body_tags() {
        let html = "<body>a</body><body>b</body>";
        let out = injected(html);
        let script_pos = out.find(RELOAD_SCRIPT).unwrap();
        let first_close = out.find("</body>").unwrap();
        assert!(script_pos < first_close + "</body>".len());
        assert_eq!(&out[..script_pos], "<body>a");
    }

    #[test]
    fn test_inject_head_fallback() {
        let html = "<html><head><title>t</title></head></html>";
        let out = injected(html);
        let pos = out.find(RELOAD_SCRIPT).unwrap();
        assert_eq!(&out[..pos], "<html><head><title>t</title>");
    }

    #[test]
    fn test_inject_case_insensitive() {
        let html = "<HTML><BODY>x</BODY></HTML>";
        let out = injected(html);
        assert!(out.contains(RELOAD_SCRIPT));
        assert!(out.ends_with("</BODY></HTML>"));
    }

    #[test]
    fn test_no_tag_passthrough() {
        let html = "<p>fragment without closing tags</p>";
        assert_eq!(injected(html), html);
    }

    #[test]
    fn test_non_html_untouched() {
        let css = b"body { color: red; } /* </body> */".to_vec();
        let out = maybe_inject(css.clone(), "text/css; charset=utf-8");
        assert_eq!(out, css);
    }

    #[test]
    fn test_remainder_byte_identical() {
        let html = "<body>\u{00e9}\u{4e2d}</body>";
        let out = injected(html);
        let pos = out.find(RELOAD_SCRIPT).unwrap();
        let reassembled = format!("{}{}", &out[..pos], &out[pos + RELOAD_SCRIPT.len()..]);
        assert_eq!(reassembled, html);
    }
}
