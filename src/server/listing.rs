//! Directory index page.
//!
//! Rendered for directories with no index.html. The page is plain
//! generated HTML and is served as-is, without the reload script.

use std::fs;
use std::path::Path;

use anyhow::Result;
use percent_encoding::utf8_percent_encode;
use tiny_http::Request;

use super::respond::HREF_ESCAPE;
use crate::utils::html;

/// Respond with a listing of `dir` for the request path `url_path`.
pub fn respond_listing(request: Request, dir: &Path, url_path: &str) -> Result<()> {
    let body = render(dir, url_path);
    super::respond::send_html_page(request, body)
}

fn render(dir: &Path, url_path: &str) -> String {
    let mut entries = Vec::new();
    if let Ok(read_dir) = fs::read_dir(dir) {
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push((name, is_dir));
        }
    }
    // Directories first, each group alphabetical
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let title = html::escape(url_path);
    let mut body = String::with_capacity(512);
    body.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    body.push_str(&format!("<title>Index of {title}</title>\n"));
    body.push_str("</head>\n<body>\n");
    body.push_str(&format!("<h1>Index of {title}</h1>\n<ul>\n"));

    if url_path != "/" {
        body.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for (name, is_dir) in entries {
        let suffix = if is_dir { "/" } else { "" };
        let href = utf8_percent_encode(&name, HREF_ESCAPE).to_string();
        let label = html::escape(&name);
        body.push_str(&format!(
            "<li><a href=\"{href}{suffix}\">{label}{suffix}</a></li>\n"
        ));
    }

    body.push_str("</ul>\n</body>\n</html>\n");
    body
}
