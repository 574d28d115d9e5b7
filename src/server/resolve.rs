//! Request path resolution.
//!
//! Maps an incoming request onto a disposition by re-statting the
//! filesystem on every call. Nothing here is cached; the watcher and the
//! resolver never share state.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tiny_http::Method;

/// What the responder should do for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Serve this file from disk.
    ServeFile(PathBuf),
    /// 301 to the given URL path (directory without trailing slash).
    RedirectToDirectory(String),
    /// Serve the directory's index.html.
    ServeIndexHtml(PathBuf),
    /// Render a listing for this directory.
    ServeDirectoryListing(PathBuf),
    /// Nothing to serve.
    NotFound,
}

/// Decode the path portion of a request URL.
///
/// Strips the query string and percent-decodes. Returns `None` when the
/// decoded bytes are not valid UTF-8.
pub fn request_path(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Resolve a request to a disposition.
///
/// Only GET and HEAD are served. Paths that step outside the root, via
/// `..` components or symlinks, resolve to `NotFound`.
pub fn resolve(root: &Path, method: &Method, url_path: &str) -> Disposition {
    if !matches!(method, Method::Get | Method::Head) {
        return Disposition::NotFound;
    }

    let relative = url_path.trim_start_matches('/');
    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Disposition::NotFound;
    }

    let full = root.join(relative);

    // Symlink escape check. canonicalize also stats, so a missing path
    // falls out here as NotFound.
    let Ok(canonical) = full.canonicalize() else {
        return Disposition::NotFound;
    };
    if !canonical.starts_with(root) {
        return Disposition::NotFound;
    }

    if canonical.is_dir() {
        if !url_path.ends_with('/') {
            return Disposition::RedirectToDirectory(format!("{url_path}/"));
        }
        let index = canonical.join("index.html");
        if index.is_file() {
            return Disposition::ServeIndexHtml(index);
        }
        return Disposition::ServeDirectoryListing(canonical);
    }

    Disposition::ServeFile(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<body>home</body>").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/guide.html"), "<body>g</body>").unwrap();
        fs::create_dir(dir.path().join("bare")).unwrap();
        fs::write(dir.path().join("bare/readme.txt"), "hi").unwrap();
        dir
    }

    fn root(dir: &TempDir) -> PathBuf {
        dir.path().canonicalize().unwrap()
    }

    #[test]
    fn test_request_path_decode() {
        assert_eq!(request_path("/a%20b.html?v=1").unwrap(), "/a b.html");
        assert_eq!(request_path("/plain").unwrap(), "/plain");
        assert!(request_path("/%ff%fe").is_none());
    }

    #[test]
    fn test_resolve_file() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Get, "/style.css"),
            Disposition::ServeFile(root.join("style.css"))
        );
    }

    #[test]
    fn test_resolve_root_serves_index() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Get, "/"),
            Disposition::ServeIndexHtml(root.join("index.html"))
        );
    }

    #[test]
    fn test_resolve_directory_without_slash_redirects() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Get, "/docs"),
            Disposition::RedirectToDirectory("/docs/".into())
        );
    }

    #[test]
    fn test_resolve_directory_without_index_lists() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Get, "/bare/"),
            Disposition::ServeDirectoryListing(root.join("bare"))
        );
    }

    #[test]
    fn test_resolve_missing() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(resolve(&root, &Method::Get, "/nope.html"), Disposition::NotFound);
    }

    #[test]
    fn test_resolve_rejects_parent_components() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Get, "/../etc/passwd"),
            Disposition::NotFound
        );
        assert_eq!(
            resolve(&root, &Method::Get, "/docs/../../outside"),
            Disposition::NotFound
        );
    }

    #[test]
    fn test_resolve_rejects_other_methods() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(resolve(&root, &Method::Post, "/"), Disposition::NotFound);
        assert_eq!(resolve(&root, &Method::Delete, "/style.css"), Disposition::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let dir = site();
        let root = root(&dir);
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("leak.txt"))
            .unwrap();

        assert_eq!(resolve(&root, &Method::Get, "/leak.txt"), Disposition::NotFound);
    }

    #[test]
    fn test_resolve_head_allowed() {
        let dir = site();
        let root = root(&dir);
        assert_eq!(
            resolve(&root, &Method::Head, "/style.css"),
            Disposition::ServeFile(root.join("style.css"))
        );
    }
}
