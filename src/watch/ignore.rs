//! Ignore rules for the change watcher.
//!
//! Every rule is one of three closed variants evaluated through a single
//! `matches` interface. The built-in rule that suppresses hidden files and
//! editor droppings is itself a `Predicate` matcher, installed first in
//! every resolved config.

use std::path::{Component, Path, PathBuf};

use regex::Regex;

/// A rule that suppresses change events for matching paths.
#[derive(Debug, Clone)]
pub enum IgnoreMatcher {
    /// Matches one path exactly, or anything beneath it.
    ExactPath(PathBuf),
    /// Matches when the regex finds a match anywhere in the path string.
    Pattern(Regex),
    /// Arbitrary predicate on the full path.
    Predicate(fn(&Path) -> bool),
}

impl IgnoreMatcher {
    /// Test a path against this rule.
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::ExactPath(p) => path == p || path.starts_with(p),
            Self::Pattern(re) => re.is_match(&path.to_string_lossy()),
            Self::Predicate(f) => f(path),
        }
    }

    /// The default rule applied before any user rules.
    pub fn builtin() -> Self {
        Self::Predicate(is_transient_path)
    }

    /// Build a matcher from a config or CLI string.
    ///
    /// Strings containing glob metacharacters (`*`, `?`, `[`) become
    /// patterns matched against any path suffix; everything else is an
    /// exact path, joined to `root` when relative.
    pub fn parse(s: &str, root: &Path) -> Result<Self, regex::Error> {
        if s.contains(['*', '?', '[']) {
            Ok(Self::Pattern(Regex::new(&glob_to_regex(s))?))
        } else {
            let path = Path::new(s);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            Ok(Self::ExactPath(path))
        }
    }
}

/// Check whether any component of `path` is a name the watcher should
/// never report: dotfiles, `#`-prefixed editor locks, names ending in
/// `~` or `__`, and editor temp extensions.
///
/// The bare path `.` is exempt; it is a `CurDir` component, not a name.
pub fn is_transient_path(path: &Path) -> bool {
    for component in path.components() {
        if let Component::Normal(name) = component
            && let Some(name) = name.to_str()
            && is_transient_name(name)
        {
            return true;
        }
    }
    false
}

fn is_transient_name(name: &str) -> bool {
    if name.starts_with('.') || name.starts_with('#') {
        return true;
    }
    if name.ends_with('~') || name.ends_with("__") {
        return true;
    }
    matches!(
        Path::new(name).extension().and_then(|e| e.to_str()),
        Some("bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
    )
}

/// Translate a glob into an anchored regex.
///
/// `*` matches within one path segment, `?` matches a single character,
/// and the whole glob must cover a complete suffix of segments.
fn glob_to_regex(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push_str("(^|/)");
    for c in glob.chars() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    re
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_path_matches_subtree() {
        let m = IgnoreMatcher::ExactPath(PathBuf::from("/site/vendor"));
        assert!(m.matches(Path::new("/site/vendor")));
        assert!(m.matches(Path::new("/site/vendor/lib.js")));
        assert!(!m.matches(Path::new("/site/src/main.js")));
    }

    #[test]
    fn test_pattern_from_glob() {
        let m = IgnoreMatcher::parse("*.min.js", Path::new("/site")).unwrap();
        assert!(m.matches(Path::new("/site/app.min.js")));
        assert!(m.matches(Path::new("/site/js/vendor.min.js")));
        assert!(!m.matches(Path::new("/site/app.js")));
    }

    #[test]
    fn test_glob_star_stays_in_segment() {
        let m = IgnoreMatcher::parse("build/*.css", Path::new("/site")).unwrap();
        assert!(m.matches(Path::new("/site/build/main.css")));
        assert!(!m.matches(Path::new("/site/build/sub/main.css")));
    }

    #[test]
    fn test_parse_relative_path_joins_root() {
        let m = IgnoreMatcher::parse("node_modules", Path::new("/site")).unwrap();
        assert!(m.matches(Path::new("/site/node_modules/pkg/index.js")));
        assert!(!m.matches(Path::new("/other/node_modules")));
    }

    #[test]
    fn test_predicate() {
        fn big_name(path: &Path) -> bool {
            path.file_name().is_some_and(|n| n.len() > 10)
        }
        let m = IgnoreMatcher::Predicate(big_name);
        assert!(m.matches(Path::new("/x/averylongfilename.txt")));
        assert!(!m.matches(Path::new("/x/short.txt")));
    }

    #[test]
    fn test_transient_dotfiles_and_locks() {
        assert!(is_transient_path(Path::new("/site/.git/objects/ab")));
        assert!(is_transient_path(Path::new("/site/.DS_Store")));
        assert!(is_transient_path(Path::new("/site/#index.html#")));
        assert!(is_transient_path(Path::new("/site/index.html~")));
        assert!(is_transient_path(Path::new("/site/cache__")));
        assert!(is_transient_path(Path::new("/site/page.html.swp")));
        assert!(is_transient_path(Path::new("/site/data.bak")));
    }

    #[test]
    fn test_transient_normal_files() {
        assert!(!is_transient_path(Path::new("/site/index.html")));
        assert!(!is_transient_path(Path::new("/site/js/app.js")));
    }

    #[test]
    fn test_bare_dot_is_exempt() {
        assert!(!is_transient_path(Path::new(".")));
        assert!(!is_transient_path(Path::new("./index.html")));
    }
}
