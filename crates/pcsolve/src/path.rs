//! Ordered directory lists.
//!
//! [`SearchPath`] serves two purposes: the directories scanned for `.pc`
//! files (first match wins), and the system directory lists whose `-I`/`-L`
//! fragments are suppressed by default.

use std::path::{Path, PathBuf};

/// The separator used in `PKG_CONFIG_PATH`-style environment values.
#[cfg(unix)]
pub const PATH_SEPARATOR: char = ':';

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';

/// An ordered list of directories.
///
/// # Examples
///
/// ```
/// use pcsolve::path::SearchPath;
///
/// let mut sp = SearchPath::from_delimited("/opt/lib/pkgconfig:/opt/share/pkgconfig", ':');
/// sp.add("/usr/lib/pkgconfig/");
/// assert_eq!(sp.len(), 3);
/// assert!(sp.contains("/usr/lib/pkgconfig"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Create an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a search path from a slice of path strings.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut sp = Self::new();
        for p in paths {
            sp.add(p.as_ref());
        }
        sp
    }

    /// Parse a delimited string; empty segments are skipped.
    pub fn from_delimited(s: &str, separator: char) -> Self {
        let mut sp = Self::new();
        sp.add_delimited(s, separator);
        sp
    }

    /// Append a directory. Trailing slashes are stripped; empty paths are ignored.
    pub fn add<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if !path.as_os_str().is_empty() {
            self.dirs.push(normalize_path(&path));
        }
    }

    /// Insert a directory at the front (highest priority).
    pub fn prepend<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if !path.as_os_str().is_empty() {
            self.dirs.insert(0, normalize_path(&path));
        }
    }

    /// Append every segment of a delimited string.
    pub fn add_delimited(&mut self, s: &str, separator: char) {
        for segment in s.split(separator).filter(|p| !p.is_empty()) {
            self.add(segment);
        }
    }

    /// Whether `path` (ignoring trailing slashes) is in the list.
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        let normalized = normalize_path(path.as_ref());
        self.dirs.iter().any(|d| *d == normalized)
    }

    /// Remove repeated entries, keeping the first occurrence.
    pub fn deduplicate(&mut self) {
        let mut seen = Vec::with_capacity(self.dirs.len());
        self.dirs.retain(|dir| {
            if seen.contains(dir) {
                false
            } else {
                seen.push(dir.clone());
                true
            }
        });
    }

    /// The directories, in priority order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Iterate over the directories.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.dirs.iter()
    }

    /// The number of directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Find `{name}.pc` in the first directory that has it.
    pub fn find_pc_file(&self, name: &str) -> Option<PathBuf> {
        let filename = format!("{name}.pc");
        self.dirs
            .iter()
            .map(|dir| dir.join(&filename))
            .find(|candidate| candidate.is_file())
    }
}

impl<'a> IntoIterator for &'a SearchPath {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.dirs.iter()
    }
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .dirs
            .iter()
            .map(|d| d.to_string_lossy())
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string());
        f.write_str(&joined)
    }
}

/// Strip trailing separators, keeping a lone `/`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() && s.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}
