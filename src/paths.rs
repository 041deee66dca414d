//! Repository-relative path handling shared by source analysis, coverage
//! ingestion and git history.

use std::path::{Component, Path, PathBuf};

/// Directories (or files) excluded from processing.
///
/// Entries are repository-relative prefixes such as `./.github`, `deps/` or
/// `sbin`. Matching is component-wise: `src` excludes `src/main.py` but not
/// `src2/main.py`. Entries containing `..` cannot name anything inside the
/// repository and are dropped.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    prefixes: Vec<PathBuf>,
}

impl IgnoreList {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let prefixes = entries
            .iter()
            .map(|entry| Path::new(entry.as_ref()))
            .filter(|path| {
                let escapes = path.components().any(|c| c == Component::ParentDir);
                if escapes {
                    tracing::warn!("Skipping ignore entry outside the repository: {}", path.display());
                }
                !escapes
            })
            .map(normalize)
            .filter(|path| !path.as_os_str().is_empty())
            .collect();

        Self { prefixes }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Returns true when `relative` (a path relative to the repository root)
    /// equals or lies beneath one of the ignored prefixes.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let relative = normalize(relative);
        self.prefixes.iter().any(|prefix| relative.starts_with(prefix))
    }
}

/// Drops `.` components and any leading `/`, keeping the remaining
/// components in order.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// A file path split the way `File` nodes store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Repository-relative directory, empty for the root
    pub dir: String,
    /// File name including extension
    pub name: String,
    /// Extension with its leading dot, empty when there is none
    pub ext: String,
}

impl FileLocation {
    pub fn from_relative(relative: &Path) -> Option<Self> {
        let relative = normalize(relative);
        let name = relative.file_name()?.to_string_lossy().into_owned();
        let dir = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let ext = relative
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Some(Self { dir, name, ext })
    }

    /// Repository-relative path of the file, `/`-separated.
    pub fn relative_path(&self) -> String {
        if self.dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.dir, self.name)
        }
    }
}

/// Name under which a repository is stored: the final component of its path.
pub fn repository_name(path: &Path) -> Option<String> {
    normalize(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_prefixes_are_normalized() {
        let ignore = IgnoreList::new(&["./.github", "deps/", "/sbin", ".", ""]);

        assert!(ignore.is_ignored(Path::new(".github/workflows/ci.yml")));
        assert!(ignore.is_ignored(Path::new("./deps/lib/a.py")));
        assert!(ignore.is_ignored(Path::new("sbin")));
        assert!(!ignore.is_ignored(Path::new("src/main.py")));
    }

    #[test]
    fn ignore_matches_whole_components() {
        let ignore = IgnoreList::new(&["src"]);

        assert!(ignore.is_ignored(Path::new("src/main.py")));
        assert!(!ignore.is_ignored(Path::new("src2/main.py")));
        assert!(!ignore.is_ignored(Path::new("lib/src/main.py")));
    }

    #[test]
    fn entries_with_parent_components_are_dropped() {
        let ignore = IgnoreList::new(&["../vendor", "lib/../vendor", "build"]);

        assert!(!ignore.is_ignored(Path::new("vendor/lib.py")));
        assert!(ignore.is_ignored(Path::new("build/out.py")));

        assert!(IgnoreList::new(&[".."]).is_empty());
    }

    #[test]
    fn empty_ignore_list_keeps_everything() {
        let ignore = IgnoreList::new::<&str>(&[]);

        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(Path::new("anything/at/all.py")));
    }

    #[test]
    fn file_location_splits_directory_name_and_extension() {
        let location = FileLocation::from_relative(Path::new("./pkg/sub/module.py")).unwrap();

        assert_eq!(location.dir, "pkg/sub");
        assert_eq!(location.name, "module.py");
        assert_eq!(location.ext, ".py");
        assert_eq!(location.relative_path(), "pkg/sub/module.py");
    }

    #[test]
    fn file_location_at_root_has_empty_directory() {
        let location = FileLocation::from_relative(Path::new("Makefile")).unwrap();

        assert_eq!(location.dir, "");
        assert_eq!(location.ext, "");
        assert_eq!(location.relative_path(), "Makefile");
    }

    #[test]
    fn repository_name_is_last_component() {
        assert_eq!(
            repository_name(Path::new("/home/dev/projects/graph/")).as_deref(),
            Some("graph")
        );
        assert_eq!(repository_name(Path::new("/")), None);
    }
}
