//! Directory walking and include/exclude path filtering.
//!
//! Paths are matched relative to the registry root, e.g. `notes/a.txt`.
//! A file must match at least one include glob and no exclude glob.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Include/exclude glob pair applied to root-relative paths.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include_globs: &[String], exclude_globs: &[String]) -> Result<Self> {
        Ok(Self {
            include: Some(build_globset(include_globs)?),
            exclude: build_globset(exclude_globs)?,
        })
    }

    /// Filter that lets every path through.
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: GlobSet::empty(),
        }
    }

    pub fn allows(&self, relative: &str) -> bool {
        if self.exclude.is_match(relative) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(relative),
            None => true,
        }
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

/// A regular file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub absolute: PathBuf,
    pub relative: String,
}

/// Every regular file under `root` that passes `filter`, sorted by relative path.
///
/// Any walk error aborts the walk.
pub fn walk_files(root: &Path, filter: &PathFilter, follow_symlinks: bool) -> Result<Vec<WalkedFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(follow_symlinks) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = relative_path(root, entry.path()) else {
            continue;
        };
        if !filter.allows(&relative) {
            continue;
        }

        files.push(WalkedFile {
            absolute: entry.into_path(),
            relative,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// `path` relative to `root`, or `None` when it lies outside `root` or is
/// `root` itself.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative.to_string_lossy().into_owned())
}

/// Create `root` if missing and return its canonical form.
///
/// A root that exists but is not a directory is an error.
pub fn ensure_dir(root: &Path) -> Result<PathBuf> {
    if root.exists() && !root.is_dir() {
        anyhow::bail!("Registry root is not a directory: {}", root.display());
    }
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create registry root: {}", root.display()))?;
    root.canonicalize()
        .with_context(|| format!("Failed to resolve registry root: {}", root.display()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn globs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_include_and_exclude() {
        let filter = PathFilter::new(&globs(&["**/*.txt"]), &globs(&["drafts/**"])).unwrap();
        assert!(filter.allows("a.txt"));
        assert!(filter.allows("deep/dir/a.txt"));
        assert!(!filter.allows("a.pdf"));
        assert!(!filter.allows("drafts/a.txt"));
    }

    #[test]
    fn test_default_git_exclude_matches_at_root() {
        let filter = PathFilter::new(&globs(&["**/*"]), &globs(&["**/.git/**"])).unwrap();
        assert!(!filter.allows(".git/config"));
        assert!(!filter.allows("sub/.git/HEAD"));
        assert!(filter.allows("sub/gitnotes.txt"));
    }

    #[test]
    fn test_allow_all() {
        assert!(PathFilter::allow_all().allows("anything/at/all.bin"));
    }

    #[test]
    fn test_invalid_glob_is_error() {
        assert!(PathFilter::new(&globs(&["a[b"]), &[]).is_err());
    }

    #[test]
    fn test_walk_sorted_files_only() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("sub/empty")).unwrap();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("sub/a.txt"), "a").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();

        let files = walk_files(root, &PathFilter::allow_all(), false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub/a.txt"]);
        assert_eq!(files[2].absolute, root.join("sub/a.txt"));
    }

    #[test]
    fn test_walk_missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        assert!(walk_files(&missing, &PathFilter::allow_all(), false).is_err());
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/srv/docs");
        assert_eq!(
            relative_path(root, Path::new("/srv/docs/a/b.txt")).as_deref(),
            Some("a/b.txt")
        );
        assert_eq!(relative_path(root, Path::new("/srv/docs")), None);
        assert_eq!(relative_path(root, Path::new("/srv/other/a.txt")), None);
    }

    #[test]
    fn test_ensure_dir_creates_and_canonicalizes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("new/docs");
        let resolved = ensure_dir(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(resolved, root.canonicalize().unwrap());
        // Idempotent.
        assert_eq!(ensure_dir(&root).unwrap(), resolved);
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("docs");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }
}
