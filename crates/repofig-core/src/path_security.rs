//! Checks that a user-supplied path stays inside the repository.
//!
//! Two independent rules guard against escapes: a lexical check that rejects
//! any `..` segment (with either separator), and a resolution check that
//! follows symlinks on the existing part of the path and requires the result
//! to remain under the canonical repository root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::file_type::FileType;
use crate::validation::ValidationResult;

const PARENT_REFERENCE_ERROR: &str = "Path cannot contain parent directory references (../)";

/// Validates instance paths relative to one repository root.
#[derive(Debug, Clone, Copy)]
pub struct PathSecurityValidator<'a> {
    repo_root: &'a Path,
}

impl<'a> PathSecurityValidator<'a> {
    pub fn new(repo_root: &'a Path) -> Self {
        Self { repo_root }
    }

    /// Run every path rule against `path` for a file of `file_type`.
    ///
    /// An empty path short-circuits; every other rule runs and contributes
    /// its own message.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use repofig_core::{FileType, PathSecurityValidator};
    ///
    /// let validator = PathSecurityValidator::new(Path::new("."));
    /// let result = validator.validate("../../etc/passwd", FileType::ClaudeMd);
    /// assert!(!result.is_valid());
    /// ```
    pub fn validate(&self, path: &str, file_type: FileType) -> ValidationResult {
        let mut result = ValidationResult::new();

        if path.is_empty() {
            result.add_error("Path cannot be empty");
            return result;
        }

        let absolute = is_absolute_like(path);
        if absolute {
            result.add_error("Path must be relative to repository root");
        }

        if path.split(['/', '\\']).any(|segment| segment == "..") {
            result.add_error(PARENT_REFERENCE_ERROR);
        }

        if file_type.is_directory() && !path.ends_with('/') {
            result.add_warning(format!(
                "Path should end with '/' for directory types. Suggested: '{path}/'"
            ));
        }

        let root = canonical_root(self.repo_root);
        let target = if absolute {
            Path::new(path).is_absolute().then(|| normalize(Path::new(path)))
        } else {
            Some(join_segments(&root, path))
        };
        let resolved = target.map(|t| resolve_existing_prefix(&t));

        match &resolved {
            Some(resolved) if resolved.starts_with(&root) => {}
            _ => {
                debug!(path, root = %root.display(), "path resolves outside repository");
                result.add_error("Path would create file outside repository");
            }
        }

        if let Some(resolved) = resolved
            && resolved.exists()
            && !file_type.append_mode()
        {
            result.add_warning(format!(
                "File already exists at '{path}' and may be overwritten"
            ));
        }

        result
    }
}

/// Platform-absolute, rooted with either separator, or drive-prefixed (`C:`).
fn is_absolute_like(path: &str) -> bool {
    if Path::new(path).is_absolute() || path.starts_with(['/', '\\']) {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

/// Resolved the same way as targets, so a root that does not exist yet
/// still follows symlinks in its existing ancestors.
fn canonical_root(root: &Path) -> PathBuf {
    fs::canonicalize(root).unwrap_or_else(|_| {
        let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        resolve_existing_prefix(&normalize(&absolute))
    })
}

/// Append `relative` to `base`, splitting on both separators and applying
/// `.` and `..` lexically.
fn join_segments(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            let mut out = canonical;
            for name in rest.iter().rev() {
                out.push(name);
            }
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn check(root: &TempDir, path: &str, file_type: FileType) -> ValidationResult {
        PathSecurityValidator::new(root.path()).validate(path, file_type)
    }

    fn has_parent_error(result: &ValidationResult) -> bool {
        result.errors().iter().any(|e| e.contains("parent directory"))
    }

    #[test]
    fn test_should_reject_empty_path_only() {
        let root = TempDir::new().expect("should create temp dir");
        let result = check(&root, "", FileType::Commands);
        assert_eq!(result.errors(), ["Path cannot be empty"]);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_should_accept_plain_relative_path() {
        let root = TempDir::new().expect("should create temp dir");
        let result = check(&root, "docs/CLAUDE.md", FileType::ClaudeMd);
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_should_reject_traversal_once() {
        let root = TempDir::new().expect("should create temp dir");
        let result = check(&root, "../../etc/passwd", FileType::ClaudeMd);

        assert!(!result.is_valid());
        let parent_errors = result
            .errors()
            .iter()
            .filter(|e| e.contains("parent directory"))
            .count();
        assert_eq!(parent_errors, 1);
        assert!(
            result
                .errors()
                .contains(&"Path would create file outside repository".to_owned())
        );
    }

    #[test]
    fn test_should_catch_disguised_traversal() {
        let root = TempDir::new().expect("should create temp dir");
        for path in [
            "foo/../../bar",
            "./././../x",
            "a\\..\\..\\b",
            "docs/..",
            "a/./b/../../..",
        ] {
            let result = check(&root, path, FileType::ClaudeMd);
            assert!(has_parent_error(&result), "{path} was not rejected");
        }
    }

    #[test]
    fn test_should_not_flag_dotted_names() {
        let root = TempDir::new().expect("should create temp dir");
        for path in ["..hidden/file", "a/...", "notes..md", ".claude/settings.json"] {
            let result = check(&root, path, FileType::ClaudeMd);
            assert!(!has_parent_error(&result), "{path} falsely rejected");
        }
    }

    #[test]
    fn test_should_reject_absolute_paths() {
        let root = TempDir::new().expect("should create temp dir");
        for path in ["/etc/passwd", "\\windows\\system32", "C:\\Windows", "c:file"] {
            let result = check(&root, path, FileType::ClaudeMd);
            assert!(
                result
                    .errors()
                    .contains(&"Path must be relative to repository root".to_owned()),
                "{path} accepted as relative"
            );
        }
    }

    #[test]
    fn test_should_warn_on_directory_without_slash() {
        let root = TempDir::new().expect("should create temp dir");
        let result = check(&root, ".claude/commands", FileType::Commands);
        assert!(result.is_valid());
        assert_eq!(
            result.warnings(),
            ["Path should end with '/' for directory types. Suggested: '.claude/commands/'"]
        );
    }

    #[test]
    fn test_should_warn_when_target_exists_unless_appending() {
        let root = TempDir::new().expect("should create temp dir");
        fs::write(root.path().join("CLAUDE.md"), "existing").expect("should write");
        fs::write(root.path().join(".gitignore"), "target/").expect("should write");

        let result = check(&root, "CLAUDE.md", FileType::ClaudeMd);
        assert_eq!(
            result.warnings(),
            ["File already exists at 'CLAUDE.md' and may be overwritten"]
        );

        let result = check(&root, ".gitignore", FileType::Gitignore);
        assert!(!result.has_warnings());
    }

    #[cfg(unix)]
    #[test]
    fn test_should_accept_missing_root_under_symlinked_parent() {
        let real = TempDir::new().expect("should create temp dir");
        let links = TempDir::new().expect("should create temp dir");
        let link = links.path().join("link");
        std::os::unix::fs::symlink(real.path(), &link).expect("should create symlink");
        let root = link.join("newrepo");

        let result = PathSecurityValidator::new(&root).validate("CLAUDE.md", FileType::ClaudeMd);
        assert!(result.is_valid(), "{:?}", result.errors());

        let result = PathSecurityValidator::new(&root).validate("../x", FileType::ClaudeMd);
        assert!(
            result
                .errors()
                .contains(&"Path would create file outside repository".to_owned())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_should_reject_symlink_escape() {
        let outside = TempDir::new().expect("should create temp dir");
        let root = TempDir::new().expect("should create temp dir");
        std::os::unix::fs::symlink(outside.path(), root.path().join("link"))
            .expect("should create symlink");

        let result = check(&root, "link/CLAUDE.md", FileType::ClaudeMd);
        assert!(!has_parent_error(&result));
        assert_eq!(
            result.errors(),
            ["Path would create file outside repository"]
        );
    }
}
