//! Deterministic, collision-free instance ids.

use crate::file_type::FileType;
use crate::instance::InstanceSet;

/// Produce an id no instance in `existing` uses yet.
///
/// The base is `<type>-<preset_name>`. A `path` that differs from the type's
/// default adds a suffix taken from its first meaningful segment, so
/// `docs/CLAUDE.md` yields `claude_md-default-docs`. Taken ids are retried
/// with `-1`, `-2`, and so on.
///
/// # Examples
///
/// ```
/// use repofig_core::{FileInstance, FileType, InstanceSet, generate_instance_id};
///
/// let mut existing = InstanceSet::new();
/// existing.insert(FileInstance::with_defaults(FileType::ClaudeMd, "default"));
///
/// let id = generate_instance_id(FileType::ClaudeMd, "default", None, &existing);
/// assert_eq!(id, "claude_md-default-1");
/// ```
pub fn generate_instance_id(
    file_type: FileType,
    preset_name: &str,
    path: Option<&str>,
    existing: &InstanceSet,
) -> String {
    let mut base = format!("{}-{preset_name}", file_type.as_str());

    if let Some(path) = path
        && path != file_type.default_path()
        && let Some(suffix) = path_suffix(path)
    {
        base.push('-');
        base.push_str(&suffix);
    }

    if !existing.contains(&base) {
        return base;
    }

    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or(base)
}

/// First segment that is not `.`, with dots stripped. `None` if that leaves nothing.
fn path_suffix(path: &str) -> Option<String> {
    let segment = path
        .split(['/', '\\'])
        .find(|s| !s.is_empty() && *s != ".")?;
    let cleaned: String = segment.chars().filter(|c| *c != '.').collect();
    (!cleaned.is_empty()).then_some(cleaned)
}
