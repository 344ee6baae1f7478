//! File instances and the per-project collection that owns them.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::file_type::FileType;
use crate::preset::{Preset, Variables, split_id};

/// One file the project wants generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct FileInstance {
    /// Unique within the project.
    #[builder(setter(into))]
    pub id: String,

    #[serde(rename = "type")]
    pub file_type: FileType,

    /// Id of the preset supplying the template.
    #[builder(setter(into))]
    pub preset: String,

    /// Location relative to the repository root.
    #[builder(setter(into))]
    pub path: String,

    #[builder(default = true)]
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overrides for the preset's variables.
    #[builder(default)]
    #[serde(default)]
    pub variables: Variables,
}

fn default_enabled() -> bool {
    true
}

impl FileInstance {
    /// The canonical instance for a preset: `<type>-<name>` at the type's
    /// default path, enabled, without overrides.
    pub fn with_defaults(file_type: FileType, preset_name: &str) -> Self {
        Self::builder()
            .id(format!("{}-{preset_name}", file_type.as_str()))
            .file_type(file_type)
            .preset(Preset::compose_id(file_type, preset_name))
            .path(file_type.default_path())
            .build()
    }

    /// `variables.component_name` when set, otherwise the preset's name part.
    pub fn component_name(&self) -> String {
        match self.variables.get("component_name") {
            Some(toml::Value::String(name)) if !name.is_empty() => name.clone(),
            _ => split_id(&self.preset)
                .map_or(self.preset.as_str(), |(_, name)| name)
                .to_owned(),
        }
    }
}

/// Insertion-ordered, id-keyed instances of one project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceSet {
    items: Vec<FileInstance>,
}

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&FileInstance> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileInstance> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an instance, replacing any existing one with the same id in
    /// place. Returns the replaced instance.
    pub fn insert(&mut self, instance: FileInstance) -> Option<FileInstance> {
        match self.items.iter_mut().find(|i| i.id == instance.id) {
            Some(slot) => Some(std::mem::replace(slot, instance)),
            None => {
                self.items.push(instance);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<FileInstance> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    /// Returns `false` when no instance has this id.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(instance) => {
                instance.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Instances sorted by type then path, optionally filtered.
    pub fn list(&self, file_type: Option<FileType>, enabled_only: bool) -> Vec<&FileInstance> {
        let mut out: Vec<&FileInstance> = self
            .items
            .iter()
            .filter(|i| file_type.is_none_or(|t| i.file_type == t))
            .filter(|i| !enabled_only || i.enabled)
            .collect();
        out.sort_by(|a, b| {
            (a.file_type.as_str(), a.path.as_str()).cmp(&(b.file_type.as_str(), b.path.as_str()))
        });
        out
    }

    /// Instances grouped by type, in insertion order within each group.
    pub fn by_type(&self) -> BTreeMap<FileType, Vec<&FileInstance>> {
        let mut groups: BTreeMap<FileType, Vec<&FileInstance>> = BTreeMap::new();
        for instance in &self.items {
            groups.entry(instance.file_type).or_default().push(instance);
        }
        groups
    }

    /// Number of enabled instances per type.
    pub fn count_by_type(&self) -> BTreeMap<FileType, usize> {
        let mut counts = BTreeMap::new();
        for instance in self.items.iter().filter(|i| i.enabled) {
            *counts.entry(instance.file_type).or_insert(0) += 1;
        }
        counts
    }

    /// Build a set from raw `[[files]]` records.
    ///
    /// A record that does not deserialize, or repeats an earlier id, is
    /// skipped and described in the returned error list.
    pub fn from_records(records: &[toml::Value]) -> (Self, Vec<String>) {
        let mut set = Self::new();
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for record in records {
            let label = record
                .get("id")
                .and_then(toml::Value::as_str)
                .unwrap_or("unknown")
                .to_owned();
            let parsed: Result<FileInstance, toml::de::Error> = record.clone().try_into();
            let message = match parsed {
                Ok(instance) if seen.contains(&instance.id) => {
                    format!("Duplicate instance ID '{label}', keeping the first")
                }
                Ok(instance) => {
                    seen.insert(instance.id.clone());
                    set.items.push(instance);
                    continue;
                }
                Err(e) => format!("Invalid instance data for '{label}': {e}"),
            };
            warn!("{message}");
            errors.push(message);
        }
        (set, errors)
    }

    /// Serialize every instance back to `[[files]]` records.
    pub fn to_records(&self) -> Result<Vec<toml::Value>, toml::ser::Error> {
        self.items.iter().map(toml::Value::try_from).collect()
    }
}

impl<'a> IntoIterator for &'a InstanceSet {
    type Item = &'a FileInstance;
    type IntoIter = std::slice::Iter<'a, FileInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<FileInstance> for InstanceSet {
    /// Later instances replace earlier ones with the same id.
    fn from_iter<I: IntoIterator<Item = FileInstance>>(iter: I) -> Self {
        let mut set = Self::new();
        for instance in iter {
            set.insert(instance);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, file_type: FileType, path: &str) -> FileInstance {
        FileInstance::builder()
            .id(id)
            .file_type(file_type)
            .preset(Preset::compose_id(file_type, "default"))
            .path(path)
            .build()
    }

    #[test]
    fn test_should_build_default_instance() {
        let default = FileInstance::with_defaults(FileType::SettingsJson, "strict");
        assert_eq!(default.id, "settings_json-strict");
        assert_eq!(default.preset, "settings_json:strict");
        assert_eq!(default.path, ".claude/settings.json");
        assert!(default.enabled);
        assert_eq!(default.component_name(), "strict");
    }

    #[test]
    fn test_should_prefer_component_name_variable() {
        let mut inst = instance("commands-default", FileType::Commands, ".claude/commands/");
        inst.variables.insert(
            "component_name".to_owned(),
            toml::Value::String("review".to_owned()),
        );
        assert_eq!(inst.component_name(), "review");
    }

    #[test]
    fn test_should_replace_in_place() {
        let mut set = InstanceSet::new();
        set.insert(instance("a", FileType::ClaudeMd, "A.md"));
        set.insert(instance("b", FileType::ClaudeMd, "B.md"));

        let old = set.insert(instance("a", FileType::ClaudeMd, "C.md"));
        assert_eq!(old.map(|i| i.path), Some("A.md".to_owned()));

        let ids: Vec<_> = set.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(set.get("a").map(|i| i.path.as_str()), Some("C.md"));
    }

    #[test]
    fn test_should_list_sorted_and_filtered() {
        let mut set = InstanceSet::new();
        set.insert(instance("g", FileType::Gitignore, ".gitignore"));
        set.insert(instance("z", FileType::ClaudeMd, "z/CLAUDE.md"));
        set.insert(instance("a", FileType::ClaudeMd, "CLAUDE.md"));
        set.set_enabled("z", false);

        let ids: Vec<_> = set.list(None, false).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "g"]);

        let enabled: Vec<_> = set
            .list(Some(FileType::ClaudeMd), true)
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(enabled, vec!["a"]);

        let counts = set.count_by_type();
        assert_eq!(counts.get(&FileType::ClaudeMd), Some(&1));
        assert_eq!(set.by_type().get(&FileType::ClaudeMd).map(Vec::len), Some(2));
        assert!(!set.set_enabled("missing", true));
    }

    #[test]
    fn test_should_skip_bad_and_duplicate_records() {
        let records: Vec<toml::Value> = toml::from_str::<toml::Table>(
            r#"
[[files]]
id = "claude_md-default"
type = "claude_md"
preset = "claude_md:default"
path = "CLAUDE.md"

[[files]]
id = "broken"
type = "not_a_type"
preset = "x:y"
path = "x"

[[files]]
id = "claude_md-default"
type = "claude_md"
preset = "claude_md:minimal"
path = "other.md"
"#,
        )
        .expect("should parse")
        .remove("files")
        .and_then(|v| v.as_array().cloned())
        .expect("should have files");

        let (set, errors) = InstanceSet::from_records(&records);

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("claude_md-default").map(|i| i.preset.as_str()),
            Some("claude_md:default")
        );
        assert!(set.get("claude_md-default").is_some_and(|i| i.enabled));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Invalid instance data for 'broken'"));
        assert!(errors[1].starts_with("Duplicate instance ID 'claude_md-default'"));
    }

    #[test]
    fn test_should_write_records_with_type_key() {
        let set: InstanceSet = [instance("a", FileType::Hooks, ".claude/hooks/")]
            .into_iter()
            .collect();
        let records = set.to_records().expect("should serialize");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("type").and_then(|v| v.as_str()), Some("hooks"));
        assert_eq!(records[0].get("enabled").and_then(|v| v.as_bool()), Some(true));
    }
}
