//! Library presets compiled into the binary.

use crate::file_type::FileType;
use crate::preset::{Preset, PresetTier, Variables};

struct BuiltinEntry {
    file_type: FileType,
    name: &'static str,
    display: &'static str,
    description: &'static str,
    tags: &'static [&'static str],
    variables: &'static [(&'static str, &'static str)],
    content: &'static str,
}

const CATALOG: &[BuiltinEntry] = &[
    BuiltinEntry {
        file_type: FileType::ClaudeMd,
        name: "default",
        display: "Default",
        description: "Standard CLAUDE.md instructions file",
        tags: &["standard", "general"],
        variables: &[
            ("project_name", "Project"),
            ("description", ""),
            ("build_command", "make build"),
            ("test_command", "make test"),
        ],
        content: include_str!("../library/claude_md/default.md"),
    },
    BuiltinEntry {
        file_type: FileType::ClaudeMd,
        name: "minimal",
        display: "Minimal",
        description: "Minimal CLAUDE.md instructions file",
        tags: &["minimal", "simple"],
        variables: &[("project_name", "Project")],
        content: include_str!("../library/claude_md/minimal.md"),
    },
    BuiltinEntry {
        file_type: FileType::ClaudeMd,
        name: "backend",
        display: "Backend Focused",
        description: "Backend development focused instructions",
        tags: &["backend", "api"],
        variables: &[
            ("project_name", "Project"),
            ("language", "unspecified"),
            ("database", "unspecified"),
            ("test_command", "make test"),
        ],
        content: include_str!("../library/claude_md/backend.md"),
    },
    BuiltinEntry {
        file_type: FileType::ClaudeMd,
        name: "frontend",
        display: "Frontend Focused",
        description: "Frontend development focused instructions",
        tags: &["frontend", "ui"],
        variables: &[
            ("project_name", "Project"),
            ("framework", "unspecified"),
            ("package_manager", "npm"),
        ],
        content: include_str!("../library/claude_md/frontend.md"),
    },
    BuiltinEntry {
        file_type: FileType::SettingsJson,
        name: "default",
        display: "Default",
        description: "Standard team settings",
        tags: &["standard", "team"],
        variables: &[],
        content: include_str!("../library/settings_json/default.json"),
    },
    BuiltinEntry {
        file_type: FileType::SettingsJson,
        name: "strict",
        display: "Strict",
        description: "Strict permissions and validation",
        tags: &["strict", "secure"],
        variables: &[],
        content: include_str!("../library/settings_json/strict.json"),
    },
    BuiltinEntry {
        file_type: FileType::SettingsLocalJson,
        name: "default",
        display: "Default",
        description: "Personal project settings",
        tags: &["personal", "local"],
        variables: &[],
        content: include_str!("../library/settings_local_json/default.json"),
    },
    BuiltinEntry {
        file_type: FileType::Gitignore,
        name: "default",
        display: "Default",
        description: "Default gitignore entries",
        tags: &["default", "standard"],
        variables: &[],
        content: include_str!("../library/gitignore/default.txt"),
    },
    BuiltinEntry {
        file_type: FileType::Gitignore,
        name: "standard",
        display: "Standard",
        description: "Standard gitignore entries",
        tags: &["standard"],
        variables: &[],
        content: include_str!("../library/gitignore/standard.txt"),
    },
    BuiltinEntry {
        file_type: FileType::Gitignore,
        name: "python",
        display: "Python",
        description: "Python-specific gitignore patterns",
        tags: &["python", "language"],
        variables: &[],
        content: include_str!("../library/gitignore/python.txt"),
    },
    BuiltinEntry {
        file_type: FileType::Commands,
        name: "default",
        display: "Default",
        description: "Standard slash command examples",
        tags: &["standard", "examples"],
        variables: &[],
        content: include_str!("../library/commands/example.md"),
    },
    BuiltinEntry {
        file_type: FileType::Agents,
        name: "default",
        display: "Default",
        description: "Standard sub-agent examples",
        tags: &["standard", "examples"],
        variables: &[],
        content: include_str!("../library/agents/example.md"),
    },
    BuiltinEntry {
        file_type: FileType::Hooks,
        name: "default",
        display: "Default",
        description: "Standard hook examples",
        tags: &["standard", "examples"],
        variables: &[],
        content: include_str!("../library/hooks/example.py"),
    },
    BuiltinEntry {
        file_type: FileType::OutputStyles,
        name: "default",
        display: "Default",
        description: "Standard output style examples",
        tags: &["standard", "examples"],
        variables: &[],
        content: include_str!("../library/output_styles/example.md"),
    },
    BuiltinEntry {
        file_type: FileType::Statusline,
        name: "default",
        display: "Default",
        description: "Standard statusline script",
        tags: &["standard"],
        variables: &[],
        content: include_str!("../library/statusline/default.sh"),
    },
    BuiltinEntry {
        file_type: FileType::Mcp,
        name: "default",
        display: "Default",
        description: "Standard MCP server examples",
        tags: &["standard", "examples"],
        variables: &[],
        content: include_str!("../library/mcp/config.json"),
    },
];

/// Every packaged preset, tagged with the Library tier.
pub(crate) fn builtin_presets() -> Vec<Preset> {
    CATALOG
        .iter()
        .map(|entry| {
            let variables: Variables = entry
                .variables
                .iter()
                .map(|(k, v)| ((*k).to_owned(), toml::Value::String((*v).to_owned())))
                .collect();
            Preset::builder()
                .id(Preset::compose_id(entry.file_type, entry.name))
                .file_type(entry.file_type)
                .name(entry.display)
                .description(entry.description)
                .source_tier(PresetTier::Library)
                .variables(variables)
                .tags(entry.tags.iter().map(|t| (*t).to_owned()).collect())
                .build()
        })
        .collect()
}

/// Packaged template text for a library preset id.
pub(crate) fn builtin_content(id: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|entry| {
            id.strip_prefix(entry.file_type.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                == Some(entry.name)
        })
        .map(|entry| entry.content)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_should_ship_sixteen_valid_presets() {
        let presets = builtin_presets();
        assert_eq!(presets.len(), 16);

        let ids: HashSet<_> = presets.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), presets.len(), "ids must be unique");

        for preset in &presets {
            assert!(preset.check_identity().is_ok(), "{}", preset.id);
            assert_eq!(preset.source_tier, PresetTier::Library);
        }
    }

    #[test]
    fn test_should_cover_every_file_type() {
        let presets = builtin_presets();
        for file_type in FileType::ALL {
            assert!(
                presets.iter().any(|p| p.file_type == file_type),
                "no library preset for {file_type}"
            );
        }
    }

    #[test]
    fn test_should_find_content_by_id() {
        let content = builtin_content("claude_md:default").expect("should have content");
        assert!(content.contains("project_name"));
        assert!(builtin_content("claude_md:nope").is_none());
        assert!(builtin_content("claude_mddefault").is_none());
    }
}
