//! The closed set of generated-file kinds and their fixed metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A kind of file repofig knows how to generate.
///
/// Every property of a kind (where it goes by default, whether it is a
/// directory, whether it appends, whether several may coexist) is answered by
/// an exhaustive `match`, so adding a variant forces every table to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    ClaudeMd,
    SettingsJson,
    SettingsLocalJson,
    Gitignore,
    Commands,
    Agents,
    Hooks,
    OutputStyles,
    Statusline,
    Mcp,
}

impl FileType {
    /// All kinds, in catalog order.
    pub const ALL: [FileType; 10] = [
        FileType::ClaudeMd,
        FileType::SettingsJson,
        FileType::SettingsLocalJson,
        FileType::Gitignore,
        FileType::Commands,
        FileType::Agents,
        FileType::Hooks,
        FileType::OutputStyles,
        FileType::Statusline,
        FileType::Mcp,
    ];

    /// Stable string value, used in preset ids and config files.
    pub const fn as_str(self) -> &'static str {
        match self {
            FileType::ClaudeMd => "claude_md",
            FileType::SettingsJson => "settings_json",
            FileType::SettingsLocalJson => "settings_local_json",
            FileType::Gitignore => "gitignore",
            FileType::Commands => "commands",
            FileType::Agents => "agents",
            FileType::Hooks => "hooks",
            FileType::OutputStyles => "output_styles",
            FileType::Statusline => "statusline",
            FileType::Mcp => "mcp",
        }
    }

    /// Human-readable name.
    pub const fn display_name(self) -> &'static str {
        match self {
            FileType::ClaudeMd => "CLAUDE.md",
            FileType::SettingsJson => "settings.json",
            FileType::SettingsLocalJson => "settings.local.json",
            FileType::Gitignore => ".gitignore",
            FileType::Commands => "Slash Commands",
            FileType::Agents => "Sub-Agents",
            FileType::Hooks => "Hooks",
            FileType::OutputStyles => "Output Styles",
            FileType::Statusline => "Status Line",
            FileType::Mcp => "MCP Servers",
        }
    }

    /// Default location relative to the repository root. Directory kinds end in `/`.
    pub const fn default_path(self) -> &'static str {
        match self {
            FileType::ClaudeMd => "CLAUDE.md",
            FileType::SettingsJson => ".claude/settings.json",
            FileType::SettingsLocalJson => ".claude/settings.local.json",
            FileType::Gitignore => ".gitignore",
            FileType::Commands => ".claude/commands/",
            FileType::Agents => ".claude/agents/",
            FileType::Hooks => ".claude/hooks/",
            FileType::OutputStyles => ".claude/output-styles/",
            FileType::Statusline => ".claude/statusline.sh",
            FileType::Mcp => ".claude/mcp/",
        }
    }

    /// Whether the kind generates a directory rather than a single file.
    pub const fn is_directory(self) -> bool {
        matches!(
            self,
            FileType::Commands
                | FileType::Agents
                | FileType::Hooks
                | FileType::OutputStyles
                | FileType::Mcp
        )
    }

    /// Whether generation appends to an existing file instead of replacing it.
    pub const fn append_mode(self) -> bool {
        matches!(self, FileType::Gitignore)
    }

    /// Whether more than one enabled instance may exist in a project.
    pub const fn supports_multiple(self) -> bool {
        !matches!(
            self,
            FileType::SettingsJson | FileType::SettingsLocalJson | FileType::Statusline
        )
    }

    /// Whether users may choose a location other than the default.
    pub const fn path_customizable(self) -> bool {
        matches!(self, FileType::ClaudeMd | FileType::Gitignore)
    }

    /// File name of the template content stored next to a preset declaration.
    pub const fn template_file_name(self) -> &'static str {
        match self {
            FileType::ClaudeMd => "CLAUDE.md",
            FileType::SettingsJson => "settings.json",
            FileType::SettingsLocalJson => "settings.local.json",
            FileType::Gitignore => "entries.txt",
            FileType::Commands | FileType::Agents | FileType::OutputStyles => "example.md",
            FileType::Hooks => "example.py",
            FileType::Statusline => "statusline.sh",
            FileType::Mcp => "config.json",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::InvalidFileType(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_string_values() {
        for file_type in FileType::ALL {
            let parsed: FileType = file_type.as_str().parse().expect("should parse");
            assert_eq!(parsed, file_type);
        }
    }

    #[test]
    fn test_should_reject_unknown_file_type() {
        let err = "readme".parse::<FileType>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileType(s) if s == "readme"));
    }

    #[test]
    fn test_should_mark_directory_kinds_with_trailing_slash() {
        for file_type in FileType::ALL {
            assert_eq!(
                file_type.is_directory(),
                file_type.default_path().ends_with('/'),
                "{file_type} default path disagrees with is_directory",
            );
        }
    }

    #[test]
    fn test_should_limit_single_instance_kinds() {
        let single: Vec<_> = FileType::ALL
            .into_iter()
            .filter(|t| !t.supports_multiple())
            .collect();
        assert_eq!(
            single,
            vec![
                FileType::SettingsJson,
                FileType::SettingsLocalJson,
                FileType::Statusline
            ]
        );
    }

    #[test]
    fn test_should_only_append_gitignore() {
        assert!(FileType::Gitignore.append_mode());
        assert!(!FileType::ClaudeMd.append_mode());
    }

    #[test]
    fn test_should_serialize_as_snake_case() {
        let value = serde_json::to_value(FileType::OutputStyles).expect("should serialize");
        assert_eq!(value, serde_json::json!("output_styles"));
    }
}
