//! Command catalog supplied by the host tool
//!
//! Commands are listed in a TOML file:
//!
//! ```toml
//! [[commands]]
//! name = "cluster apply"
//! description = "Apply every manifest of the selected environment"
//! ```

use crate::error::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A command the assistant may suggest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub name: String,
    pub description: String,
}

impl CommandRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Text that gets embedded when ranking this command
    pub fn search_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandCatalog {
    #[serde(default)]
    pub commands: Vec<CommandRecord>,
}

impl CommandCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AssistError::Io {
            source: e,
            context: format!("Failed to read command catalog: {}", path.display()),
        })?;
        let catalog: CommandCatalog = toml::from_str(&content)?;
        tracing::debug!(
            "Loaded {} commands from {}",
            catalog.commands.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Load the catalog if one is configured and present, otherwise an empty one
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!(
                    "Command catalog {} not found, suggestions disabled",
                    path.display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn records(&self) -> &[CommandRecord] {
        &self.commands
    }

    /// First `limit` commands, shown when a question cannot be answered
    pub fn frequent(&self, limit: usize) -> &[CommandRecord] {
        &self.commands[..limit.min(self.commands.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_catalog() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("commands.toml");
        std::fs::write(
            &path,
            r#"
[[commands]]
name = "cluster apply"
description = "Apply manifests"

[[commands]]
name = "assistant train"
description = "Train the assistant"
"#,
        )
        .unwrap();

        let catalog = CommandCatalog::load(&path).unwrap();
        assert_eq!(catalog.records().len(), 2);
        assert_eq!(catalog.records()[0].search_text(), "cluster apply Apply manifests");
        assert_eq!(catalog.frequent(1).len(), 1);
        assert_eq!(catalog.frequent(10).len(), 2);
    }

    #[test]
    fn test_optional_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("none.toml");
        assert!(CommandCatalog::load_optional(Some(&missing))
            .unwrap()
            .records()
            .is_empty());
        assert!(CommandCatalog::load_optional(None).unwrap().records().is_empty());
    }
}
