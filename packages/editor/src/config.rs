use serde::{Deserialize, Serialize};

use crate::errors::EditorError;

/// Unit used when extending a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionUnit {
    /// A user-perceived character (grapheme cluster).
    #[default]
    Character,
    /// A single Unicode scalar value.
    CodePoint,
    Word,
}

/// Editor behavior settings, usually the `editor` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo steps (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_max_levels: usize,

    /// Merge the blocks at both ends when deleting across them
    #[serde(default)]
    pub merge_blocks_on_delete: bool,

    #[serde(default)]
    pub selection_unit: SelectionUnit,
}

fn default_undo_levels() -> usize {
    100
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_max_levels: default_undo_levels(),
            merge_blocks_on_delete: false,
            selection_unit: SelectionUnit::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(|err| EditorError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = EditorConfig::from_json(r#"{ "undoMaxLevels": 5, "selectionUnit": "word" }"#).unwrap();
        assert_eq!(config.undo_max_levels, 5);
        assert!(!config.merge_blocks_on_delete);
        assert_eq!(config.selection_unit, SelectionUnit::Word);
    }

    #[test]
    fn test_defaults() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.undo_max_levels, 100);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "selectionUnit": "line" }"#),
            Err(EditorError::Config(_))
        ));
    }
}
