use quire_conversion::ElementDefinition;
use quire_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editing behavior
    #[serde(default)]
    pub editor: EditorConfig,

    /// Extra block elements and the view elements they map to
    #[serde(default)]
    pub elements: Vec<ElementMapping>,

    /// Keep adjacent lists of the same type apart
    #[serde(default = "default_list_separator")]
    pub list_separator: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMapping {
    pub model: String,
    pub view: ElementDefinition,
}

fn default_list_separator() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            elements: vec![],
            list_separator: default_list_separator(),
            log_level: default_log_level(),
        }
    }
}
