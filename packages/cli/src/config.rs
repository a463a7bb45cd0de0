use compose_editor::{ConditionGroup, MergeField, SessionOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "compose.config.json";

/// Compose configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Merge fields available to documents
    #[serde(default)]
    pub merge_fields: Vec<MergeField>,

    /// Condition groups, in display order
    #[serde(default)]
    pub condition_groups: Vec<ConditionGroup>,

    /// Maximum undo levels for edit sessions
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Pretty-print emitted JSON
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_undo_levels() -> usize {
    100
}

fn default_pretty() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            undo_levels: self.undo_levels,
        }
    }

    /// Serialize a value as JSON, pretty-printed if configured
    pub fn to_json<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge_fields: vec![],
            condition_groups: vec![],
            undo_levels: default_undo_levels(),
            pretty: default_pretty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "mergeFields": [{ "field": "first_name" }, { "field": "mark" }],
            "conditionGroups": [
                { "name": "Grades", "conditions": [{ "name": "Pass" }, { "name": "Fail" }] }
            ],
            "pretty": false
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.merge_fields.len(), 2);
        assert_eq!(config.merge_fields[0].field, "first_name");
        assert_eq!(config.condition_groups[0].conditions[1].name, "Fail");
        assert_eq!(config.undo_levels, 100);
        assert!(!config.pretty);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.merge_fields.is_empty());
        assert!(config.condition_groups.is_empty());
        assert_eq!(config.session_options().undo_levels, 100);
        assert!(config.pretty);
    }

    #[test]
    fn test_compact_json() {
        let config = Config {
            pretty: false,
            ..Config::default()
        };
        assert_eq!(config.to_json(&vec![1, 2]).unwrap(), "[1,2]");
    }
}
