//! Conversion settings, loadable from RON, TOML, or JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analyser::Concept;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported config format: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Settings
// ===========================================================================

/// Pack format of Minecraft 1.21.4, used when a pack does not declare one.
pub const DEFAULT_PACK_FORMAT: u32 = 61;

/// Settings shared by the pipeline, the action engine, and the CLI.
/// Every field has a default, so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pack format used for version-gated actions. `None` reads it from the
    /// datapack's `pack.mcmeta`.
    pub version: Option<u32>,
    /// Concepts to convert.
    pub concepts: Vec<Concept>,
    /// Root directory of data files inside the pack.
    pub base: String,
    /// Subdirectory of per-element configurator overrides.
    pub configurator_subdir: Option<String>,
    /// Change-log capacity; 0 keeps every entry.
    pub max_log_entries: usize,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            version: Some(DEFAULT_PACK_FORMAT),
            concepts: Concept::ALL.to_vec(),
            base: voxel_core::identifier::DEFAULT_BASE.to_string(),
            configurator_subdir: Some("voxel".to_string()),
            max_log_entries: 0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a [`SessionConfig`] in the format its extension names.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, format).map_err(|detail| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Parse config text; the error is the deserializer's message.
pub fn parse_config(content: &str, format: Format) -> Result<SessionConfig, String> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_formats() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("noext")).is_err());
    }

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.version, Some(61));
        assert_eq!(config.concepts.len(), 4);
        assert_eq!(config.base, "data");
    }

    #[test]
    fn partial_files_fill_defaults() {
        let ron = parse_config("(version: Some(48), concepts: [recipe])", Format::Ron).unwrap();
        assert_eq!(ron.version, Some(48));
        assert_eq!(ron.concepts, vec![Concept::Recipe]);
        assert_eq!(ron.configurator_subdir.as_deref(), Some("voxel"));

        let toml = parse_config("max_log_entries = 10\nconcepts = [\"loot_table\"]", Format::Toml)
            .unwrap();
        assert_eq!(toml.max_log_entries, 10);
        assert_eq!(toml.concepts, vec![Concept::LootTable]);

        let json = parse_config(r#"{"version": null}"#, Format::Json).unwrap();
        assert_eq!(json.version, None);
    }

    #[test]
    fn bad_content_reports_parse_error() {
        let dir = std::env::temp_dir().join(format!("voxel_config_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.toml");
        std::fs::write(&path, "version = \"sixty\"").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
