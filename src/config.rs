//! Storage configuration for reflexion memory
//!
//! Provides TOML-based path configuration with defaults.
//! Location: <root>/.agents/reflexmem.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{MemoryError, Result};

/// File name of the shared causal graph document
pub const CAUSAL_GRAPH_FILE: &str = "causal-graph.json";

/// Shape document for episodes
pub const EPISODE_SCHEMA_FILE: &str = "episode.schema.json";

/// Shape document for the causal graph
pub const CAUSAL_GRAPH_SCHEMA_FILE: &str = "causal-graph.schema.json";

/// Project-local configuration file, relative to the root
pub const CONFIG_FILE: &str = ".agents/reflexmem.toml";

/// Locations of every artifact the engine owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub episodes_dir: PathBuf,
    pub causality_dir: PathBuf,
    pub schemas_dir: PathBuf,
}

impl MemoryConfig {
    /// Standard layout beneath a project root
    pub fn under(root: impl AsRef<Path>) -> Self {
        let memory = root.as_ref().join(".agents").join("memory");
        Self {
            episodes_dir: memory.join("episodes"),
            causality_dir: memory.join("causality"),
            schemas_dir: memory.join("schemas"),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MemoryError::ConfigError(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            MemoryError::ConfigError(format!("Failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Use `<root>/.agents/reflexmem.toml` when present, else the standard layout
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config_path = root.join(CONFIG_FILE);
        if config_path.is_file() {
            Self::load_from(config_path)
        } else {
            Ok(Self::under(root))
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn graph_file(&self) -> PathBuf {
        self.causality_dir.join(CAUSAL_GRAPH_FILE)
    }

    pub fn episode_schema_file(&self) -> PathBuf {
        self.schemas_dir.join(EPISODE_SCHEMA_FILE)
    }

    pub fn graph_schema_file(&self) -> PathBuf {
        self.schemas_dir.join(CAUSAL_GRAPH_SCHEMA_FILE)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let base = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reflexmem");

        Self {
            episodes_dir: base.join("episodes"),
            causality_dir: base.join("causality"),
            schemas_dir: base.join("schemas"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_standard_layout() {
        let config = MemoryConfig::under("/work");
        assert_eq!(config.episodes_dir, PathBuf::from("/work/.agents/memory/episodes"));
        assert_eq!(
            config.graph_file(),
            PathBuf::from("/work/.agents/memory/causality/causal-graph.json")
        );
        assert_eq!(
            config.episode_schema_file(),
            PathBuf::from("/work/.agents/memory/schemas/episode.schema.json")
        );
    }

    #[test]
    fn test_discover_falls_back_without_file() {
        let temp = TempDir::new().unwrap();
        let config = MemoryConfig::discover(temp.path()).unwrap();
        assert_eq!(config, MemoryConfig::under(temp.path()));
    }

    #[test]
    fn test_save_and_discover() {
        let temp = TempDir::new().unwrap();
        let config = MemoryConfig {
            episodes_dir: temp.path().join("eps"),
            causality_dir: temp.path().join("graph"),
            schemas_dir: temp.path().join("shapes"),
        };
        config.save_to(temp.path().join(CONFIG_FILE)).unwrap();

        let loaded = MemoryConfig::discover(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "episodes_dir = [").unwrap();

        let err = MemoryConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, MemoryError::ConfigError(_)));
    }
}
