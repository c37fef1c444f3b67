//! Configuration: `~/.tome/config.toml` plus a handful of env overrides.
//!
//! Every section is optional; missing keys fall back to defaults, so an
//! empty (or absent) file is a fully working configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TomeConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8737,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Root directory for markdown import/export.
    pub markdown_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: home_path("knowledge.db"),
            markdown_dir: home_path("markdown"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub api_base: String,
    pub timeout_secs: u64,
    pub cache_dir: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            api_base: "https://api.openai.com/v1".into(),
            timeout_secs: 30,
            cache_dir: home_path("models"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub similarity_threshold: f64,
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            default_limit: 10,
        }
    }
}

/// `~/.tome/`
pub fn default_tome_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".tome")
}

fn home_path(name: &str) -> String {
    default_tome_dir().join(name).to_string_lossy().into_owned()
}

/// `~/.tome/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tome_dir().join("config.toml")
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .expect("home directory must exist")
            .join(rest),
        None => PathBuf::from(path),
    }
}

impl TomeConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                TomeConfig::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 3] = [
            ("TOME_DB", &mut self.storage.db_path),
            ("TOME_MARKDOWN_DIR", &mut self.storage.markdown_dir),
            ("TOME_LOG_LEVEL", &mut self.server.log_level),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_markdown_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.markdown_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TomeConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.port, 8737);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.search.similarity_threshold, 0.6);
        assert!(config.storage.db_path.ends_with("knowledge.db"));
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let config: TomeConfig = toml::from_str(
            r#"
            [server]
            log_level = "debug"

            [storage]
            db_path = "/tmp/test.db"

            [embedding]
            provider = "local"
            model = "all-MiniLM-L6-v2"
            dimensions = 384
            "#,
        )
        .unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.server.port, 8737);
    }

    #[test]
    fn env_vars_win_over_file_values() {
        let mut config = TomeConfig::default();
        std::env::set_var("TOME_DB", "/tmp/override.db");
        std::env::set_var("TOME_MARKDOWN_DIR", "/tmp/md");
        std::env::set_var("TOME_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        std::env::remove_var("TOME_DB");
        std::env::remove_var("TOME_MARKDOWN_DIR");
        std::env::remove_var("TOME_LOG_LEVEL");

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.markdown_dir, "/tmp/md");
        assert_eq!(config.server.log_level, "trace");
    }

    #[test]
    fn tilde_expansion_only_touches_prefix() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert!(!expand_tilde("~/notes").to_string_lossy().contains('~'));
    }
}
