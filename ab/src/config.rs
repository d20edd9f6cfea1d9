//! AcrossBoard configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::Difficulty;
use crate::session::HistoryPolicy;

const LOCAL_CONFIG: &str = ".acrossboard.yml";

/// Main AcrossBoard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Where the puzzle and assistant services live
    pub service: ServiceConfig,

    /// Defaults for new puzzles
    pub generation: GenerationConfig,

    /// Clue conversation settings
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {:#}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only `log-level`, ignoring every error
    ///
    /// Runs before logging is initialized, so it stays silent.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::candidates(),
        };

        paths.into_iter().filter(|p| p.exists()).find_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            let value: serde_yaml::Value = serde_yaml::from_str(&content).ok()?;
            value.get("log-level")?.as_str().map(str::to_string)
        })
    }

    /// Project-local file first, then the user config dir
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("acrossboard").join("acrossboard.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply a `--base-url` override
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url {
            self.service.base_url = url.to_string();
        }
        self
    }

    /// Models to offer when the service cannot list its own
    pub fn known_models(&self) -> Vec<String> {
        vec![self.generation.clue_model.clone(), self.chat.model.clone()]
    }
}

/// Service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL shared by both services
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient failures of read-only GETs
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds, doubled per attempt
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Puzzle generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub difficulty: Difficulty,

    /// Number of clues requested per puzzle
    #[serde(rename = "clue-count")]
    pub clue_count: usize,

    /// Model used for clue generation
    #[serde(rename = "clue-model")]
    pub clue_model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            clue_count: 30,
            clue_model: "claude-3-5-haiku-20241022".to_string(),
        }
    }
}

/// Clue conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Model used for hints and deep dives
    pub model: String,

    /// How much transcript is replayed to the assistant
    pub history: HistoryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            history: HistoryPolicy::Transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.service.base_url, "http://localhost:8000");
        assert_eq!(config.service.max_retries, 2);
        assert_eq!(config.generation.clue_count, 30);
        assert_eq!(config.generation.difficulty, Difficulty::Easy);
        assert!(config.generation.clue_model.contains("haiku"));
        assert!(config.chat.model.contains("sonnet"));
        assert_eq!(config.chat.history, HistoryPolicy::Transcript);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

service:
  base-url: https://puzzles.example.com
  timeout-ms: 5000
  max-retries: 0
  retry-backoff-ms: 100

generation:
  difficulty: Hard
  clue-count: 12
  clue-model: claude-haiku

chat:
  model: claude-opus
  history: none
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.service.base_url, "https://puzzles.example.com");
        assert_eq!(config.service.timeout_ms, 5000);
        assert_eq!(config.service.max_retries, 0);
        assert_eq!(config.generation.difficulty, Difficulty::Hard);
        assert_eq!(config.generation.clue_count, 12);
        assert_eq!(config.chat.model, "claude-opus");
        assert_eq!(config.chat.history, HistoryPolicy::None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
generation:
  clue-count: 8
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.generation.clue_count, 8);
        assert_eq!(config.generation.difficulty, Difficulty::Easy);
        assert_eq!(config.service.timeout_ms, 30_000);
        assert_eq!(config.chat.history, HistoryPolicy::Transcript);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "service:\n  base-url: http://10.0.0.5:9000").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.service.base_url, "http://10.0.0.5:9000");
    }

    #[test]
    fn test_load_explicit_path_broken_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "service: [not, a, map").unwrap();

        assert!(Config::load(Some(&file.path().to_path_buf())).is_err());
        assert!(Config::load(Some(&PathBuf::from("/nonexistent/acrossboard.yml"))).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: trace\nchat:\n  history: bogus").unwrap();

        // The rest of the file may be invalid
        assert_eq!(
            Config::load_log_level(Some(&file.path().to_path_buf())).as_deref(),
            Some("trace")
        );
        assert_eq!(Config::load_log_level(Some(&PathBuf::from("/nonexistent.yml"))), None);
    }

    #[test]
    fn test_with_base_url_override() {
        let config = Config::default().with_base_url(Some("http://127.0.0.1:9"));
        assert_eq!(config.service.base_url, "http://127.0.0.1:9");

        let config = Config::default().with_base_url(None);
        assert_eq!(config.service.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_known_models() {
        let config = Config::default();
        assert_eq!(config.known_models().len(), 2);
    }
}
