//! TOML configuration parsing and validation.
//!
//! ```toml
//! [registry]
//! root = "./docs"
//! exclude_globs = ["drafts/**"]
//!
//! [chunking]
//! size = 1000
//! overlap = 100
//!
//! [watch]
//! debounce_ms = 500
//!
//! [store]
//! path = "./data/docwatch.sqlite"
//! request_size = 32768
//!
//! [log]
//! filter = "info"
//! file = "./data/docwatch.log"
//! ```
//!
//! Only `[registry].root` and `[store].path` are required; every other
//! value has a default. [`load_config`] rejects chunking and size values
//! the pipeline cannot work with.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub registry: RegistryConfig,
    #[serde(default)]
    pub readers: ReadersConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Directory tree mirrored into the index. Created if missing.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_exclude_globs() -> Vec<String> {
    vec!["**/.git/**".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReadersConfig {
    /// Extensions (without dot) handled by the plain-text reader.
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    /// Enable the PDF / DOCX / ODT / XML reader.
    #[serde(default = "default_true")]
    pub documents: bool,
}

impl Default for ReadersConfig {
    fn default() -> Self {
        Self {
            text_extensions: default_text_extensions(),
            documents: true,
        }
    }
}

fn default_text_extensions() -> Vec<String> {
    ["txt", "md", "markdown", "rst"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window length in characters.
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    /// Characters shared by consecutive windows.
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Quiet period before a burst of changes to one path is handled.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// SQLite database file holding the chunk index.
    pub path: PathBuf,
    /// Exclusive upper bound, in bytes, of chunk text per upload call.
    #[serde(default = "default_request_size")]
    pub request_size: usize,
}

fn default_request_size() -> usize {
    32 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Also append log lines to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Config rooted at `root` with an index at `db_path` and defaults elsewhere.
    pub fn minimal(root: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            registry: RegistryConfig {
                root: root.into(),
                include_globs: default_include_globs(),
                exclude_globs: default_exclude_globs(),
                follow_symlinks: false,
            },
            readers: ReadersConfig::default(),
            chunking: ChunkingConfig::default(),
            watch: WatchConfig::default(),
            store: StoreConfig {
                path: db_path.into(),
                request_size: default_request_size(),
            },
            log: LogConfig::default(),
        }
    }

    /// Check values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            anyhow::bail!("chunking.size must be > 0");
        }
        if self.chunking.overlap >= self.chunking.size {
            anyhow::bail!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                self.chunking.overlap,
                self.chunking.size
            );
        }
        if self.store.request_size == 0 {
            anyhow::bail!("store.request_size must be > 0");
        }
        if self.watch.debounce_ms == 0 {
            anyhow::bail!("watch.debounce_ms must be > 0");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let file = write_config(
            r#"
            [registry]
            root = "./docs"

            [store]
            path = "./data/index.sqlite"
            "#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.registry.root, PathBuf::from("./docs"));
        assert_eq!(cfg.registry.include_globs, vec!["**/*"]);
        assert_eq!(cfg.registry.exclude_globs, vec!["**/.git/**"]);
        assert_eq!(cfg.chunking.size, 1000);
        assert_eq!(cfg.chunking.overlap, 100);
        assert_eq!(cfg.watch.debounce(), Duration::from_millis(500));
        assert_eq!(cfg.store.request_size, 32768);
        assert_eq!(cfg.log.filter, "info");
        assert!(cfg.log.file.is_none());
        assert!(cfg.readers.documents);
        assert!(cfg.readers.text_extensions.contains(&"md".to_string()));
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"
            [registry]
            root = "/srv/docs"
            include_globs = ["**/*.txt"]
            exclude_globs = ["drafts/**"]
            follow_symlinks = true

            [readers]
            text_extensions = ["txt"]
            documents = false

            [chunking]
            size = 300
            overlap = 30

            [watch]
            debounce_ms = 250

            [store]
            path = "/var/lib/docwatch/index.sqlite"
            request_size = 4096

            [log]
            filter = "docwatch=debug"
            file = "/var/log/docwatch.log"
            "#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.registry.exclude_globs, vec!["drafts/**"]);
        assert!(cfg.registry.follow_symlinks);
        assert!(!cfg.readers.documents);
        assert_eq!(cfg.chunking.size, 300);
        assert_eq!(cfg.watch.debounce_ms, 250);
        assert_eq!(cfg.store.request_size, 4096);
        assert_eq!(
            cfg.log.file.as_deref(),
            Some(Path::new("/var/log/docwatch.log"))
        );
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        let file = write_config(
            r#"
            [registry]
            root = "./docs"
            [chunking]
            size = 10
            overlap = 10
            [store]
            path = "./index.sqlite"
            "#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("chunking.overlap"));
    }

    #[test]
    fn test_rejects_zero_request_size() {
        let mut cfg = Config::minimal("./docs", "./index.sqlite");
        cfg.store.request_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_debounce() {
        let mut cfg = Config::minimal("./docs", "./index.sqlite");
        cfg.watch.debounce_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let file = write_config(include_str!("../config/docwatch.example.toml"));
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.registry.root, PathBuf::from("./docs"));
        assert_eq!(cfg.registry.exclude_globs.len(), 2);
        assert_eq!(cfg.store.request_size, 32768);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_config(Path::new("/nonexistent/docwatch.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
