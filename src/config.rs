use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default port the board serves on.
pub const DEFAULT_PORT: u16 = 4242;

/// Runtime configuration for the board service.
///
/// Resolution order, later wins: built-in defaults, an optional
/// `cassa.toml`, then environment variables (`CASSA_DB_PATH`, `CASSA_PORT`,
/// `CASSA_MODEL`, `GEMINI_API_KEY`; a `.env` file is honored via dotenvy).
/// CLI flags override on top through the `with_*` setters.
#[derive(Debug, Clone)]
pub struct CassaConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub dev_mode: bool,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

/// The subset of settings `cassa.toml` may carry.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    db_path: Option<PathBuf>,
    port: Option<u16>,
    model: Option<String>,
}

impl Default for CassaConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: DEFAULT_PORT,
            dev_mode: false,
            gemini_api_key: None,
            gemini_model: crate::chat::DEFAULT_MODEL.to_string(),
        }
    }
}

impl CassaConfig {
    /// Load configuration from `cassa.toml` in the current directory (if
    /// present) and the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file_and_env(Path::new("cassa.toml"))
    }

    fn from_file_and_env(file: &Path) -> Result<Self> {
        let file_config = if file.exists() {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            toml::from_str::<FileConfig>(&raw)
                .with_context(|| format!("Invalid config in {}", file.display()))?
        } else {
            FileConfig::default()
        };

        let mut config = Self::default();
        if let Some(db_path) = file_config.db_path {
            config.db_path = db_path;
        }
        if let Some(port) = file_config.port {
            config.port = port;
        }
        if let Some(model) = file_config.model {
            config.gemini_model = model;
        }

        if let Ok(db_path) = std::env::var("CASSA_DB_PATH") {
            config.db_path = PathBuf::from(db_path);
        }
        if let Ok(port) = std::env::var("CASSA_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid CASSA_PORT: {}", port))?;
        }
        if let Ok(model) = std::env::var("CASSA_MODEL") {
            config.gemini_model = model;
        }
        config.gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(config)
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn with_db_path(mut self, db_path: Option<PathBuf>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }
}

/// `<user data dir>/cassa/board.db`, falling back to a local `.cassa/`
/// directory when the platform dir cannot be resolved.
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("cassa"))
        .unwrap_or_else(|| PathBuf::from(".cassa"))
        .join("board.db")
}
