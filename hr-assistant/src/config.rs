//! Application configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then environment variables. The binary applies its
//! command-line flags on top.
//!
//! ```toml
//! [sheets]
//! spreadsheet = "https://docs.google.com/spreadsheets/d/<id>/edit"
//! malformed_rows = "skip"
//!
//! [chunking]
//! max_chunk_size = 500
//! overlap = 50
//!
//! [embedding]
//! backend = "fastembed"
//! model_name = "all-MiniLM-L6-v2"
//!
//! [retrieval]
//! top_k = 4
//! ```

use crate::error::{AssistantError, Result};
use crate::generation::{DEFAULT_CHAT_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::sheets::LOG_TABLE;
use crate::sheets::google::DEFAULT_SHEETS_BASE_URL;
use hr_assistant_context::{ChunkingConfig, MalformedRowPolicy};
use hr_assistant_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "hr-assistant.toml";

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_SHEETS_TOKEN: &str = "GOOGLE_SHEETS_TOKEN";
pub const ENV_SPREADSHEET: &str = "HR_ASSISTANT_SPREADSHEET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sheets: SheetsConfig,
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    pub embedding: EmbedConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
}

/// Where HR tables are read from and interactions are logged to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Google spreadsheet id or URL
    pub spreadsheet: Option<String>,
    /// OAuth bearer token for the Sheets API
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Directory of `{Table}.csv` files; used instead of Google Sheets when set
    pub workbook_dir: Option<PathBuf>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet: None,
            access_token: None,
            workbook_dir: None,
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            timeout_secs: 30,
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

impl SheetsConfig {
    /// Where interactions are appended, as shown to the user
    pub fn log_target(&self) -> String {
        match &self.workbook_dir {
            Some(dir) => dir.join(format!("{LOG_TABLE}.csv")).display().to_string(),
            None => "Google Sheet".to_string(),
        }
    }

    /// What to check when appending an interaction fails
    pub fn log_hint(&self) -> String {
        match &self.workbook_dir {
            Some(dir) => format!(
                "Make sure {} exists in your workbook.",
                dir.join(format!("{LOG_TABLE}.csv")).display()
            ),
            None => format!("Make sure you have a '{LOG_TABLE}' tab in your sheet."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted vector index
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".hr-assistant-index"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout_secs: 60,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the model with each question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl AppConfig {
    /// Loads `path`, or `hr-assistant.toml` if present, then applies the environment.
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Parses a TOML file without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            AssistantError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Rejects settings that would make every answer useless.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(AssistantError::config(
                "retrieval.top_k must be at least 1, or no context reaches the model",
            ));
        }
        Ok(())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(ENV_OPENAI_API_KEY) {
            self.embedding.api_key = Some(key.clone());
            self.generation.api_key = Some(key);
        }
        if let Some(token) = get(ENV_SHEETS_TOKEN) {
            self.sheets.access_token = Some(token);
        }
        if let Some(spreadsheet) = get(ENV_SPREADSHEET) {
            self.sheets.spreadsheet = Some(spreadsheet);
        }
        self
    }
}
