//! Configuration for the survey.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (WMSURVEY_HOME, WMSURVEY_CORPUS, WMSURVEY_RESPONSES)
//! 2. Config file (.wmsurvey/config.yaml)
//! 3. Defaults (~/.wmsurvey, ./Textos.csv)
//!
//! Config file discovery:
//! - Searches current directory and parents for .wmsurvey/config.yaml
//! - Paths in config file are relative to the project root (parent of .wmsurvey/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::Variant;
use crate::domain::{QuestionMode, RowSchema};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Environment variable naming the Sheets token, unless configured otherwise
pub const DEFAULT_TOKEN_ENV: &str = "WMSURVEY_SHEETS_TOKEN";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub survey: Option<SurveyConfig>,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to project root)
    pub home: Option<String>,
    /// Corpus file (relative to project root)
    pub corpus: Option<String>,
    /// Responses file for the file backend (relative to project root)
    pub responses: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyConfig {
    pub mode: Option<QuestionMode>,
    pub sample_size: Option<usize>,
    pub schema: Option<RowSchema>,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<Backend>,
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
    pub token_env: Option<String>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Local CSV file
    #[default]
    File,
    /// Google Sheets
    Sheets,
}

/// Resolved storage settings
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: Backend,
    pub responses_file: PathBuf,
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub token_env: String,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Survey state directory
    pub home: PathBuf,
    /// Corpus file
    pub corpus: PathBuf,
    /// Corpus field delimiter
    pub delimiter: u8,
    /// Question mode, sample size and row layout
    pub variant: Variant,
    /// Where responses go
    pub storage: StorageSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".wmsurvey").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge config file, environment and defaults
fn resolve<E>(config: Option<(&Path, ConfigFile)>, env: E, default_home: PathBuf) -> Result<ResolvedConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let config_file = config.as_ref().map(|(path, _)| path.to_path_buf());

    // Base directory is the parent of .wmsurvey/ (i.e., grandparent of config.yaml)
    let base_dir = config
        .as_ref()
        .and_then(|(path, _)| path.parent())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (paths, survey, storage) = match config {
        Some((_, file)) => (file.paths, file.survey, file.storage),
        None => (PathsConfig::default(), None, None),
    };

    let home = env("WMSURVEY_HOME")
        .map(PathBuf::from)
        .or_else(|| paths.home.as_deref().map(|h| resolve_path(&base_dir, h)))
        .unwrap_or(default_home);

    let corpus = env("WMSURVEY_CORPUS")
        .map(PathBuf::from)
        .or_else(|| paths.corpus.as_deref().map(|c| resolve_path(&base_dir, c)))
        .unwrap_or_else(|| base_dir.join("Textos.csv"));

    let responses_file = env("WMSURVEY_RESPONSES")
        .map(PathBuf::from)
        .or_else(|| paths.responses.as_deref().map(|r| resolve_path(&base_dir, r)))
        .unwrap_or_else(|| home.join("responses.csv"));

    let mode = survey.as_ref().and_then(|s| s.mode).unwrap_or_default();
    let sample_size = survey.as_ref().and_then(|s| s.sample_size).unwrap_or(2);
    if sample_size == 0 {
        anyhow::bail!("survey.sample_size must be at least 1");
    }
    let schema = survey
        .as_ref()
        .and_then(|s| s.schema)
        .unwrap_or_else(|| RowSchema::for_mode(mode));

    let delimiter = survey.as_ref().and_then(|s| s.delimiter).unwrap_or('|');
    if !delimiter.is_ascii() {
        anyhow::bail!("survey.delimiter must be a single ASCII character, got '{}'", delimiter);
    }

    let storage = StorageSettings {
        backend: storage.as_ref().and_then(|s| s.backend).unwrap_or_default(),
        responses_file,
        spreadsheet_id: storage.as_ref().and_then(|s| s.spreadsheet_id.clone()),
        range: storage
            .as_ref()
            .and_then(|s| s.range.clone())
            .unwrap_or_else(|| "A1".to_string()),
        token_env: storage
            .as_ref()
            .and_then(|s| s.token_env.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
    };

    Ok(ResolvedConfig {
        home,
        corpus,
        delimiter: delimiter as u8,
        variant: Variant::new(mode, sample_size).with_schema(schema),
        storage,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".wmsurvey");

    let config = match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    resolve(
        config.as_ref().map(|(path, file)| (path.as_path(), file.clone())),
        |key| std::env::var(key).ok(),
        default_home,
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
