use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";

const INDEX_NAME_ENV: &str = "DOCCHAT_INDEX_NAME";
const MODEL_ENV: &str = "DOCCHAT_MODEL";
const TOP_N_ENV: &str = "DOCCHAT_TOP_N";
const LOG_ENV: &str = "DOCCHAT_LOG";

pub const DEFAULT_INDEX_NAME: &str = "qa-chat-index";
pub const DEFAULT_DIMENSION: usize = 1536;
pub const DEFAULT_METRIC: &str = "cosine";
pub const DEFAULT_CLOUD: &str = "aws";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Optional settings file at `<config_dir>/docchat/config.json`.
///
/// Every field may be omitted; secrets never live here.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub index_name: Option<String>,
    pub dimension: Option<usize>,
    pub metric: Option<String>,
    pub cloud: Option<String>,
    pub region: Option<String>,
    pub model: Option<String>,
    pub top_n: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::new()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docchat").join("config.json"))
    }
}

/// An API credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Parameters for creating the serverless similarity index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

/// Fully resolved runtime settings: secrets from the environment, the rest
/// from environment overrides, then the config file, then defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pinecone_api_key: ApiKey,
    pub groq_api_key: ApiKey,
    pub index: IndexSettings,
    pub model: String,
    pub top_n: usize,
    pub log_filter: String,
}

impl Settings {
    /// Read `.env` (if present), the config file, and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        apply_dotenv(dotenvy::dotenv())?;
        let config = Config::load()?;
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a config file and an environment lookup.
    pub fn resolve<F>(config: Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pinecone_api_key = require(&lookup, PINECONE_API_KEY)?;
        let groq_api_key = require(&lookup, GROQ_API_KEY)?;

        let top_n = match non_blank(&lookup, TOP_N_ENV) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                key: TOP_N_ENV.to_string(),
                value: raw.clone(),
            })?,
            None => config.top_n.unwrap_or(DEFAULT_TOP_N),
        };

        let settings = Self {
            pinecone_api_key: ApiKey::new(pinecone_api_key),
            groq_api_key: ApiKey::new(groq_api_key),
            index: IndexSettings {
                name: non_blank(&lookup, INDEX_NAME_ENV)
                    .or(config.index_name)
                    .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
                dimension: config.dimension.unwrap_or(DEFAULT_DIMENSION),
                metric: config.metric.unwrap_or_else(|| DEFAULT_METRIC.to_string()),
                cloud: config.cloud.unwrap_or_else(|| DEFAULT_CLOUD.to_string()),
                region: config.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            },
            model: non_blank(&lookup, MODEL_ENV)
                .or(config.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            top_n,
            log_filter: non_blank(&lookup, LOG_ENV)
                .or(config.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be greater than 0".to_string()));
        }
        if self.index.dimension == 0 {
            return Err(ConfigError::Invalid("dimension must be greater than 0".to_string()));
        }
        if self.index.name.trim().is_empty() {
            return Err(ConfigError::Invalid("index name is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model name is required".to_string()));
        }
        Ok(())
    }
}

/// A missing `.env` file is fine since real env vars still apply. A file
/// that exists but cannot be read or parsed is reported.
fn apply_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => {
            debug!("no .env file");
            Ok(())
        }
        Err(err) => Err(ConfigError::DotEnv(err)),
    }
}

fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn require<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(lookup, key).ok_or_else(|| ConfigError::MissingEnv {
        key: key.to_string(),
    })
}
