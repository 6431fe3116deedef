//! Configuration loading for embedkit.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/embedkit/config.toml.

use std::fmt;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Which engine loaders the manager may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStrategy {
    /// Native accelerated loader only
    PrimaryOnly,
    /// Portable loader only
    FallbackOnly,
    /// Native when a local model path exists, portable otherwise or on failure
    #[default]
    Auto,
}

impl fmt::Display for LoaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderStrategy::PrimaryOnly => write!(f, "primary_only"),
            LoaderStrategy::FallbackOnly => write!(f, "fallback_only"),
            LoaderStrategy::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for LoaderStrategy {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "primary_only" | "primary" | "native" => Ok(LoaderStrategy::PrimaryOnly),
            "fallback_only" | "fallback" | "portable" => Ok(LoaderStrategy::FallbackOnly),
            "auto" => Ok(LoaderStrategy::Auto),
            other => Err(TypesError::InvalidInput(format!(
                "unknown loader strategy: {other}"
            ))),
        }
    }
}

/// Engine selection and loader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Explicit catalog model id. Takes precedence over auto selection.
    #[serde(default)]
    pub model_id: Option<String>,

    /// Loader strategy
    #[serde(default)]
    pub strategy: LoaderStrategy,

    /// Pick the recommended model for this device when no id is given.
    #[serde(default = "default_true")]
    pub auto_select: bool,

    /// Let the native loader try CUDA/Metal before CPU.
    #[serde(default = "default_true")]
    pub prefer_accelerator: bool,

    /// Native loader availability switch
    #[serde(default = "default_true")]
    pub native_enabled: bool,

    /// Portable loader availability switch
    #[serde(default = "default_true")]
    pub portable_enabled: bool,

    /// Directory for downloaded model files
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Directory holding pre-installed models as `<model_id>/` subdirectories
    #[serde(default)]
    pub local_models_dir: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> String {
    ProjectDirs::from("", "", "embedkit")
        .map(|p| p.cache_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from(".cache/embedkit/models"))
        .to_string_lossy()
        .to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model_id: None,
            strategy: LoaderStrategy::default(),
            auto_select: true,
            prefer_accelerator: true,
            native_enabled: true,
            portable_enabled: true,
            cache_dir: default_cache_dir(),
            local_models_dir: None,
        }
    }
}

/// Search defaults used when callers do not pass explicit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Minimum similarity for a result to be kept (0.0-1.0)
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_limit() -> usize {
    10
}

fn default_min_similarity() -> f32 {
    0.5
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            min_similarity: default_min_similarity(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Search settings
    #[serde(default)]
    pub search: SearchSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            engine: EngineSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/embedkit/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (EMBEDKIT_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "embedkit")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("engine.strategy", LoaderStrategy::default().to_string())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("engine.cache_dir", default_cache_dir())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("search.default_limit", default_limit() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("search.min_similarity", default_min_similarity() as f64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: EMBEDKIT_LOG_LEVEL, EMBEDKIT_ENGINE__MODEL_ID, EMBEDKIT_SEARCH__DEFAULT_LIMIT
        builder = builder.add_source(
            Environment::with_prefix("EMBEDKIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.search.default_limit == 0 {
            return Err(TypesError::Config(
                "search.default_limit must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.search.min_similarity) {
            return Err(TypesError::Config(format!(
                "search.min_similarity must be 0.0-1.0, got {}",
                self.search.min_similarity
            )));
        }
        if self.engine.cache_dir.trim().is_empty() {
            return Err(TypesError::Config("engine.cache_dir must be set".to_string()));
        }
        Ok(())
    }

    /// Cache directory with a leading `~/` expanded.
    pub fn expanded_cache_dir(&self) -> PathBuf {
        expand_home(&self.engine.cache_dir)
    }

    /// Local models directory with a leading `~/` expanded.
    pub fn expanded_local_models_dir(&self) -> Option<PathBuf> {
        self.engine.local_models_dir.as_deref().map(expand_home)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
