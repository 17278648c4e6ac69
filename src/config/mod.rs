//! Configuration management.
//!
//! Configuration is read from a TOML file and overridden by environment
//! variables prefixed with `FIND_THAT_BOOK`, using `__` between nested keys:
//!
//! ```toml
//! [open_library]
//! base_url = "https://openlibrary.org"
//! search_limit = 10
//!
//! [gemini]
//! model = "gemini-2.5-flash"
//! temperature = 0.2
//!
//! [search]
//! max_results = 5
//! title_only_fallback = true
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```
//!
//! `FIND_THAT_BOOK_SEARCH__MAX_RESULTS=3` overrides `search.max_results`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "FIND_THAT_BOOK";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub open_library: OpenLibraryConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Open Library client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenLibraryConfig {
    pub base_url: String,

    /// Host serving cover images
    pub covers_url: String,

    /// Maximum docs requested per search
    pub search_limit: usize,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenLibraryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openlibrary.org".to_string(),
            covers_url: "https://covers.openlibrary.org".to_string(),
            search_limit: 10,
            timeout_secs: 30,
        }
    }
}

/// Gemini client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; falls back to `GEMINI_API_KEY`
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    pub temperature: Option<f32>,

    pub top_p: Option<f32>,

    pub top_k: Option<u32>,

    pub max_output_tokens: Option<u32>,

    pub seed: Option<i64>,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: None,
            top_p: None,
            top_k: None,
            max_output_tokens: None,
            seed: None,
            timeout_secs: 30,
        }
    }
}

/// Search pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum candidates returned per search
    pub max_results: usize,

    /// Rank a title match whose requested author is missing as a fallback
    pub title_only_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            title_only_fallback: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,

    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Fill the Gemini key from `GEMINI_API_KEY` when the file left it unset
    pub fn with_env_api_key(mut self) -> Self {
        if self.gemini.api_key.as_deref().map_or(true, str::is_empty) {
            self.gemini.api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }
        self
    }

    /// Render as TOML with the API key redacted
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.gemini.api_key.is_some() {
            shown.gemini.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize::<Config>()?.with_env_api_key())
}

/// Get the configuration from environment variables and defaults
pub fn get_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder().add_source(environment()).build()?;

    Ok(settings.try_deserialize::<Config>()?.with_env_api_key())
}

/// Locate a configuration file in the default locations
///
/// Checks `./find-that-book.toml`, then `<config_dir>/find-that-book/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("find-that-book.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("find-that-book").join("config.toml"))
        .filter(|path| path.is_file())
}
