
use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Environment variable that overrides the data directory
pub const HOME_ENV_VAR: &str = "ADAPTIVE_RESEARCH_HOME";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub duckduckgo: DuckDuckGoConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of ranked results handed back to the caller
    pub result_count: usize,
    /// Upper bound for each backend call, in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// A past query only counts as similar above this cosine score
    pub similarity_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_count: 5,
            timeout_seconds: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            similarity_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuckDuckGoConfig {
    pub enabled: bool,
    pub api_url: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.duckduckgo.com/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScraperConfig {
    pub enabled: bool,
    pub max_results_per_page: usize,
    /// Result pages tried in order; the first page that loads wins
    pub engines: Vec<SearchEngineConfig>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results_per_page: 3,
            engines: vec![
                SearchEngineConfig {
                    name: "google".to_string(),
                    url_template: "https://www.google.com/search?q={query}&num={count}"
                        .to_string(),
                    result_selector: "div.g".to_string(),
                    title_selector: "h3, h2".to_string(),
                    snippet_selector: "span, p".to_string(),
                },
                SearchEngineConfig {
                    name: "bing".to_string(),
                    url_template: "https://www.bing.com/search?q={query}&count={count}"
                        .to_string(),
                    result_selector: "li.b_algo, div.b_algo".to_string(),
                    title_selector: "h3, h2".to_string(),
                    snippet_selector: "span, p".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEngineConfig {
    pub name: String,
    /// `{query}` and `{count}` are substituted before the request
    pub url_template: String,
    pub result_selector: String,
    pub title_selector: String,
    pub snippet_selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WikipediaConfig {
    pub api_url: String,
    pub top_k_results: usize,
    pub max_chars: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            top_k_results: 1,
            max_chars: 1000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL: {0} (must be an http or https URL)")]
    InvalidUrl(String),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid result count: {0} (must be between 1 and 50)")]
    InvalidResultCount(usize),
    #[error("Invalid similarity threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidSimilarityThreshold(f64),
    #[error("Invalid user agent (cannot be empty)")]
    InvalidUserAgent,
    #[error("Invalid results per page: {0} (must be between 1 and 20)")]
    InvalidResultsPerPage(usize),
    #[error("Invalid search engine '{0}': {1}")]
    InvalidSearchEngine(String, String),
    #[error("Invalid CSS selector '{0}'")]
    InvalidSelector(String),
    #[error("Invalid Wikipedia result count: {0} (must be between 1 and 10)")]
    InvalidWikipediaResults(usize),
    #[error("Invalid Wikipedia summary length: {0} (must be between 100 and 10000)")]
    InvalidWikipediaChars(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Data directory: `$ADAPTIVE_RESEARCH_HOME`, else `~/.adaptive-research`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }

        dirs::home_dir()
            .map(|home| home.join(".adaptive-research"))
            .or_else(|| dirs::data_dir().map(|data| data.join("adaptive-research")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load the configuration from the default data directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load(config_dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Default settings rooted at `base_dir`
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search.validate()?;
        self.duckduckgo.validate()?;
        self.scraper.validate()?;
        self.wikipedia.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Get the path for the SQLite database holding interactions and search records
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join("agent_learning.db")
    }

    /// Get the path for the learned-state blob
    #[inline]
    pub fn learning_state_path(&self) -> PathBuf {
        self.get_base_dir().join("search_learning.json")
    }

    /// Default file for saved research output
    #[inline]
    pub fn output_file_path(&self) -> PathBuf {
        self.get_base_dir().join("research_output.txt")
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=50).contains(&self.result_count) {
            return Err(ConfigError::InvalidResultCount(self.result_count));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                self.similarity_threshold,
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidUserAgent);
        }

        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=300).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }

    pub fn set_result_count(&mut self, result_count: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&result_count) {
            return Err(ConfigError::InvalidResultCount(result_count));
        }
        self.result_count = result_count;
        Ok(())
    }

    pub fn set_similarity_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(threshold));
        }
        self.similarity_threshold = threshold;
        Ok(())
    }
}

impl DuckDuckGoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.api_url)?;
        Ok(())
    }
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=20).contains(&self.max_results_per_page) {
            return Err(ConfigError::InvalidResultsPerPage(
                self.max_results_per_page,
            ));
        }

        for engine in &self.engines {
            engine.validate()?;
        }

        Ok(())
    }
}

impl SearchEngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidSearchEngine(
                self.name.clone(),
                "name cannot be empty".to_string(),
            ));
        }

        if !self.url_template.contains("{query}") {
            return Err(ConfigError::InvalidSearchEngine(
                self.name.clone(),
                "url_template must contain {query}".to_string(),
            ));
        }

        validate_http_url(&self.render_url("test", 1)).map_err(|_| {
            ConfigError::InvalidSearchEngine(
                self.name.clone(),
                format!("url_template is not a valid URL: {}", self.url_template),
            )
        })?;

        for selector in [
            &self.result_selector,
            &self.title_selector,
            &self.snippet_selector,
        ] {
            Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector(selector.clone()))?;
        }

        Ok(())
    }

    /// Substitute the encoded query and result count into the template
    #[inline]
    pub fn render_url(&self, query: &str, count: usize) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.url_template
            .replace("{query}", &encoded)
            .replace("{count}", &count.to_string())
    }
}

impl WikipediaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.api_url)?;

        if !(1..=10).contains(&self.top_k_results) {
            return Err(ConfigError::InvalidWikipediaResults(self.top_k_results));
        }

        if !(100..=10_000).contains(&self.max_chars) {
            return Err(ConfigError::InvalidWikipediaChars(self.max_chars));
        }

        Ok(())
    }
}

fn validate_http_url(url_str: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(url_str).map_err(|_| ConfigError::InvalidUrl(url_str.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(url_str.to_string()));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(url_str.to_string()));
    }
    Ok(url)
}
