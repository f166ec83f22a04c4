// Configuration management module
// TOML settings for the search backends, similarity matcher and storage paths

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DuckDuckGoConfig, HOME_ENV_VAR, ScraperConfig, SearchConfig,
    SearchEngineConfig, WikipediaConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
