
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::Path;

use super::{Config, SearchConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Adaptive Research Configuration Setup").bold().cyan());
    eprintln!();

    let config_dir = Config::config_dir().context("Failed to determine config directory")?;
    let mut config = load_existing_config(&config_dir)?;

    eprintln!("{}", style("Search Settings").bold().yellow());
    eprintln!("Configure how many results are returned and how long backends may take.");
    eprintln!();

    configure_search(&mut config.search)?;

    eprintln!();
    eprintln!("{}", style("Search Backends").bold().yellow());

    config.duckduckgo.enabled = Confirm::new()
        .with_prompt("Enable the DuckDuckGo backend?")
        .default(config.duckduckgo.enabled)
        .interact()?;

    config.scraper.enabled = Confirm::new()
        .with_prompt("Enable the result page scraping backend?")
        .default(config.scraper.enabled)
        .interact()?;

    if !config.duckduckgo.enabled && !config.scraper.enabled {
        eprintln!(
            "{}",
            style("⚠ Warning: every backend is disabled, searches will return no results").yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Search Settings:").bold().yellow());
    eprintln!("  Result Count: {}", style(config.search.result_count).cyan());
    eprintln!(
        "  Backend Timeout: {}s",
        style(config.search.timeout_seconds).cyan()
    );
    eprintln!(
        "  Similarity Threshold: {}",
        style(config.search.similarity_threshold).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Backends:").bold().yellow());
    eprintln!(
        "  DuckDuckGo: {} ({})",
        enabled_label(config.duckduckgo.enabled),
        style(&config.duckduckgo.api_url).dim()
    );
    eprintln!(
        "  Page Scraper: {} ({} results per page)",
        enabled_label(config.scraper.enabled),
        config.scraper.max_results_per_page
    );
    for engine in &config.scraper.engines {
        eprintln!("    - {}: {}", engine.name, style(&engine.url_template).dim());
    }

    eprintln!();
    eprintln!("{}", style("Storage:").bold().yellow());
    eprintln!("  Database: {}", style(config.database_path().display()).cyan());
    eprintln!(
        "  Learning State: {}",
        style(config.learning_state_path().display()).cyan()
    );

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

fn enabled_label(enabled: bool) -> console::StyledObject<&'static str> {
    if enabled {
        style("enabled").green()
    } else {
        style("disabled").red()
    }
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config::with_base_dir(config_dir))
        },
        |config| {
            eprintln!("{}", style("Loaded configuration.").green());
            Ok(config)
        },
    )
}

fn configure_search(search: &mut SearchConfig) -> Result<()> {
    let result_count: usize = Input::new()
        .with_prompt("Results returned per search")
        .default(search.result_count)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Result count must be between 1 and 50")
            }
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Backend timeout in seconds")
        .default(search.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=300).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 300 seconds")
            }
        })
        .interact_text()?;

    let threshold: f64 = Input::new()
        .with_prompt("Similar query threshold (0.0 - 1.0)")
        .default(search.similarity_threshold)
        .validate_with(|input: &f64| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Threshold must be between 0.0 and 1.0")
            }
        })
        .interact_text()?;

    search.set_result_count(result_count)?;
    search.set_timeout_seconds(timeout_seconds)?;
    search.set_similarity_threshold(threshold)?;

    Ok(())
}
