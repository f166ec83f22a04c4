use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::learning::LearningService;
use crate::mcp::build_research_server;
use crate::output::save_research_output;
use crate::wikipedia::WikipediaClient;

/// Open the learning service from the configuration on disk
pub async fn open_service() -> Result<LearningService> {
    let config = Config::load_default().context("Failed to load configuration")?;
    LearningService::open(config)
        .await
        .context("Failed to open learning store")
}

fn spinner(message: &str) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(template);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Run one search and print the ranked results
pub async fn search(query: &str, count: Option<usize>) -> Result<()> {
    let service = open_service().await?;
    let count = count.unwrap_or(service.config().search.result_count).max(1);

    let bar = spinner(&format!("Searching for '{}'", query));
    let report = service.search(query, count).await;
    bar.finish_and_clear();

    if let Some(similar) = &report.similar_query {
        println!(
            "{} similar to a past query: \"{}\" ({:.2})",
            style("Note:").cyan(),
            similar.query,
            similar.score
        );
        println!();
    }

    println!("{}", report.formatted);

    for failure in report.backends.iter().filter(|backend| !backend.is_success()) {
        if let Err(e) = &failure.outcome {
            eprintln!(
                "{} {} unavailable: {}",
                style("⚠").yellow(),
                failure.backend,
                e
            );
        }
    }
    if let Some(learning_error) = &report.learning_error {
        eprintln!(
            "{} results were not fully recorded: {}",
            style("⚠").yellow(),
            learning_error
        );
    }

    service.close().await?;
    Ok(())
}

/// Print a Wikipedia summary for `query`
pub async fn wiki(query: &str) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let client = WikipediaClient::from_config(&config);

    let bar = spinner(&format!("Looking up '{}'", query));
    let text = client.lookup(query).await;
    bar.finish_and_clear();

    println!("{}", text);
    Ok(())
}

/// Append research output to a file in the data directory
pub async fn save(data: &str, file: Option<&str>) -> Result<()> {
    let service = open_service().await?;
    let message = save_research_output(&service, data, file).await?;
    println!("{}", message);
    service.close().await?;
    Ok(())
}

/// Record the outcome of a completed request
pub async fn record(query: &str, response: &str, success: bool) -> Result<()> {
    let service = open_service().await?;
    let record = service.record_interaction(query, response, success).await?;
    println!(
        "Recorded interaction {} (success rating {:.2})",
        record.id, record.success_rating
    );
    service.close().await?;
    Ok(())
}

/// Print the learning summary
pub async fn analyze() -> Result<()> {
    let service = open_service().await?;
    println!("{}", service.analytics_summary().await?);
    service.close().await?;
    Ok(())
}

/// Print the learning detail dump
pub async fn view() -> Result<()> {
    let service = open_service().await?;
    println!("{}", service.analytics_detail().await);
    service.close().await?;
    Ok(())
}

/// Serve the research tools over stdio until EOF or Ctrl+C
pub async fn serve_mcp() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let wikipedia = Arc::new(WikipediaClient::from_config(&config));
    let service = Arc::new(
        LearningService::open(config)
            .await
            .context("Failed to open learning store")?,
    );

    let server = build_research_server(&service, &wikipedia)
        .await
        .context("Failed to start MCP server")?;
    info!("MCP server initialized with tools: {:?}", server.tool_names().await);

    // stdout carries the protocol; status messages go to stderr
    eprintln!("Starting MCP server on stdio transport. Press Ctrl+C to stop.");

    tokio::select! {
        result = server.serve_stdio() => {
            if let Err(e) = result {
                error!("MCP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Received interrupt signal, shutting down...");
        }
    }

    service.close().await?;
    eprintln!("Shutdown complete");
    Ok(())
}

/// Interactive loop: every line is searched and recorded, except the
/// `analyze`, `view` and `exit` commands
pub async fn repl() -> Result<()> {
    let service = open_service().await?;
    let count = service.config().search.result_count;

    println!("{}", style("Adaptive research assistant").bold());
    println!("Type 'analyze' for learning statistics, 'view' for learning data, 'exit' to quit.");

    loop {
        println!();
        let line: String = Input::new()
            .with_prompt("What can I help you research?")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "analyze" => match service.analytics_summary().await {
                Ok(summary) => println!("{}", summary),
                Err(e) => eprintln!("Failed to analyze learning data: {}", e),
            },
            "view" => println!("{}", service.analytics_detail().await),
            _ => {
                let bar = spinner("Searching");
                let report = service.search(line, count).await;
                bar.finish_and_clear();

                if let Some(similar) = &report.similar_query {
                    println!("Found similar past query: {}", similar.query);
                }
                println!("{}", report.formatted);

                let success = !report.ranked.is_empty();
                if let Err(e) = service
                    .record_interaction(line, &report.formatted, success)
                    .await
                {
                    warn!("Failed to record interaction: {}", e);
                }
            }
        }
    }

    service.close().await?;
    println!("Goodbye!");
    Ok(())
}
