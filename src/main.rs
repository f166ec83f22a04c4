use adaptive_research::Result;
use adaptive_research::commands::{analyze, record, repl, save, search, serve_mcp, view, wiki};
use adaptive_research::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "adaptive-research")]
#[command(about = "A research assistant whose web search learns from every query")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure search backends and learning settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Search the web and learn from the results
    Search {
        query: String,
        /// Number of results to show (default from configuration)
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },
    /// Look up a topic on Wikipedia
    Wiki { query: String },
    /// Append research output to a text file
    Save {
        data: String,
        /// File name inside the data directory
        #[arg(long)]
        file: Option<String>,
    },
    /// Record the outcome of a completed request
    Record {
        query: String,
        response: String,
        /// Mark the interaction as unsuccessful
        #[arg(long)]
        failed: bool,
    },
    /// Show learning statistics
    Analyze,
    /// Show recent learning data
    View,
    /// Start MCP server on stdio
    Serve,
    /// Interactive research session
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Search { query, count } => {
            search(&query, count).await?;
        }
        Commands::Wiki { query } => {
            wiki(&query).await?;
        }
        Commands::Save { data, file } => {
            save(&data, file.as_deref()).await?;
        }
        Commands::Record {
            query,
            response,
            failed,
        } => {
            record(&query, &response, !failed).await?;
        }
        Commands::Analyze => {
            analyze().await?;
        }
        Commands::View => {
            view().await?;
        }
        Commands::Serve => {
            serve_mcp().await?;
        }
        Commands::Repl => {
            repl().await?;
        }
    }

    Ok(())
}
