use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use find_that_book::config::{find_config_file, get_config, load_config, Config};
use find_that_book::models::BookCandidate;
use find_that_book::search::{BookSearchService, SearchError};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Find That Book - turn a messy phrase about a book into a ranked, explained shortlist
#[derive(Parser, Debug)]
#[command(name = "find-that-book")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find books from messy or partial descriptions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Abort the search after this many seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    /// Log format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for a book
    Search {
        /// Free-text description, e.g. "tolkien hobbit illustrated"
        query: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        get_config().context("Failed to read configuration from environment")?
    };

    init_tracing(&cli, &config);

    match cli.command {
        Commands::Search { ref query } => run_search(&cli, &config, query).await,
        Commands::Config => {
            print!("{}", config.to_redacted_toml()?);
            Ok(())
        }
    }
}

fn log_directive(cli: &Cli, config: &Config) -> String {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };
    format!("find_that_book={}", level)
}

fn init_tracing(cli: &Cli, config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| log_directive(cli, config)),
    );

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.logging.format.eq_ignore_ascii_case("json"),
    };

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run_search(cli: &Cli, config: &Config, query: &str) -> Result<()> {
    if config.gemini.api_key.is_none() {
        tracing::warn!("No Gemini API key configured; set GEMINI_API_KEY or [gemini] api_key");
    }

    let service = BookSearchService::from_config(config)?;
    let cancel = CancellationToken::new();

    let watcher = cancel.clone();
    let deadline = Duration::from_secs(cli.timeout);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, cancelling search"),
            _ = tokio::time::sleep(deadline) => tracing::info!("Search timed out after {}s", deadline.as_secs()),
            _ = watcher.cancelled() => return,
        }
        watcher.cancel();
    });

    tracing::info!(query, "Searching");
    let result = service.search(query, &cancel).await;
    // Stop the watcher task
    cancel.cancel();

    match result {
        Ok(books) => output_books(&books, cli.output),
        Err(SearchError::Aborted) => anyhow::bail!("Search aborted (interrupted or timed out)"),
        Err(e) => Err(e.into()),
    }
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn output_books(books: &[BookCandidate], format: OutputFormat) -> Result<()> {
    let format = resolve_format(format);

    if books.is_empty() && format != OutputFormat::Json {
        println!("No matching books found.");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(books)?);
        }
        OutputFormat::Plain => {
            for book in books {
                match book.first_publish_year {
                    Some(year) => println!("{} - {} ({})", book.title, book.author_line(), year),
                    None => println!("{} - {}", book.title, book.author_line()),
                }
                println!("  Match: {} ({})", book.rank, book.author_status);
                println!("  Work: {}", book.external_id);
                if let Some(ref cover) = book.cover_url {
                    println!("  Cover: {}", cover);
                }
                if !book.explanation.is_empty() {
                    println!("  Why: {}", book.explanation);
                }
                println!();
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, ContentArrangement, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Title", "Authors", "Year", "Match", "Why"]);

            for book in books {
                let year = book
                    .first_publish_year
                    .map(|y| y.to_string())
                    .unwrap_or_default();

                table.add_row(vec![
                    Cell::new(truncate(&book.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&book.author_line(), 30)),
                    Cell::new(year),
                    Cell::new(book.rank.to_string()),
                    Cell::new(&book.explanation),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Auto => unreachable!(),
    }

    Ok(())
}
