//! Minerva CLI - Command-line interface for ISBN lookups

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use minerva_core::config::{parse_timeout, ENV_API_KEY, ENV_API_URL, ENV_REQUEST_TIMEOUT};
use minerva_core::{LogSink, Resolver, ResolverConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// Check a timeout in seconds (must be positive), keeping it as given
fn parse_timeout_arg(s: &str) -> Result<String, String> {
    parse_timeout(ENV_REQUEST_TIMEOUT, s)
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "minerva")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (also prints resolver log messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Books API key (overrides MINERVA_BOOKS_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Books API base URL (overrides MINERVA_BOOKS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides MINERVA_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true, value_parser = parse_timeout_arg)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up book information for one or more ISBNs
    Lookup {
        /// ISBNs to look up
        #[arg(required = true)]
        isbns: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up every ISBN listed in a file
    Batch {
        /// File with one ISBN per line
        input: String,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Number of concurrent lookups (must be at least 1)
        #[arg(short, long, default_value = "4", value_parser = parse_jobs)]
        jobs: usize,
    },
}

impl Cli {
    /// Environment configuration with command-line flags taking precedence
    ///
    /// Flags replace the raw variables before anything is parsed, so a bad
    /// environment value that a flag overrides is never looked at.
    fn resolver_config(&self) -> Result<ResolverConfig> {
        let overrides = [
            (ENV_API_URL, &self.api_url),
            (ENV_API_KEY, &self.api_key),
            (ENV_REQUEST_TIMEOUT, &self.timeout),
        ];

        ResolverConfig::from_vars(|name| {
            overrides
                .iter()
                .find(|(var, _)| *var == name)
                .and_then(|(_, value)| (*value).clone())
                .or_else(|| std::env::var(name).ok())
        })
        .context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolver messages reach stderr through the log echo below, not tracing
    let filter = if cli.verbose {
        "minerva_cli=debug"
    } else {
        "minerva_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.resolver_config()?;
    let log_sink = LogSink::new(config.log_capacity);

    let echo = cli.verbose.then(|| {
        let mut messages = Box::pin(log_sink.subscribe());
        tokio::spawn(async move {
            while let Some(message) = messages.next().await {
                eprintln!("{}", message);
            }
        })
    });

    let resolver = Resolver::from_config(config, log_sink)?;

    let result = match cli.command {
        Commands::Lookup { isbns, json } => commands::lookup(&resolver, &isbns, json).await,

        Commands::Batch {
            input,
            output,
            jobs,
        } => commands::batch(&resolver, &input, output.as_deref(), jobs).await,
    };

    // Dropping the resolver closes the log channel; the echo drains and ends
    drop(resolver);
    if let Some(echo) = echo {
        if let Err(e) = echo.await {
            tracing::warn!("Log echo task failed: {}", e);
        }
    }

    result
}
