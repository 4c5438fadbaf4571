//! Newsycle CLI - Command-line interface
//!
//! Usage:
//!   newsycle report [--date YYYY-MM-DD] [--fixture articles.json] [--json] [--output FILE]
//!   newsycle entities <text>
//!   newsycle config

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use newsycle_api::presenter::render_page;
use newsycle_api::telemetry::init_tracing;
use newsycle_core::{parse_report_date, AppConfig};
use newsycle_extractor::{create_entity_extractor, EntityExtractor};
use newsycle_fetcher::{ArticleSource, NewsApiClient, StaticSource};
use newsycle_report::ReportAssembler;

#[derive(Parser)]
#[command(name = "newsycle")]
#[command(about = "Compare the entities news outlets mention on a given day")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults to NEWSYCLE_CONFIG or the environment)
    #[arg(long, global = true, env = "NEWSYCLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the report for one day
    Report {
        /// Report date (YYYY-MM-DD), today when omitted
        #[arg(short, long)]
        date: Option<String>,
        /// Read descriptions from a JSON file instead of the news API
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Emit JSON instead of the HTML page
        #[arg(long)]
        json: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the entities recognized in a text
    Entities {
        /// Text to analyze
        text: String,
    },
    /// Print the effective configuration (secrets omitted)
    Config,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Read `{"outlet": ["description", null, ...]}` into an in-memory source
fn load_fixture(path: &Path) -> anyhow::Result<StaticSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let outlets: HashMap<String, Vec<Option<String>>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))?;

    Ok(outlets
        .into_iter()
        .fold(StaticSource::new(), |source, (outlet, descriptions)| {
            source.with_outlet(outlet.as_str(), descriptions)
        }))
}

fn resolve_date(raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    let parsed = match raw {
        Some(raw) => parse_report_date(raw)?,
        None => None,
    };
    Ok(parsed.unwrap_or_else(|| Local::now().date_naive()))
}

fn write_output(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging, "");

    match cli.command {
        Commands::Report {
            date,
            fixture,
            json,
            output,
        } => {
            let date = resolve_date(date.as_deref())?;
            let source: Arc<dyn ArticleSource> = match fixture {
                Some(path) => Arc::new(load_fixture(&path)?),
                None => Arc::new(NewsApiClient::from_config(&config.news)?),
            };

            let assembler = ReportAssembler::from_config(&config, source)?;
            let report = assembler.assemble(date).await?;

            let content = if json {
                serde_json::to_string_pretty(&report)?
            } else {
                render_page(&report)
            };
            write_output(&content, output.as_deref())?;
        }
        Commands::Entities { text } => {
            let extractor = create_entity_extractor(&config)?;
            for entity in extractor.extract(&text).await? {
                println!(
                    "{:<12} {:<40} [{}..{}] {:.2}",
                    entity.label.as_str(), entity.text, entity.start, entity.end, entity.confidence
                );
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
