//! Realtime Table CLI
//!
//! Command-line interface for table query planning:
//! - Build the query context for a chart's form data
//! - Run a chart against a JSON dataset
//! - Watch a chart with auto-refresh
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use realtime_table::config::generate_default_config;
use realtime_table::{
    build_query_context, Config, FilterFingerprints, InMemoryEngine, LoggingConfig, PagingState,
    RefreshInterval, TableConfig, TableController, TableView,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "realtime-table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query planning and auto-refresh for paginated table charts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the query context a chart would dispatch
    Build {
        /// Form data JSON file
        form_data: PathBuf,
        /// Page to build (0-based)
        #[arg(short, long, default_value = "0")]
        page: usize,
        /// Page size (default: the chart's page length)
        #[arg(long)]
        page_size: Option<usize>,
        /// Mark the context as a forced refresh
        #[arg(long)]
        force: bool,
    },

    /// Run a chart against a JSON dataset and print one page
    Run {
        /// Form data JSON file
        form_data: PathBuf,
        /// Dataset: a JSON array of row objects
        dataset: PathBuf,
        /// Page to show (0-based)
        #[arg(short, long, default_value = "0")]
        page: usize,
    },

    /// Run a chart and re-run it on every refresh tick
    Watch {
        /// Form data JSON file
        form_data: PathBuf,
        /// Dataset, re-read after every tick
        dataset: PathBuf,
        /// Override the chart's refresh interval (seconds)
        #[arg(short, long)]
        interval: Option<f64>,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<usize>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Build {
            form_data,
            page,
            page_size,
            force,
        } => {
            let table = load_table_config(&form_data, &config)?;
            let paging = PagingState::new(page, page_size.unwrap_or(table.server_page_length));
            let build = build_query_context(&table, paging, &FilterFingerprints::new(), force)?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&build.context)?),
                OutputFormat::Table => {
                    println!("mode: {}", build.mode);
                    for (i, query) in build.context.queries.iter().enumerate() {
                        let kind = if query.is_rowcount {
                            "row count"
                        } else if query.is_totals {
                            "totals"
                        } else {
                            "primary"
                        };
                        println!(
                            "[{}] {:<9} columns={:?} metrics={} limit={} offset={}",
                            i,
                            kind,
                            query.columns,
                            query.metrics.len(),
                            query.row_limit,
                            query.row_offset
                        );
                    }
                }
            }
        }

        Commands::Run {
            form_data,
            dataset,
            page,
        } => {
            let table = load_table_config(&form_data, &config)?;
            let engine = InMemoryEngine::from_path(&dataset)
                .with_context(|| format!("Failed to load dataset {:?}", dataset))?;
            let controller = TableController::new(table, Arc::new(engine));

            let view = if page == 0 {
                controller.load().await?
            } else {
                controller.on_page_change(page).await?
            };
            print_view(&view, cli.format)?;
        }

        Commands::Watch {
            form_data,
            dataset,
            interval,
            ticks,
        } => {
            let mut table = load_table_config(&form_data, &config)?;
            if let Some(secs) = interval {
                table.refresh_interval = RefreshInterval::from_secs_f64(secs);
            }
            if !table.refresh_interval.is_enabled() {
                bail!("Refresh is disabled for this chart; pass --interval to enable it");
            }

            let engine = Arc::new(
                InMemoryEngine::from_path(&dataset)
                    .with_context(|| format!("Failed to load dataset {:?}", dataset))?,
            );
            let controller = Arc::new(TableController::new(table, engine.clone()));
            print_view(&controller.load().await?, cli.format)?;

            let (scheduler, mut views) = controller.spawn_auto_refresh();
            let mut seen = 0;

            loop {
                tokio::select! {
                    view = views.recv() => {
                        let Some(view) = view else { break };
                        match view {
                            Ok(view) => print_view(&view, cli.format)?,
                            Err(e) => tracing::error!("Refresh failed: {}", e),
                        }

                        seen += 1;
                        if ticks.is_some_and(|n| seen >= n) {
                            break;
                        }

                        if let Err(e) = engine.reload(&dataset).await {
                            tracing::warn!("Keeping previous rows, reload failed: {}", e);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted");
                        break;
                    }
                }
            }

            drop(scheduler);
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Read form data and fill in configured defaults
fn load_table_config(path: &Path, config: &Config) -> anyhow::Result<TableConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read form data {:?}", path))?;
    let mut form_data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Form data {:?} is not valid JSON", path))?;

    config.table.fill_form_data(&mut form_data);
    Ok(TableConfig::from_json(form_data)?)
}

fn print_view(view: &TableView, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(view)?),
        OutputFormat::Table => println!("{}", view),
    }
    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("realtime_table={}", config.level).into());

    // logs go to stderr unless a file is configured; stdout carries the tables
    let writer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init()?;
    }

    Ok(())
}
