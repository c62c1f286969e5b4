//! reviewstats - sentiment statistics over app-store reviews
//!
//! A CLI that answers analytical queries over stored customer reviews
//! (counts, sentiment distribution, daily sentiment trend, top keywords)
//! and manages the operator settings those queries depend on.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error response or runtime error (bad arguments, unreadable files, etc.)

mod apps;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod service;
mod settings;
mod stats;
mod store;

use anyhow::{Context, Result};
use apps::AppCatalog;
use cli::{AppListAction, Args, Command, IgnoreListAction, OutputFormat, SettingsAction};
use config::{Config, CONFIG_FILE};
use models::{Reply, StatsRequest};
use serde::Serialize;
use service::StatsService;
use settings::SettingsService;
use stats::StatRegistry;
use std::path::Path;
use std::sync::Arc;
use store::{FileParameterStore, FileReviewSource, ParameterStore, ReviewSource};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("reviewstats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .reviewstats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to point at your review and parameter files.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the command output.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the selected subcommand. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let command = args
        .command
        .clone()
        .context("A subcommand is required (try --help)")?;

    debug!(
        "Reviews: {}, parameters: {}, stage: {}",
        config.store.reviews, config.store.parameters, config.store.stage
    );
    let reviews: Arc<dyn ReviewSource> = Arc::new(FileReviewSource::new(&config.store.reviews));
    let parameters: Arc<dyn ParameterStore> =
        Arc::new(FileParameterStore::new(&config.store.parameters));

    let settings = || {
        SettingsService::new(
            Arc::clone(&parameters),
            config.store.stage.clone(),
            config.keywords.ignore_list_key.clone(),
        )
    };

    let (output, success) = match command {
        Command::Stats(stats_args) => {
            let request = match stats_args.request {
                Some(ref path) => load_request(path)?,
                None => stats_args.to_request().map_err(anyhow::Error::msg)?,
            };

            let registry = StatRegistry::with_defaults(&config.stat_options()?);
            let service = StatsService::new(
                Arc::clone(&reviews),
                Arc::clone(&parameters),
                registry,
                config.service_options(),
            );
            let response = service.process(&request).await;

            let output = match (args.format, response.to_document()) {
                (OutputFormat::Markdown, _) => report::generate_markdown_report(&request, &response),
                (OutputFormat::Json, Some(document)) if stats_args.document => {
                    report::generate_json_report(&document)?
                }
                (OutputFormat::Json, _) => report::generate_json_report(&response)?,
            };
            (output, response.is_success())
        }
        Command::Apps => {
            let catalog = AppCatalog::new(
                Arc::clone(&reviews),
                Arc::clone(&parameters),
                config.store.stage.clone(),
            );
            let reply = catalog.list().await;

            let output = match args.format {
                OutputFormat::Json => report::generate_json_report(&reply)?,
                OutputFormat::Markdown => report::generate_apps_markdown(&reply),
            };
            (output, reply.is_success())
        }
        Command::IgnoreList { action } => {
            let service = settings();
            let reply = match action {
                IgnoreListAction::Get => service.get_ignore_list().await,
                IgnoreListAction::Add { keyword } => service.add_ignored_keyword(&keyword).await,
                IgnoreListAction::Delete { keyword } => {
                    service.delete_ignored_keyword(&keyword).await
                }
            };
            render_reply(&reply, args.format)?
        }
        Command::AppList { action } => {
            let service = settings();
            let reply = match action {
                AppListAction::Get => service.get_app_list().await,
                AppListAction::Add(app) => service.add_app(&app.to_app()).await,
                AppListAction::Delete(app) => service.delete_app(&app.to_app()).await,
            };
            render_reply(&reply, args.format)?
        }
        Command::Settings { action } => {
            let service = settings();
            let reply = match action {
                SettingsAction::Get { names } => service.get_settings(&names).await,
                SettingsAction::Set { pairs } => {
                    let pairs = cli::parse_setting_pairs(&pairs).map_err(anyhow::Error::msg)?;
                    service.set_settings(&pairs).await
                }
            };
            render_reply(&reply, args.format)?
        }
    };

    emit(&output, args.output.as_deref())?;

    Ok(if success { 0 } else { 1 })
}

/// Render a settings reply. These are always JSON.
fn render_reply<T: Serialize>(reply: &Reply<T>, format: OutputFormat) -> Result<(String, bool)> {
    if format == OutputFormat::Markdown {
        debug!("Markdown output covers stats and apps only, printing JSON");
    }
    if let Reply::Error { message } = reply {
        warn!("{}", message);
    }

    Ok((report::generate_json_report(reply)?, reply.is_success()))
}

/// Print to stdout or write to `path`.
fn emit(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            report::write_report(output, path)?;
            println!("✅ Output saved to: {}", path.display());
        }
        None => println!("{}", output.trim_end()),
    }
    Ok(())
}

/// Read a stats query from a JSON file.
fn load_request(path: &Path) -> Result<StatsRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request file: {}", path.display()))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
