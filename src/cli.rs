//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{parse_calendar_date, RequestedStat, StatsRequest};
use crate::settings::{App, Setting};
use crate::stats::registry::{KEYWORDS, NUM_REVIEWS, OVERALL_SENTIMENT, SENTIMENT_OVER_TIME};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stats computed when `stats` is run without `--stat`.
pub const DEFAULT_STATS: [&str; 4] = [NUM_REVIEWS, OVERALL_SENTIMENT, SENTIMENT_OVER_TIME, KEYWORDS];

/// reviewstats - sentiment statistics over app-store reviews
///
/// Computes review counts, sentiment distribution, daily sentiment trend and
/// top keywords for one app version over a date window, and manages the
/// keyword ignore list, the tracked app list and named settings.
///
/// Examples:
///   reviewstats stats --app "com.example*App Store" --app-version 1.0.0 --start 2018-05-21 --end 2018-05-27
///   reviewstats stats --request query.json --format markdown
///   reviewstats ignore-list add "the app"
///   reviewstats app-list add --name Example --store "Google Play" --app-id com.example
///   reviewstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .reviewstats.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Review store file (JSON array or JSON lines)
    #[arg(long, value_name = "FILE", env = "REVIEWSTATS_REVIEWS", global = true)]
    pub reviews: Option<PathBuf>,

    /// Parameter store file (JSON object of name -> value)
    #[arg(long, value_name = "FILE", env = "REVIEWSTATS_PARAMETERS", global = true)]
    pub parameters: Option<PathBuf>,

    /// Deployment stage appended to parameter names
    #[arg(long, value_name = "STAGE", env = "REVIEWSTATS_STAGE", global = true)]
    pub stage: Option<String>,

    /// Run calculators concurrently
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Generate a default .reviewstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute statistics for one app version over a date window
    Stats(StatsArgs),

    /// List tracked apps that have reviews, with date range and versions
    Apps,

    /// Manage the keyword ignore list
    IgnoreList {
        #[command(subcommand)]
        action: IgnoreListAction,
    },

    /// Manage the list of tracked apps
    AppList {
        #[command(subcommand)]
        action: AppListAction,
    },

    /// Read or write named settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StatsArgs {
    /// App key: app id and store joined by '*'
    #[arg(long, value_name = "APP_ID_STORE", conflicts_with = "request")]
    pub app: Option<String>,

    /// App version
    #[arg(long, value_name = "VERSION", conflicts_with = "request")]
    pub app_version: Option<String>,

    /// First day of the window (ISO-8601)
    #[arg(long, value_name = "DATE", conflicts_with = "request")]
    pub start: Option<String>,

    /// Last day of the window (ISO-8601, inclusive)
    #[arg(long, value_name = "DATE", conflicts_with = "request")]
    pub end: Option<String>,

    /// Stats to compute (repeatable or comma-separated)
    ///
    /// Example: --stat numReviews,keywords
    #[arg(long, value_name = "NAME", value_delimiter = ',', conflicts_with = "request")]
    pub stat: Vec<String>,

    /// Read the whole query from a JSON file instead
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Print only the nested `name -> values` document (JSON format)
    #[arg(long)]
    pub document: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum IgnoreListAction {
    /// Print the ignore list
    Get,
    /// Add a keyword
    Add { keyword: String },
    /// Remove a keyword
    Delete { keyword: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AppListAction {
    /// Print the app list
    Get,
    /// Track a new app
    Add(AppArgs),
    /// Stop tracking an app
    Delete(AppArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AppArgs {
    /// Display name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Store: "App Store" or "Google Play"
    #[arg(long)]
    pub store: String,

    /// Store-specific app id
    #[arg(long)]
    pub app_id: String,
}

impl AppArgs {
    pub fn to_app(&self) -> App {
        App::new(self.name.clone(), self.store.clone(), self.app_id.clone())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print one or more settings
    Get {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Write settings given as NAME=VALUE
    Set {
        #[arg(required = true, value_name = "NAME=VALUE")]
        pairs: Vec<String>,
    },
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

/// Split `NAME=VALUE` pairs into settings.
pub fn parse_setting_pairs(pairs: &[String]) -> Result<Vec<Setting>, String> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(Setting::new(name.trim(), value))
            }
            _ => Err(format!("Setting must be NAME=VALUE, got '{}'", pair)),
        })
        .collect()
}

impl StatsArgs {
    /// Build a query from the individual flags.
    pub fn to_request(&self) -> Result<StatsRequest, String> {
        let app_id_store = self.app.clone().ok_or("--app is required")?;
        let version = self.app_version.clone().ok_or("--app-version is required")?;
        let start = self.start.as_deref().ok_or("--start is required")?;
        let end = self.end.as_deref().ok_or("--end is required")?;

        let start_date =
            parse_calendar_date(start).ok_or_else(|| format!("Invalid start date: {}", start))?;
        let end_date =
            parse_calendar_date(end).ok_or_else(|| format!("Invalid end date: {}", end))?;

        let names: Vec<&str> = if self.stat.is_empty() {
            DEFAULT_STATS.to_vec()
        } else {
            self.stat.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect()
        };

        Ok(StatsRequest {
            app_id_store,
            version,
            start_date,
            end_date,
            stats: names.into_iter().map(RequestedStat::named).collect(),
        })
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            None => Err("A subcommand is required (try --help)".to_string()),
            Some(Command::Stats(stats)) => {
                if let Some(ref path) = stats.request {
                    if !path.is_file() {
                        return Err(format!("Request file does not exist: {}", path.display()));
                    }
                    return Ok(());
                }
                stats.to_request().map(|_| ())
            }
            Some(Command::Settings {
                action: SettingsAction::Set { pairs },
            }) => parse_setting_pairs(pairs).map(|_| ()),
            Some(_) => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stats_args() -> StatsArgs {
        StatsArgs {
            app: Some("com.example*App Store".to_string()),
            app_version: Some("1.0.0".to_string()),
            start: Some("2018-05-21".to_string()),
            end: Some("2018-05-27T00:00:00.000Z".to_string()),
            stat: vec![],
            request: None,
            document: false,
        }
    }

    fn make_args() -> Args {
        Args {
            command: Some(Command::Stats(stats_args())),
            config: None,
            reviews: None,
            parameters: None,
            stage: None,
            parallel: false,
            verbose: false,
            quiet: false,
            format: OutputFormat::Json,
            output: None,
            init_config: false,
        }
    }

    #[test]
    fn test_stats_request_from_flags() {
        let mut args = stats_args();
        args.stat = vec!["keywords".to_string(), " rawReviews ".to_string()];

        let request = args.to_request().unwrap();
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2018, 5, 21).unwrap());
        assert_eq!(request.end_date, NaiveDate::from_ymd_opt(2018, 5, 27).unwrap());
        let names: Vec<_> = request.stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["keywords", "rawReviews"]);
    }

    #[test]
    fn test_default_stats() {
        let request = stats_args().to_request().unwrap();
        let names: Vec<_> = request.stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEFAULT_STATS.to_vec());
    }

    #[test]
    fn test_validation_missing_and_bad_dates() {
        let mut args = make_args();
        if let Some(Command::Stats(ref mut stats)) = args.command {
            stats.start = Some("21/05/2018".to_string());
        }
        assert_eq!(
            args.validate(),
            Err("Invalid start date: 21/05/2018".to_string())
        );

        let mut args = make_args();
        if let Some(Command::Stats(ref mut stats)) = args.command {
            stats.app = None;
        }
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_subcommand() {
        let mut args = make_args();
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_setting_pairs() {
        let settings =
            parse_setting_pairs(&["interval=30".to_string(), "note=a=b".to_string()]).unwrap();
        assert_eq!(
            settings,
            vec![Setting::new("interval", "30"), Setting::new("note", "a=b")]
        );
        assert!(parse_setting_pairs(&["novalue".to_string()]).is_err());
        assert!(parse_setting_pairs(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "reviewstats",
            "--stage",
            "prod",
            "stats",
            "--app",
            "x*App Store",
            "--app-version",
            "2.0",
            "--start",
            "2018-05-21",
            "--end",
            "2018-05-22",
            "--stat",
            "numReviews,keywords",
            "--format",
            "markdown",
        ])
        .unwrap();

        assert_eq!(args.stage.as_deref(), Some("prod"));
        assert_eq!(args.format, OutputFormat::Markdown);
        match args.command {
            Some(Command::Stats(stats)) => {
                assert_eq!(stats.stat, vec!["numReviews", "keywords"]);
                assert_eq!(stats.app_version.as_deref(), Some("2.0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
