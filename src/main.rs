// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use teamgrab::app_config::{Config, LogLevel};
use teamgrab::app_controller::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for teamgrab
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// teamgrab - download videos in parallel, extract teams one video at a time
#[derive(Parser, Debug)]
#[command(name = "teamgrab")]
#[command(version)]
#[command(about = "Parallel video download with sequential team extraction")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "teamgrab downloads videos with a bounded number of parallel downloads and
hands every finished download to a single extraction process, one video at a time.

EXAMPLES:
    teamgrab Z2Qz9pK3xQ1                     # Download and process one video
    teamgrab ids.txt                         # Ids listed in a file, one per line
    teamgrab -d 4 ids.txt more_ids.txt       # Four parallel downloads
    teamgrab --download-only ids.txt         # Only fetch the videos
    teamgrab -f 3 -e 2 ids.txt               # Extractor parallelism settings
    teamgrab completions bash > teamgrab.bash

CONFIGURATION:
    Settings are read from teamgrab.json when it exists. Command line options
    take precedence over the file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Video ids or files listing video ids (one per line)
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// Number of finder processes used by the extractor
    #[arg(short = 'f', long)]
    nb_finders: Option<usize>,

    /// Number of extractor processes used by the extractor
    #[arg(short = 'e', long)]
    nb_extractors: Option<usize>,

    /// Number of parallel downloads
    #[arg(short = 'd', long)]
    nb_downloaders: Option<usize>,

    /// Only download videos, never run the extractor
    #[arg(long)]
    download_only: bool,

    /// Directory holding one sub-directory per video
    #[arg(long, value_name = "DIR")]
    checks_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "teamgrab.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

impl CommandLineOptions {
    // @applies: Command line overrides on top of the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(nb_finders) = self.nb_finders {
            config.extraction.nb_finders = nb_finders;
        }
        if let Some(nb_extractors) = self.nb_extractors {
            config.extraction.nb_extractors = nb_extractors;
        }
        if let Some(nb_downloaders) = self.nb_downloaders {
            config.download.concurrency = nb_downloaders;
        }
        if self.download_only {
            config.download_only = true;
        }
        if let Some(checks_dir) = &self.checks_dir {
            config.checks_dir = checks_dir.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone().into();
        }
    }
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("[x]", "1;31"),
            Level::Warn => ("[!]", "1;33"),
            Level::Info => ("   ", "1;32"),
            Level::Debug => ("[?]", "1;36"),
            Level::Trace => ("[.]", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, color) = Self::decoration(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "teamgrab", &mut std::io::stdout());
        return Ok(());
    }

    if cli.paths.is_empty() {
        return Err(anyhow!("At least one video id or id file is required"));
    }

    let mut config = Config::load_or_default(&cli.config_path)?;
    cli.apply_to(&mut config);
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)
        .context("Failed to initialize teamgrab")?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining work");
            ctrl_c_token.cancel();
        }
    });

    let summary = controller.run(&cli.paths, cancel).await?;

    if summary.has_failures() {
        for report in summary.failures() {
            error!("{}: {}", report.id, report.outcome);
        }
        return Err(anyhow!("{} video(s) failed", summary.failed()));
    }

    info!("Done");
    Ok(())
}
