// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use caploop::app_config::{self, Config};
use caploop::captions::{CaptionDocument, InsertPolicy};
use caploop::database::{DatabaseConnection, Repository};
use caploop::timecode;
use caploop::validation::{ConflictResolver, TimingValidator, TimingValidatorConfig};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a caption file and list timing issues
    Check {
        /// Caption document (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Warn about silent gaps longer than this many seconds
        #[arg(long, default_value_t = 0)]
        max_gap: u64,
    },

    /// Push overlapping captions apart
    Resolve {
        /// Caption document (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the result here instead of overwriting FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a caption file to SRT
    Export {
        /// Caption document (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target .srt file
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },

    /// Parse a time value and print its canonical form
    Time {
        /// Time such as 1:05 or 1:02:03
        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Load a caption file into the caption database
    Import {
        /// Caption document (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Database file (defaults to the config, then the data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Generate shell completions for caploop
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// caploop - timed captions for looping video playback
#[derive(Parser, Debug)]
#[command(name = "caploop")]
#[command(version = "0.1.0")]
#[command(about = "Caption file tooling for the caploop engine")]
#[command(long_about = "caploop checks, repairs, exports and imports caption documents.

EXAMPLES:
    caploop check song.json                 # List timing issues, fail on blocking ones
    caploop resolve song.json -o fixed.json # Push overlapping captions apart
    caploop export song.json song.srt       # Write SubRip subtitles
    caploop time 1:75                       # Prints the suggestion 2:15
    caploop import song.json                # Store captions in the database
    caploop completions bash > caploop.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Records are filtered by log::max_level, so the level can be raised later
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                colour,
                now,
                tag,
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
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).into());
    }

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "caploop", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config)?;

    // If log level was not set via command line, use the config
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.into());
    }

    match cli.command {
        Commands::Check { file, max_gap } => run_check(file, max_gap),
        Commands::Resolve { file, output } => run_resolve(file, output),
        Commands::Export { file, output } => run_export(file, output),
        Commands::Time { value } => run_time(&value),
        Commands::Import { file, db } => run_import(file, db, &config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn run_check(file: PathBuf, max_gap: u64) -> Result<()> {
    let document = CaptionDocument::load(&file)?;
    let validator = TimingValidator::with_config(TimingValidatorConfig {
        max_gap_warning_secs: max_gap,
        ..Default::default()
    });
    let set = document.into_set(InsertPolicy::default());
    let report = validator.validate(set.subject(), set.captions());

    for check in report.checks.iter().filter(|c| !c.issues.is_empty()) {
        for issue in &check.issues {
            if issue.is_blocking() {
                println!("caption {}: error: {}", check.serial_number, issue);
            } else {
                println!("caption {}: warning: {}", check.serial_number, issue);
            }
        }
    }

    if report.passed {
        info!(
            "{}: {} captions OK ({} warnings)",
            file.display(),
            report.checks.len(),
            report.total_issues
        );
        Ok(())
    } else {
        Err(anyhow!(
            "{}: {} of {} captions have blocking issues ({} overlaps)",
            file.display(),
            report.failed_captions().len(),
            report.checks.len(),
            report.overlap_count
        ))
    }
}

fn run_resolve(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut document = CaptionDocument::load(&file)?;
    let outcome = ConflictResolver::auto_resolve(&document.captions);

    for shift in &outcome.shifts {
        println!(
            "moved {} start {} -> {} (overlapped {})",
            shift.caption_id.short(),
            shift.old_start,
            shift.new_start,
            shift.caused_by.short()
        );
    }

    ConflictResolver::check_bounds(&outcome.captions, document.subject.duration)
        .context("Resolved captions do not fit the video")?;

    let target = output.unwrap_or_else(|| file.clone());
    document.captions = outcome.captions;
    document
        .save(&target)
        .with_context(|| format!("Failed to write resolved captions to {}", target.display()))?;

    info!("{} captions shifted, written to {}", outcome.shifts.len(), target.display());
    Ok(())
}

fn run_export(file: PathBuf, output: PathBuf) -> Result<()> {
    let document = CaptionDocument::load(&file)?;
    document.write_srt(&output)?;
    info!("Exported {} to {}", file.display(), output.display());
    Ok(())
}

fn run_time(value: &str) -> Result<()> {
    match timecode::parse(value) {
        Ok(time) => {
            println!("{} ({} seconds)", time, time.as_secs());
            Ok(())
        }
        Err(err) => Err(anyhow!(err)),
    }
}

async fn run_import(file: PathBuf, db: Option<PathBuf>, config: &Config) -> Result<()> {
    let document = CaptionDocument::load(&file)?;

    // Refuse to store what the editor would refuse to save
    let mut sorted = document.captions.clone();
    sorted.sort_by_key(|c| c.start_time);
    if let Some(conflict) = ConflictResolver::find_first_overlap(&sorted) {
        return Err(anyhow!(
            "{} has overlapping captions (positions {} and {}); run `caploop resolve` first",
            file.display(),
            conflict.previous_index + 1,
            conflict.index + 1
        ));
    }

    let set = document.into_set(config.engine.insert_policy());
    let report = TimingValidator::new().validate(set.subject(), set.captions());
    if !report.passed {
        return Err(anyhow!(
            "{} has {} captions with blocking timing issues; run `caploop check` for details",
            file.display(),
            report.failed_captions().len()
        ));
    }

    let connection = match db.or_else(|| config.database.path()) {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    let repo = Repository::new(connection);
    let count = repo
        .replace_subject_captions(set.subject(), set.captions())
        .await
        .context("Failed to import captions")?;

    info!(
        "Imported {} captions for {} ({})",
        count,
        set.subject().id,
        repo.connection().stats()?
    );
    Ok(())
}
