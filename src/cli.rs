//! Command-line interface components.

use crate::artifact::GeoLookup;
use crate::config::{ArtifactFormat, PrepConfig};
use crate::constants::{DEFAULT_EMISSIONS_DATA, DEFAULT_PREPARED_DIR};
use crate::emissions::StructureDataReader;
use crate::models::Source;
use crate::pipeline::PrepPipeline;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "geocode_prep")]
#[command(about = "Build code-keyed latitude/longitude lookup tables from raw reference datasets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare lookup artifacts from the raw reference snapshots
    Prepare(PrepareArgs),
    /// Look up the coordinates of a code in a prepared artifact
    Lookup(LookupArgs),
    /// Show the emissions rows of one structure
    Structure(StructureArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct PrepareArgs {
    /// Directory holding the raw reference snapshots
    #[arg(long, env = "GEOCODE_RAW_DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Directory receiving the lookup artifacts
    #[arg(long, env = "GEOCODE_PREPARED_DIR")]
    pub prepared_dir: Option<PathBuf>,

    /// Sources to prepare (insee, uic, tvs, iata); all when omitted
    #[arg(long, value_delimiter = ',')]
    pub sources: Vec<Source>,

    /// Artifact format (json, parquet)
    #[arg(long)]
    pub format: Option<ArtifactFormat>,

    /// Maximum number of sources prepared at the same time
    #[arg(long)]
    pub workers: Option<usize>,

    /// Keep only lat/lon in each record
    #[arg(long)]
    pub no_passthrough: bool,

    /// JSON configuration file applied before command-line options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors, no progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl PrepareArgs {
    /// Layer defaults, the optional config file and command-line options
    pub fn to_config(&self) -> crate::Result<PrepConfig> {
        let mut config = match &self.config {
            Some(path) => PrepConfig::from_file(path)?,
            None => PrepConfig::default(),
        };

        if let Some(raw_dir) = &self.raw_dir {
            config = config.with_raw_dir(raw_dir);
        }
        if let Some(prepared_dir) = &self.prepared_dir {
            config = config.with_prepared_dir(prepared_dir);
        }
        if !self.sources.is_empty() {
            config = config.with_sources(self.sources.clone());
        }
        if let Some(format) = self.format {
            config = config.with_format(format);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.no_passthrough {
            config = config.without_passthrough();
        }
        if self.quiet {
            config = config.without_progress();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct LookupArgs {
    /// Source whose artifact is queried (insee, uic, tvs, iata)
    pub source: Source,

    /// Lookup key, e.g. 75114, 8739100, TR_FRECO or CDG
    pub code: String,

    /// Directory holding the lookup artifacts
    #[arg(long, env = "GEOCODE_PREPARED_DIR", default_value = DEFAULT_PREPARED_DIR)]
    pub prepared_dir: PathBuf,

    /// Artifact format (json, parquet)
    #[arg(long, default_value = "json")]
    pub format: ArtifactFormat,
}

#[derive(clap::Args, Debug)]
pub struct StructureArgs {
    /// Structure identifier
    pub id: String,

    /// Restrict to one year
    #[arg(long)]
    pub year: Option<i32>,

    /// Cleaned emissions dataset
    #[arg(long, env = "GEOCODE_EMISSIONS_DATA", default_value = DEFAULT_EMISSIONS_DATA)]
    pub data: PathBuf,
}

/// Set up structured logging on stderr; `RUST_LOG` takes precedence
pub fn setup_logging(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("geocode_prep={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// Execute a command; `Ok(false)` means it ran but some sources failed
pub async fn run(command: Command) -> Result<bool> {
    match command {
        Command::Prepare(args) => run_prepare(args).await,
        Command::Lookup(args) => run_lookup(args),
        Command::Structure(args) => run_structure(args),
    }
}

async fn run_prepare(args: PrepareArgs) -> Result<bool> {
    setup_logging(args.log_level());
    let config = args.to_config().context("Invalid preparation settings")?;
    debug!("Configuration: {:?}", config);

    println!(
        "{}",
        "Preparing geocode lookup tables".bright_green().bold()
    );
    println!("  {} {}", "Raw data:".bright_cyan(), config.raw_dir.display());
    println!(
        "  {} {}",
        "Prepared:".bright_cyan(),
        config.prepared_dir.display()
    );

    let pipeline = PrepPipeline::new(config)?;
    let report = pipeline.run().await;
    PrepPipeline::print_summary(&report);

    Ok(report.is_success())
}

fn run_lookup(args: LookupArgs) -> Result<bool> {
    setup_logging("warn");
    let lookup = GeoLookup::open(&args.prepared_dir, args.source, args.format)
        .with_context(|| format!("Could not open the {} lookup", args.source))?;

    match lookup.get(&args.code) {
        Some(record) => {
            println!(
                "{} {} {} {}",
                args.code.bright_white().bold(),
                "->".bright_black(),
                format!("lat={}", record.lat).bright_cyan(),
                format!("lon={}", record.lon).bright_cyan()
            );
            for (name, value) in &record.extra {
                println!("  {} {}", format!("{}:", name).bright_black(), value);
            }
            Ok(true)
        }
        None => {
            println!(
                "{} not found in {} ({} codes)",
                args.code.bright_yellow(),
                lookup.path().display(),
                lookup.len()
            );
            Ok(false)
        }
    }
}

fn run_structure(args: StructureArgs) -> Result<bool> {
    setup_logging("warn");
    let reader = StructureDataReader::load(&args.data)
        .with_context(|| format!("Could not load emissions data from {}", args.data.display()))?;

    let rows = reader.structure_data(&args.id, args.year)?;
    if rows.height() == 0 {
        println!("No rows for structure {}", args.id.bright_yellow());
        return Ok(false);
    }
    println!("{}", rows);
    Ok(true)
}
