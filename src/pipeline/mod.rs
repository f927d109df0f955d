//! Preparation pipeline orchestrating the reference loaders.
//!
//! Every selected source runs in isolation: its loader and artifact write
//! happen on a blocking worker, at most `workers` at once, and a failure is
//! recorded in that source's outcome without affecting the others. Sources
//! share no state and touch disjoint files, so they may run in any order.

use crate::artifact::ArtifactWriter;
use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::loader::ReferenceLoader;
use crate::models::{BatchReport, Source, SourceOutcome, SourceReport};

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tokio::task;
use tracing::{debug, info, warn};

#[cfg(test)]
pub mod tests;

/// Runs the selected loaders and reports per-source outcomes
#[derive(Debug, Clone)]
pub struct PrepPipeline {
    config: PrepConfig,
}

impl PrepPipeline {
    /// Create a pipeline after validating the configuration
    pub fn new(config: PrepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Prepare every selected source.
    ///
    /// Never aborts on a source failure; inspect the returned report.
    pub async fn run(&self) -> BatchReport {
        let start_time = Instant::now();
        let sources = self.config.selected_sources();
        info!(
            "Preparing {} sources from {} into {}",
            sources.len(),
            self.config.raw_dir.display(),
            self.config.prepared_dir.display()
        );

        let progress_bar = self.config.show_progress.then(|| {
            let pb = ProgressBar::new(sources.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("Preparing lookup tables");
            pb
        });

        let mut outcomes: Vec<SourceOutcome> = stream::iter(sources)
            .map(|source| {
                let config = self.config.clone();
                let pb = progress_bar.clone();
                async move {
                    let result = task::spawn_blocking(move || Self::prepare_source(&config, source))
                        .await
                        .unwrap_or_else(|e| {
                            Err(PrepError::Io(std::io::Error::other(format!(
                                "worker for {} stopped: {}",
                                source, e
                            ))))
                        });

                    match &result {
                        Ok(report) => debug!(
                            "{} prepared: {} records -> {}",
                            source,
                            report.stats.records,
                            report.artifact_path.display()
                        ),
                        Err(e) => warn!("{} preparation failed: {}", source, e),
                    }
                    if let Some(pb) = &pb {
                        pb.set_message(format!("Finished {}", source));
                        pb.inc(1);
                    }

                    SourceOutcome { source, result }
                }
            })
            .buffer_unordered(self.config.workers)
            .collect()
            .await;

        if let Some(pb) = &progress_bar {
            pb.finish_with_message("All sources processed");
        }

        outcomes.sort_by_key(|outcome| outcome.source);
        let report = BatchReport {
            outcomes,
            elapsed: start_time.elapsed(),
        };
        info!(
            "Preparation finished: {} succeeded, {} failed in {:.2}s",
            report.succeeded().count(),
            report.failure_count(),
            report.elapsed.as_secs_f64()
        );
        report
    }

    /// Load one source and write its artifact; blocking
    pub fn prepare_source(config: &PrepConfig, source: Source) -> Result<SourceReport> {
        let start_time = Instant::now();

        let loader = ReferenceLoader::new(source).with_passthrough(config.passthrough);
        let (table, stats) = loader.load(&config.raw_path(source))?;

        let writer = ArtifactWriter::new(&config.prepared_dir, config.format);
        let artifact_path = writer.write(&table)?;

        Ok(SourceReport {
            source,
            stats,
            artifact_path,
            elapsed: start_time.elapsed(),
        })
    }

    /// Print the per-source summary of a batch
    pub fn print_summary(report: &BatchReport) {
        println!("\n{}", "Preparation Summary".bright_green().bold());
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(source_report) => println!(
                    "  {} {:<6} {} codes ({} rows read, {} dropped, {} overwritten) -> {}",
                    "ok".bright_green(),
                    outcome.source.name().bright_cyan(),
                    source_report.stats.records.to_string().bright_white().bold(),
                    source_report.stats.rows_read,
                    source_report.stats.rows_dropped,
                    source_report.stats.keys_overwritten,
                    source_report.artifact_path.display()
                ),
                Err(error) => println!(
                    "  {} {:<6} {}: {}",
                    "failed".bright_red().bold(),
                    outcome.source.name().bright_cyan(),
                    error.kind().bright_red(),
                    error
                ),
            }
        }
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            report.elapsed.as_millis().to_string().bright_white()
        );
    }
}
