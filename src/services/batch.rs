//! Batch directory processing
//!
//! Mirrors an input tree into an output tree: `in/<day>/dish.jpg` becomes
//! `out/<day>/dish.png`. Each image is processed independently on the
//! blocking pool; a failure is recorded and the batch moves on.

use crate::{
    config::CutoutConfig,
    error::{CutoutError, Result},
    processor::CutoutProcessor,
    services::{BatchProcessingStats, ImageIOService, ProgressReporter},
};
use futures::stream::{self, StreamExt};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// One input/output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// How inputs are discovered and processed
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Glob matched against file names (e.g. `*.jpg`)
    pub pattern: Option<String>,
    /// Images processed concurrently (0 = available parallelism)
    pub jobs: usize,
    /// Leave inputs whose output already exists alone
    pub skip_existing: bool,
    /// Also write the full-resolution alpha mask as `<name>_mask.png`
    pub save_mask: bool,
}

impl BatchOptions {
    /// Effective concurrency
    #[must_use]
    pub fn concurrency(&self) -> usize {
        if self.jobs > 0 {
            self.jobs
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }
}

/// A successfully written cutout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    /// No subject was found; the output is fully transparent
    pub degenerate: bool,
    pub total_ms: u64,
}

/// An input that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: Vec<ProcessedFile>,
    pub failed: Vec<FailedFile>,
    /// Inputs left alone because their output already existed
    pub skipped: Vec<PathBuf>,
    pub total_ms: u64,
}

impl BatchReport {
    /// Number of inputs considered
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len() + self.skipped.len()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of outputs that came out fully transparent
    #[must_use]
    pub fn degenerate_count(&self) -> usize {
        self.processed.iter().filter(|p| p.degenerate).count()
    }

    /// Write the report as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CutoutError::internal(format!("Failed to serialize batch report: {}", e)))?;
        ImageIOService::write_atomic(path, json.as_bytes())
    }
}

/// Check if file name matches the given pattern
fn matches_pattern(path: &Path, pattern: Option<&glob::Pattern>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| pat.matches(name)),
        None => true,
    }
}

/// Find supported images under `dir`, sorted by path
pub fn discover_inputs(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = pattern
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| CutoutError::invalid_config(format!("Invalid pattern '{}': {}", p, e)))
        })
        .transpose()?;

    let mut files = Vec::new();
    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| {
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                CutoutError::file_io_error("walk input directory", dir, &io)
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && ImageIOService::is_supported_format(path)
                && matches_pattern(path, pattern.as_ref())
            {
                files.push(path.to_path_buf());
            }
        }
    } else {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CutoutError::file_io_error("read input directory", dir, &e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CutoutError::file_io_error("read input directory", dir, &e))?;
            let path = entry.path();
            if path.is_file()
                && ImageIOService::is_supported_format(&path)
                && matches_pattern(&path, pattern.as_ref())
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Output path for `input`, mirroring its location under `input_root`
#[must_use]
pub fn mirror_output_path(input: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    let relative = input
        .strip_prefix(input_root)
        .map_or_else(|_| PathBuf::from(input.file_name().unwrap_or_default()), Path::to_path_buf);
    output_root.join(relative).with_extension("png")
}

/// Sibling path for the debug mask of `output`
#[must_use]
pub fn mask_output_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    output.with_file_name(format!("{}_mask.png", stem))
}

/// Discover inputs under `input_root` and pair each with its mirrored output.
///
/// Files already inside `output_root` are ignored. When two inputs map to the
/// same output (`dish.jpg` and `dish.png`), the first in sorted order wins.
pub fn plan_jobs(input_root: &Path, output_root: &Path, options: &BatchOptions) -> Result<Vec<BatchJob>> {
    let inputs = discover_inputs(input_root, options.recursive, options.pattern.as_deref())?;
    let jobs = inputs
        .into_iter()
        .filter(|input| !(input.starts_with(output_root) && output_root != input_root))
        .map(|input| {
            let output = mirror_output_path(&input, input_root, output_root);
            BatchJob { input, output }
        })
        .collect();

    Ok(dedupe_outputs(jobs))
}

/// Drop every job whose output path was already claimed by an earlier job.
///
/// Jobs writing the same file would race; the first one keeps the path.
#[must_use]
pub fn dedupe_outputs(jobs: Vec<BatchJob>) -> Vec<BatchJob> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| {
            if seen.insert(job.output.clone()) {
                return true;
            }
            warn!(
                input = %job.input.display(),
                output = %job.output.display(),
                "Skipping input whose output collides with an earlier one"
            );
            false
        })
        .collect()
}

enum JobOutcome {
    Processed(ProcessedFile),
    Failed(FailedFile),
    Skipped(PathBuf),
}

/// Runs many cutouts concurrently with one configuration
pub struct BatchProcessor {
    config: CutoutConfig,
    options: BatchOptions,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl BatchProcessor {
    pub fn new(config: CutoutConfig, options: BatchOptions) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            options,
            reporter: None,
        })
    }

    /// Report each finished item to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Mirror `input_root` into `output_root`
    pub async fn run_directory(&self, input_root: &Path, output_root: &Path) -> Result<BatchReport> {
        let jobs = plan_jobs(input_root, output_root, &self.options)?;
        info!(
            jobs = jobs.len(),
            input = %input_root.display(),
            output = %output_root.display(),
            "Batch planned"
        );
        self.run(jobs).await
    }

    /// Process `jobs`; individual failures end up in the report, not as `Err`
    #[instrument(skip_all, fields(jobs = jobs.len()))]
    pub async fn run(&self, jobs: Vec<BatchJob>) -> Result<BatchReport> {
        let start = Instant::now();
        let concurrency = self.options.concurrency();
        let mut stats = BatchProcessingStats {
            items_total: jobs.len(),
            ..BatchProcessingStats::default()
        };
        debug!(concurrency, "Starting batch");

        let mut outcomes = stream::iter(jobs)
            .map(|job| {
                let config = self.config.clone();
                let skip_existing = self.options.skip_existing;
                let save_mask = self.options.save_mask;
                async move {
                    let input = job.input.clone();
                    tokio::task::spawn_blocking(move || run_job(&config, &job, skip_existing, save_mask))
                        .await
                        .unwrap_or_else(|e| {
                            JobOutcome::Failed(FailedFile {
                                input,
                                error: format!("worker task failed: {}", e),
                            })
                        })
                }
            })
            .buffer_unordered(concurrency);

        let mut report = BatchReport::default();
        while let Some(outcome) = outcomes.next().await {
            stats.items_completed += 1;
            match outcome {
                JobOutcome::Processed(file) => {
                    debug!("✅ Processed: {}", file.input.display());
                    stats.current_item_name = file.input.display().to_string();
                    report.processed.push(file);
                },
                JobOutcome::Failed(file) => {
                    error!("❌ Failed to process {}: {}", file.input.display(), file.error);
                    stats.items_failed += 1;
                    stats.current_item_name = file.input.display().to_string();
                    report.failed.push(file);
                },
                JobOutcome::Skipped(input) => {
                    debug!("Skipping {}: output exists", input.display());
                    stats.current_item_name = input.display().to_string();
                    report.skipped.push(input);
                },
            }
            stats.update_rate(start.elapsed().as_secs_f64());
            if let Some(ref reporter) = self.reporter {
                reporter.report_batch_progress(&stats);
            }
        }

        report.processed.sort_by(|a, b| a.input.cmp(&b.input));
        report.failed.sort_by(|a, b| a.input.cmp(&b.input));
        report.skipped.sort();
        report.total_ms = start.elapsed().as_millis() as u64;

        if report.has_failures() {
            warn!(
                "Some files failed to process. Processed: {}, Failed: {}",
                report.processed.len(),
                report.failed.len()
            );
        }
        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            degenerate = report.degenerate_count(),
            total_ms = report.total_ms,
            "Batch complete"
        );
        Ok(report)
    }
}

fn run_job(config: &CutoutConfig, job: &BatchJob, skip_existing: bool, save_mask: bool) -> JobOutcome {
    if skip_existing && job.output.exists() {
        return JobOutcome::Skipped(job.input.clone());
    }

    // Mask first: a job that fails partway must leave no cutout for
    // `skip_existing` to find.
    let result = CutoutProcessor::new(config.clone()).and_then(|mut processor| {
        let result = processor.process_file(&job.input)?;
        if save_mask {
            result.mask.save_png(mask_output_path(&job.output))?;
        }
        result.save_png(&job.output)?;
        Ok(result)
    });

    match result {
        Ok(result) => JobOutcome::Processed(ProcessedFile {
            input: job.input.clone(),
            output: job.output.clone(),
            degenerate: result.is_degenerate(),
            total_ms: result.timings().total_ms,
        }),
        Err(e) => JobOutcome::Failed(FailedFile {
            input: job.input.clone(),
            error: e.to_string(),
        }),
    }
}
