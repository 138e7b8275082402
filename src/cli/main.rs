//! Dish cutout CLI
//!
//! Command-line interface for cutting dishes out of studio backdrops, one
//! file at a time or by mirroring whole directories.

use super::config::CliConfigBuilder;
use crate::{
    config::CutoutConfig,
    processor::CutoutProcessor,
    services::{
        dedupe_outputs, plan_jobs, BatchJob, BatchOptions, BatchProcessingStats, BatchProcessor, BatchReport,
        ConsoleProgressReporter, ProcessedFile, ProcessingStage, ProgressReporter, ProgressTracker,
        ProgressUpdate,
    },
    tracing_config::{spans, TracingConfig, TracingFormat},
    types::ProcessingTimings,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Remove the backdrop from dish photos and write canonical transparent PNGs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "dish-cutout")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required_unless_present = "print_config")]
    pub input: Vec<String>,

    /// Output file (single input) or directory (several inputs). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Max channel spread for neutral backdrop pixels (exclusive)
    #[arg(long)]
    pub chroma_threshold: Option<u8>,

    /// Average brightness ceiling for backdrop pixels (inclusive)
    #[arg(long)]
    pub background_brightness: Option<u8>,

    /// Average brightness ceiling for shadow candidates (exclusive)
    #[arg(long)]
    pub shadow_brightness: Option<u8>,

    /// Shadow sampling disc radius in pixels
    #[arg(long)]
    pub shadow_radius: Option<u32>,

    /// Grid step inside the shadow sampling disc
    #[arg(long)]
    pub shadow_step: Option<u32>,

    /// Background fraction a shadow pixel must exceed to be removed
    #[arg(long)]
    pub shadow_threshold: Option<f32>,

    /// Maximum shadow cleanup passes (0 disables)
    #[arg(long)]
    pub shadow_passes: Option<u32>,

    /// Width of the alpha ramp at the subject edge (0 = hard edge)
    #[arg(long)]
    pub feather_radius: Option<u32>,

    /// Side of the square output canvas
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Resampling filter for the canonical resize
    #[arg(long, value_enum)]
    pub filter: Option<CliResizeFilter>,

    /// Skip lossless PNG optimization
    #[arg(long)]
    pub no_optimize: bool,

    /// PNG optimization level (0-6)
    #[arg(long)]
    pub optimization_level: Option<u8>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for batch processing (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Images processed in parallel (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Leave inputs whose output already exists untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Also write the full-resolution alpha mask as <name>_mask.png
    #[arg(long)]
    pub save_mask: bool,

    /// Write a JSON report of the run
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show a progress bar while processing
    #[arg(long)]
    pub progress: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResizeFilter {
    Nearest,
    Triangle,
    Catmullrom,
    Gaussian,
    Lanczos3,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = uuid::Uuid::new_v4().to_string();
    let _tracing_guard = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(TracingFormat::Console)
        .with_session_id(session_id.clone())
        .init()
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    if cli.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    if cli.input.is_empty() {
        anyhow::bail!("At least one input is required");
    }

    let span = spans::session(&session_id, cli.input.len());
    info!("Input(s): {}", cli.input.join(", "));
    let start_time = Instant::now();

    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        let _enter = span.enter();
        return process_stdin(&cli, config);
    }

    let report = process_inputs(&cli, config).instrument(span).await?;

    if let Some(path) = &cli.report {
        report
            .save_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    info!(
        "Processed {} image(s) in {:.2}s",
        report.processed.len(),
        start_time.elapsed().as_secs_f64()
    );

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} image(s) failed",
            report.failed.len(),
            report.total()
        );
    }
    Ok(())
}

/// Resolve inputs to jobs and run them as one batch
async fn process_inputs(cli: &Cli, config: CutoutConfig) -> Result<BatchReport> {
    let jobs = collect_jobs(cli)?;

    if jobs.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(BatchReport::default());
    }

    if jobs.len() == 1 && cli.output.as_deref() == Some("-") {
        let job = jobs.into_iter().next().context("no job")?;
        return process_to_stdout(&job.input, config);
    }

    info!("Found {} image file(s) to process", jobs.len());

    let progress_bar = if cli.progress || jobs.len() > 1 {
        Some(Arc::new(ProgressBarReporter::new(jobs.len() as u64)?))
    } else {
        None
    };
    let reporter: Arc<dyn ProgressReporter> = match &progress_bar {
        Some(bar) => bar.clone(),
        None => Arc::new(ConsoleProgressReporter::new(cli.verbose > 0)),
    };

    let file_count = jobs.len();
    let processor = BatchProcessor::new(config, batch_options(cli))?.with_reporter(reporter);
    let report = processor.run(jobs).await?;

    if let Some(reporter) = progress_bar {
        reporter.bar.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            report.processed.len(),
            report.failed.len()
        ));
    }

    if file_count > 1 {
        let total_secs = report.total_ms as f64 / 1000.0;
        info!("📊 Batch processing summary:");
        info!("  ├─ Files processed: {}", report.processed.len());
        info!("  ├─ Files failed: {}", report.failed.len());
        info!("  ├─ Files skipped: {}", report.skipped.len());
        info!("  ├─ Fully transparent: {}", report.degenerate_count());
        info!("  ├─ Total time: {:.2}s", total_secs);
        info!(
            "  └─ Average per file: {:.2}s",
            if report.processed.is_empty() {
                0.0
            } else {
                total_secs / report.processed.len() as f64
            }
        );
    }

    Ok(report)
}

fn batch_options(cli: &Cli) -> BatchOptions {
    BatchOptions {
        recursive: cli.recursive,
        pattern: cli.pattern.clone(),
        jobs: cli.jobs,
        skip_existing: cli.skip_existing,
        save_mask: cli.save_mask,
    }
}

/// Turn positional inputs into input/output pairs
fn collect_jobs(cli: &Cli) -> Result<Vec<BatchJob>> {
    let options = batch_options(cli);
    let mut files = Vec::new();
    let mut dir_jobs = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            let output_root = cli
                .output
                .as_ref()
                .map_or_else(|| default_output_root(&path), PathBuf::from);
            let span = spans::batch_processing(&path, &output_root);
            let _enter = span.enter();
            dir_jobs.extend(plan_jobs(&path, &output_root, &options)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    let single = files.len() == 1 && dir_jobs.is_empty();
    let mut jobs: Vec<BatchJob> = files
        .into_iter()
        .map(|input| {
            let output = match cli.output.as_deref() {
                Some(target) if single => PathBuf::from(target),
                Some(dir) => output_path_in_dir(&input, Path::new(dir)),
                None => default_output_path(&input),
            };
            BatchJob { input, output }
        })
        .collect();
    jobs.extend(dir_jobs);
    jobs.sort_by(|a, b| a.input.cmp(&b.input));
    jobs.dedup_by(|a, b| a.input == b.input);
    Ok(dedupe_outputs(jobs))
}

/// `photos` becomes `photos_nobg` next to it
fn default_output_root(input_dir: &Path) -> PathBuf {
    let name = input_dir
        .file_name()
        .map_or_else(|| "images".into(), |n| n.to_string_lossy());
    input_dir.with_file_name(format!("{}_nobg", name))
}

/// `dish.jpg` becomes `dish_nobg.png` next to it
fn default_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}_nobg.png", stem.to_string_lossy()))
}

/// `dish.jpg` becomes `<dir>/dish.png`
fn output_path_in_dir(input_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    output_dir.join(format!("{}.png", stem.to_string_lossy()))
}

/// Process image from stdin; output goes to `--output` or stdout
fn process_stdin(cli: &Cli, config: CutoutConfig) -> Result<()> {
    info!("Reading image from stdin");
    let image_data = read_stdin()?;
    if cli.save_mask {
        warn!("--save-mask is ignored for stdin input");
    }

    let mut processor = CutoutProcessor::new(config)?
        .with_progress(ProgressTracker::console(cli.verbose > 0));
    let result = processor
        .process_bytes(&image_data)
        .context("Failed to cut out stdin image")?;

    match cli.output.as_deref() {
        Some(target) if target != "-" => {
            result
                .save_png(target)
                .with_context(|| format!("Failed to save result to {}", target))?;
            info!("Image saved to: {}", target);
        },
        _ => {
            write_stdout(result.png_bytes())?;
            info!("Image written to stdout");
        },
    }
    info!("{}", result.timing_summary());
    Ok(())
}

/// Process one file and write the PNG to stdout
fn process_to_stdout(input: &Path, config: CutoutConfig) -> Result<BatchReport> {
    let span = spans::file_processing(input);
    let _enter = span.enter();

    let mut processor = CutoutProcessor::new(config)?;
    let result = processor
        .process_file(input)
        .with_context(|| format!("Failed to cut out {}", input.display()))?;
    write_stdout(result.png_bytes())?;
    info!("{}", result.timing_summary());

    Ok(BatchReport {
        processed: vec![ProcessedFile {
            input: input.to_path_buf(),
            output: PathBuf::from("-"),
            degenerate: result.is_degenerate(),
            total_ms: result.timings().total_ms,
        }],
        total_ms: result.timings().total_ms,
        ..BatchReport::default()
    })
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Progress reporter backed by an indicatif bar
struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    fn new(len: u64) -> Result<Self> {
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_message(update.description);
    }

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar
            .suspend(|| log::error!("❌ Error during {}: {}", stage.description(), error));
    }

    fn report_batch_progress(&self, stats: &BatchProcessingStats) {
        self.bar.set_position(stats.items_completed as u64);
        self.bar.set_message(stats.current_item_name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dish-cutout").chain(args.iter().copied())).unwrap()
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_input_required_unless_printing_config() {
        assert!(Cli::try_parse_from(["dish-cutout"]).is_err());
        assert!(Cli::try_parse_from(["dish-cutout", "--print-config"]).is_ok());
    }

    #[test]
    fn test_default_output_paths() {
        assert_eq!(
            default_output_path(Path::new("photos/soup.jpg")),
            PathBuf::from("photos/soup_nobg.png")
        );
        assert_eq!(
            default_output_root(Path::new("public/images")),
            PathBuf::from("public/images_nobg")
        );
        assert_eq!(
            output_path_in_dir(Path::new("a/soup.jpg"), Path::new("out")),
            PathBuf::from("out/soup.png")
        );
    }

    #[test]
    fn test_collect_jobs_single_file_uses_output_as_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("soup.jpg");
        touch(&input);
        let target = dir.path().join("result.png");

        let cli = parse(&[input.to_str().unwrap(), "-o", target.to_str().unwrap()]);
        let jobs = collect_jobs(&cli).unwrap();
        assert_eq!(jobs, vec![BatchJob { input, output: target }]);
    }

    #[test]
    fn test_collect_jobs_directory_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        touch(&images.join("day1/soup.jpg"));
        touch(&images.join("day2/salad.png"));
        touch(&images.join("day2/readme.md"));

        let cli = parse(&[images.to_str().unwrap(), "--recursive"]);
        let jobs = collect_jobs(&cli).unwrap();
        let outputs: Vec<PathBuf> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                dir.path().join("images_nobg/day1/soup.png"),
                dir.path().join("images_nobg/day2/salad.png"),
            ]
        );
    }

    #[test]
    fn test_collect_jobs_never_shares_an_output() {
        let dir = TempDir::new().unwrap();
        let lunch = dir.path().join("lunch");
        let dinner = dir.path().join("dinner");
        touch(&lunch.join("soup.png"));
        touch(&dinner.join("soup.png"));
        touch(&dinner.join("salad.png"));
        let loose = dir.path().join("extra/soup.jpg");
        touch(&loose);
        let out = dir.path().join("out");

        let cli = parse(&[
            lunch.to_str().unwrap(),
            dinner.to_str().unwrap(),
            loose.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        let jobs = collect_jobs(&cli).unwrap();

        let mut outputs: Vec<&PathBuf> = jobs.iter().map(|j| &j.output).collect();
        outputs.sort();
        outputs.dedup();
        assert_eq!(outputs.len(), jobs.len());
        assert_eq!(jobs.len(), 2);
        // sorted by input, so the dinner directory claims out/soup.png first
        let soup = jobs.iter().find(|j| j.output == out.join("soup.png")).unwrap();
        assert_eq!(soup.input, dinner.join("soup.png"));
    }

    #[test]
    fn test_collect_jobs_missing_input_fails() {
        let cli = parse(&["/definitely/not/here.png"]);
        assert!(collect_jobs(&cli).is_err());
    }
}
