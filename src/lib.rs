#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Dish Cutout
//!
//! Removes the studio backdrop from dish photos and produces a canonical,
//! transparent PNG cutout. No neural network is involved: the subject is
//! found with a chain of deterministic pixel stages.
//!
//! ## Pipeline
//!
//! 1. **Classifier**: a pixel is backdrop when it is near-neutral and dark
//! 2. **Border flood fill**: backdrop connected to the image border is removed
//! 3. **Shadow cleanup**: dark halo pixels mostly surrounded by background go too
//! 4. **Largest component**: only the biggest foreground region survives
//! 5. **Feathering**: alpha ramps up over a few pixels at the subject edge
//! 6. **Canonical output**: aspect-preserving fit onto a transparent square,
//!    encoded as a losslessly optimized PNG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dish_cutout::{cutout_file, CutoutConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = CutoutConfig::builder()
//!     .feather_radius(3)
//!     .canonical_size(512)
//!     .build()?;
//!
//! let result = cutout_file("soup.jpg", "soup.png", &config)?;
//! println!("{}", result.timing_summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Batch processing
//!
//! ```rust,no_run
//! use dish_cutout::{BatchOptions, BatchProcessor, CutoutConfig};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = BatchOptions { recursive: true, ..BatchOptions::default() };
//! let processor = BatchProcessor::new(CutoutConfig::default(), options)?;
//! let report = processor
//!     .run_directory(Path::new("public/images"), Path::new("public/images_nobg"))
//!     .await?;
//! println!("{} done, {} failed", report.processed.len(), report.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): `dish-cutout` binary, progress bars and tracing setup
//! - `webp-support`: WebP input decoding
//! - `tracing-json`, `tracing-files`: extra log formats and destinations for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use image::DynamicImage;
use std::path::Path;
use tokio::io::AsyncRead;

pub use config::{CutoutConfig, CutoutConfigBuilder, OutputConfig, ResizeFilter, SegmentationConfig};
pub use error::{CutoutError, Result};
pub use processor::CutoutProcessor;
pub use segmentation::{BackgroundClassifier, BackgroundMask, SegmentationOutcome, Segmenter};
pub use services::{
    BatchJob, BatchOptions, BatchProcessor, BatchReport, ConsoleProgressReporter, ImageIOService,
    NoOpProgressReporter, OutputFormatHandler, ProcessingStage, ProgressReporter, ProgressTracker,
    ProgressUpdate,
};
pub use types::{
    CutoutResult, MaskStatistics, ProcessingMetadata, ProcessingTimings, SegmentationMask,
    SegmentationReport,
};

#[cfg(feature = "cli")]
pub use tracing_config::{spans, TracingConfig, TracingFormat, TracingOutput};

/// Cut out the dish in `input` and write the PNG to `output`.
///
/// The output file is only created once every stage has succeeded.
///
/// ```rust,no_run
/// use dish_cutout::{cutout_file, CutoutConfig};
///
/// # fn example() -> dish_cutout::Result<()> {
/// let result = cutout_file("in/pasta.jpg", "out/pasta.png", &CutoutConfig::default())?;
/// assert_eq!(result.dimensions(), (512, 512));
/// # Ok(())
/// # }
/// ```
pub fn cutout_file<P, Q>(input: P, output: Q, config: &CutoutConfig) -> Result<CutoutResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    CutoutProcessor::new(config.clone())?.process_file_to(input, output)
}

/// Cut out an image held in memory as encoded bytes (PNG, JPEG, TIFF, BMP)
///
/// ```rust,no_run
/// use dish_cutout::{cutout_from_bytes, CutoutConfig};
///
/// # fn example(upload: Vec<u8>) -> dish_cutout::Result<()> {
/// let result = cutout_from_bytes(&upload, &CutoutConfig::default())?;
/// let png: &[u8] = result.png_bytes();
/// # let _ = png;
/// # Ok(())
/// # }
/// ```
pub fn cutout_from_bytes(image_bytes: &[u8], config: &CutoutConfig) -> Result<CutoutResult> {
    CutoutProcessor::new(config.clone())?.process_bytes(image_bytes)
}

/// Cut out an already decoded image
pub fn cutout_from_image(image: &DynamicImage, config: &CutoutConfig) -> Result<CutoutResult> {
    CutoutProcessor::new(config.clone())?.process_image(image)
}

/// Cut out an image read from an async stream (file, socket, upload body)
///
/// ```rust,no_run
/// use dish_cutout::{cutout_from_reader, CutoutConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("salad.jpg").await?;
/// let result = cutout_from_reader(file, &CutoutConfig::default()).await?;
/// result.save_png("salad.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn cutout_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &CutoutConfig,
) -> Result<CutoutResult> {
    CutoutProcessor::new(config.clone())?.process_reader(reader).await
}
