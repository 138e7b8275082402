//! Backdrop segmentation stages
//!
//! Stages run strictly in order on one image, each consuming the mask left
//! by the previous one:
//!
//! 1. [`classifier`] decides per pixel whether it looks like backdrop
//! 2. [`flood_fill`] removes backdrop connected to the border
//! 3. [`shadow`] peels away dark halo pixels mostly surrounded by background
//! 4. [`components`] keeps only the largest foreground region
//! 5. [`feather`] turns the final mask into a graded alpha channel
//!
//! Resizing and encoding (stage 6) live in [`crate::services::format`].

pub mod classifier;
pub mod components;
pub mod feather;
pub mod flood_fill;
pub mod mask;
pub mod shadow;

pub use classifier::BackgroundClassifier;
pub use components::{keep_largest_component, label_components, ComponentLabels, ComponentReport};
pub use feather::{apply_alpha, distance_field, feather_alpha};
pub use flood_fill::border_flood_fill;
pub use mask::BackgroundMask;
pub use shadow::{ShadowCleanup, ShadowCleanupReport};

use crate::{
    config::SegmentationConfig,
    error::Result,
    services::ProcessingStage,
    types::{SegmentationMask, SegmentationReport},
};
use image::RgbaImage;
use instant::Instant;
use tracing::{debug, instrument, warn};

/// Wall-clock time spent in each segmentation stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub flood_fill_ms: u64,
    pub shadow_cleanup_ms: u64,
    pub component_selection_ms: u64,
    pub feathering_ms: u64,
}

/// Output of stages 1 to 5
#[derive(Debug, Clone)]
pub struct SegmentationOutcome {
    /// Input RGB with the feathered alpha written in
    pub image: RgbaImage,
    /// The alpha channel on its own
    pub mask: SegmentationMask,
    pub report: SegmentationReport,
    pub timings: StageTimings,
}

/// Runs the segmentation stages with one fixed configuration.
///
/// Holds no per-image state; a single instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Segmenter {
    classifier: BackgroundClassifier,
    shadow: ShadowCleanup,
    feather_radius: u32,
}

impl Segmenter {
    #[must_use]
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            classifier: BackgroundClassifier::from_config(config),
            shadow: ShadowCleanup::from_config(config),
            feather_radius: config.feather_radius,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &BackgroundClassifier {
        &self.classifier
    }

    /// Compute the final background mask (stages 1 to 4) without touching alpha
    pub fn background_mask(&self, image: &RgbaImage) -> (BackgroundMask, SegmentationReport, StageTimings) {
        self.background_mask_with(image, &mut |_| {})
    }

    fn background_mask_with(
        &self,
        image: &RgbaImage,
        on_stage: &mut dyn FnMut(ProcessingStage),
    ) -> (BackgroundMask, SegmentationReport, StageTimings) {
        let mut timings = StageTimings::default();
        let mut report = SegmentationReport {
            total_pixels: image.width() as usize * image.height() as usize,
            ..SegmentationReport::default()
        };

        on_stage(ProcessingStage::FloodFill);
        let start = Instant::now();
        let mut mask = border_flood_fill(image, &self.classifier);
        timings.flood_fill_ms = start.elapsed().as_millis() as u64;
        report.flood_filled_pixels = mask.background_count();
        debug!(
            pixels = report.flood_filled_pixels,
            ms = timings.flood_fill_ms,
            "Border flood fill complete"
        );

        on_stage(ProcessingStage::ShadowCleanup);
        let start = Instant::now();
        report.shadow = self.shadow.run(image, &mut mask);
        timings.shadow_cleanup_ms = start.elapsed().as_millis() as u64;
        debug!(
            removed = report.shadow.pixels_removed,
            passes = report.shadow.passes_run,
            ms = timings.shadow_cleanup_ms,
            "Shadow cleanup complete"
        );

        on_stage(ProcessingStage::ComponentSelection);
        let start = Instant::now();
        report.components = keep_largest_component(&mut mask);
        timings.component_selection_ms = start.elapsed().as_millis() as u64;
        debug!(
            components = report.components.components_found,
            kept = report.components.kept_pixels,
            discarded = report.components.discarded_pixels,
            ms = timings.component_selection_ms,
            "Component selection complete"
        );

        report.foreground_pixels = mask.foreground_count();
        (mask, report, timings)
    }

    /// Run stages 1 to 5 on `image`, returning a copy with feathered alpha.
    ///
    /// An input that is entirely backdrop is not an error: the result is
    /// fully transparent and [`SegmentationReport::is_degenerate`] is set.
    pub fn run(&self, image: &RgbaImage) -> Result<SegmentationOutcome> {
        self.run_with_progress(image, |_| {})
    }

    /// Like [`Segmenter::run`], calling `on_stage` as each stage starts
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn run_with_progress<F>(&self, image: &RgbaImage, mut on_stage: F) -> Result<SegmentationOutcome>
    where
        F: FnMut(ProcessingStage),
    {
        let (mask, report, mut timings) = self.background_mask_with(image, &mut on_stage);

        on_stage(ProcessingStage::Feathering);
        let start = Instant::now();
        let alpha = feather_alpha(&mask, self.feather_radius);
        let mut output = image.clone();
        apply_alpha(&mut output, &alpha)?;
        timings.feathering_ms = start.elapsed().as_millis() as u64;

        if report.is_degenerate() {
            warn!("Segmentation left no foreground; output will be fully transparent");
        }

        Ok(SegmentationOutcome {
            image: output,
            mask: SegmentationMask::new(alpha, image.dimensions()),
            report,
            timings,
        })
    }
}
