//! Density-based shadow cleanup (stage 3)
//!
//! Cast shadows are dark but often warm-tinted, so the classifier rejects them
//! and the flood fill stops at their edge. Each pass looks at every remaining
//! dark foreground pixel and asks how much of its neighbourhood is already
//! background; pixels that are mostly surrounded get removed. Removing one
//! ring exposes the next, hence the repeated passes.

use super::classifier::brightness_sum;
use super::mask::BackgroundMask;
use crate::config::SegmentationConfig;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of the shadow cleanup stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowCleanupReport {
    /// Passes executed, including a final pass that found nothing
    pub passes_run: u32,
    /// Pixels reclassified as background
    pub pixels_removed: usize,
}

/// Shadow cleanup parameters with the sampling pattern precomputed
#[derive(Debug, Clone)]
pub struct ShadowCleanup {
    brightness_sum_ceiling: u16,
    offsets: Vec<(i32, i32)>,
    threshold: f32,
    max_passes: u32,
}

impl ShadowCleanup {
    #[must_use]
    pub fn new(brightness_ceiling: u8, radius: u32, step: u32, threshold: f32, max_passes: u32) -> Self {
        Self {
            brightness_sum_ceiling: 3 * u16::from(brightness_ceiling),
            offsets: sample_offsets(radius, step),
            threshold,
            max_passes,
        }
    }

    #[must_use]
    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(
            config.shadow_brightness_ceiling,
            config.shadow_sample_radius,
            config.shadow_sample_step,
            config.shadow_threshold,
            config.shadow_passes,
        )
    }

    /// Sampling offsets relative to the examined pixel
    #[must_use]
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Run up to `max_passes` passes, growing `mask` in place.
    ///
    /// Decisions within a pass only read the mask as it was when the pass
    /// started; queued pixels are committed together afterwards.
    pub fn run(&self, image: &RgbaImage, mask: &mut BackgroundMask) -> ShadowCleanupReport {
        let mut report = ShadowCleanupReport::default();
        if self.offsets.is_empty() || mask.is_empty() {
            return report;
        }

        let (width, height) = image.dimensions();
        let mut queued: Vec<usize> = Vec::new();

        for pass in 0..self.max_passes {
            report.passes_run += 1;
            queued.clear();

            for y in 0..height {
                for x in 0..width {
                    let idx = mask.index(x, y);
                    if mask.is_background(idx) {
                        continue;
                    }
                    let [r, g, b, _] = image.get_pixel(x, y).0;
                    if brightness_sum(r, g, b) >= self.brightness_sum_ceiling {
                        continue;
                    }
                    if self.background_fraction(mask, x, y) > self.threshold {
                        queued.push(idx);
                    }
                }
            }

            if queued.is_empty() {
                trace!(pass, "Shadow cleanup converged");
                break;
            }

            let removed = mask.mark_all(queued.iter().copied());
            trace!(pass, removed, "Shadow cleanup pass committed");
            report.pixels_removed += removed;
        }

        report
    }

    /// Fraction of in-bounds samples around `(x, y)` already marked background
    fn background_fraction(&self, mask: &BackgroundMask, x: u32, y: u32) -> f32 {
        let width = i64::from(mask.width());
        let height = i64::from(mask.height());
        let mut total = 0u32;
        let mut background = 0u32;

        for &(dx, dy) in &self.offsets {
            let nx = i64::from(x) + i64::from(dx);
            let ny = i64::from(y) + i64::from(dy);
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            total += 1;
            if mask.is_background_at(nx as u32, ny as u32) {
                background += 1;
            }
        }

        if total == 0 {
            0.0
        } else {
            background as f32 / total as f32
        }
    }
}

/// Sparse disc of sample offsets: grid points `step` apart within `radius`,
/// excluding the centre.
#[must_use]
pub fn sample_offsets(radius: u32, step: u32) -> Vec<(i32, i32)> {
    let r = radius as i32;
    let step = step.max(1) as usize;
    let r_sq = r * r;

    let mut offsets = Vec::new();
    for dy in (-r..=r).step_by(step) {
        for dx in (-r..=r).step_by(step) {
            if (dx, dy) != (0, 0) && dx * dx + dy * dy <= r_sq {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}
