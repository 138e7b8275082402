//! Core types for cutout operations

use crate::{
    error::{CutoutError, Result},
    segmentation::{ComponentReport, ShadowCleanupReport, StageTimings},
    services::ImageIOService,
};
use chrono::{DateTime, Utc};
use image::{ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of a cutout operation
#[derive(Debug, Clone)]
pub struct CutoutResult {
    /// The canonical-size cutout
    pub image: RgbaImage,

    /// The cutout encoded as optimized PNG
    pub png_data: Vec<u8>,

    /// Feathered alpha at the input resolution
    pub mask: SegmentationMask,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl CutoutResult {
    /// Create a new cutout result
    #[must_use]
    pub fn new(
        image: RgbaImage,
        png_data: Vec<u8>,
        mask: SegmentationMask,
        original_dimensions: (u32, u32),
        metadata: ProcessingMetadata,
    ) -> Self {
        Self {
            image,
            png_data,
            mask,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Attach the input path used for log messages
    #[must_use]
    pub fn with_input_path<S: Into<String>>(mut self, input_path: S) -> Self {
        self.input_path = Some(input_path.into());
        self
    }

    /// Write the encoded PNG to `path`.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// `path` is either fully replaced or left untouched.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ImageIOService::write_atomic(path, &self.png_data)
    }

    /// Encoded PNG bytes
    #[must_use]
    pub fn png_bytes(&self) -> &[u8] {
        &self.png_data
    }

    /// Output dimensions (always the canonical size)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// What the segmentation stages did
    #[must_use]
    pub fn report(&self) -> &SegmentationReport {
        &self.metadata.segmentation
    }

    /// True when no foreground survived and the output is fully transparent
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.metadata.segmentation.is_degenerate()
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        self.metadata.timings.summary()
    }
}

/// Alpha mask produced by the segmentation stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Alpha values (0 = background, 255 = opaque subject)
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &ImageBuffer<Luma<u8>, Vec<u8>>) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.data.clone())
            .ok_or_else(|| CutoutError::processing("Failed to create image from mask data"))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let transparent_pixels = self.data.iter().filter(|&&a| a == 0).count();
        let opaque_pixels = self.data.iter().filter(|&&a| a == 255).count();
        let ratio = |n: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                n as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            transparent_pixels,
            opaque_pixels,
            partial_pixels: total_pixels - transparent_pixels - opaque_pixels,
            transparent_ratio: ratio(transparent_pixels),
            opaque_ratio: ratio(opaque_pixels),
        }
    }

    /// Save mask as a grayscale PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.to_image()?;
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .map_err(|e| CutoutError::encode(format!("Failed to encode mask PNG: {}", e)))?;
        ImageIOService::write_atomic(path, &buffer)
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub transparent_pixels: usize,
    pub opaque_pixels: usize,
    /// Pixels on the feathered edge
    pub partial_pixels: usize,
    pub transparent_ratio: f32,
    pub opaque_ratio: f32,
}

/// What the segmentation stages did to one image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub total_pixels: usize,
    /// Pixels removed by the border flood fill
    pub flood_filled_pixels: usize,
    pub shadow: ShadowCleanupReport,
    pub components: ComponentReport,
    /// Pixels still foreground after component selection
    pub foreground_pixels: usize,
}

impl SegmentationReport {
    /// No foreground left; the output is fully transparent
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.foreground_pixels == 0
    }

    /// Share of the image kept as subject
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.foreground_pixels as f32 / self.total_pixels as f32
        }
    }
}

/// Detailed timing breakdown for one cutout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image loading and decoding
    pub image_decode_ms: u64,
    pub flood_fill_ms: u64,
    pub shadow_cleanup_ms: u64,
    pub component_selection_ms: u64,
    pub feathering_ms: u64,
    /// Fitting into the canonical canvas
    pub resize_ms: u64,
    /// PNG encoding and optimization
    pub encode_ms: u64,
    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy per-stage segmentation timings in
    pub fn record_stages(&mut self, stages: &StageTimings) {
        self.flood_fill_ms = stages.flood_fill_ms;
        self.shadow_cleanup_ms = stages.shadow_cleanup_ms;
        self.component_selection_ms = stages.component_selection_ms;
        self.feathering_ms = stages.feathering_ms;
    }

    /// Time spent in stages 2 to 5
    #[must_use]
    pub fn segmentation_ms(&self) -> u64 {
        self.flood_fill_ms + self.shadow_cleanup_ms + self.component_selection_ms + self.feathering_ms
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Decode: {}ms | Flood fill: {}ms | Shadow: {}ms | Components: {}ms | Feather: {}ms | Resize: {}ms | Encode: {}ms",
            self.total_ms,
            self.image_decode_ms,
            self.flood_fill_ms,
            self.shadow_cleanup_ms,
            self.component_selection_ms,
            self.feathering_ms,
            self.resize_ms,
            self.encode_ms
        )
    }
}

/// Metadata recorded for each cutout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// When processing finished
    pub processed_at: DateTime<Utc>,
    pub timings: ProcessingTimings,
    pub segmentation: SegmentationReport,
    /// Side of the square output canvas
    pub canonical_size: u32,
    /// Size of the encoded PNG
    pub encoded_bytes: usize,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(canonical_size: u32) -> Self {
        Self {
            processed_at: Utc::now(),
            timings: ProcessingTimings::new(),
            segmentation: SegmentationReport::default(),
            canonical_size,
            encoded_bytes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_statistics() {
        let mask = SegmentationMask::new(vec![0, 0, 128, 255], (2, 2));
        let stats = mask.statistics();
        assert_eq!(stats.total_pixels, 4);
        assert_eq!(stats.transparent_pixels, 2);
        assert_eq!(stats.opaque_pixels, 1);
        assert_eq!(stats.partial_pixels, 1);
        assert!((stats.transparent_ratio - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_mask_statistics() {
        let stats = SegmentationMask::new(Vec::new(), (0, 0)).statistics();
        assert_eq!(stats.total_pixels, 0);
        assert!(stats.opaque_ratio.abs() < f32::EPSILON);
    }

    #[test]
    fn test_mask_to_image_rejects_bad_length() {
        let mask = SegmentationMask::new(vec![0; 3], (2, 2));
        assert!(mask.to_image().is_err());
        let mask = SegmentationMask::new(vec![7; 4], (2, 2));
        assert_eq!(mask.to_image().unwrap().get_pixel(1, 1).0, [7]);
    }

    #[test]
    fn test_mask_encode_failure_is_an_encode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty_mask.png");
        // PNG has no representation for a 0x0 image
        let err = SegmentationMask::new(Vec::new(), (0, 0)).save_png(&path).unwrap_err();
        assert!(matches!(err, CutoutError::Encode(_)), "unexpected error: {:?}", err);
        assert!(!path.exists());
    }

    #[test]
    fn test_report_degenerate() {
        let report = SegmentationReport {
            total_pixels: 100,
            ..SegmentationReport::default()
        };
        assert!(report.is_degenerate());
        assert!(report.foreground_ratio().abs() < f32::EPSILON);

        let report = SegmentationReport {
            total_pixels: 100,
            foreground_pixels: 25,
            ..SegmentationReport::default()
        };
        assert!(!report.is_degenerate());
        assert!((report.foreground_ratio() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_timings_summary() {
        let mut timings = ProcessingTimings::new();
        timings.record_stages(&StageTimings {
            flood_fill_ms: 3,
            shadow_cleanup_ms: 20,
            component_selection_ms: 4,
            feathering_ms: 2,
        });
        timings.total_ms = 50;
        assert_eq!(timings.segmentation_ms(), 29);
        let summary = timings.summary();
        assert!(summary.contains("Total: 50ms"));
        assert!(summary.contains("Shadow: 20ms"));
    }

    #[test]
    fn test_metadata_serializes() {
        let metadata = ProcessingMetadata::new(512);
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"canonical_size\":512"));
        assert!(json.contains("processed_at"));
    }
}
