//! Configuration types for cutout operations
//!
//! All thresholds and radii used by the pipeline live here. The defaults are
//! the values tuned for generated studio shots on a mid-grey backdrop; they
//! are meant to be recalibrated for other subject/backdrop schemes, either
//! through the builder or a JSON file.

use crate::error::{CutoutError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resampling filter used when fitting the cutout into the canonical canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Nearest neighbour (blocky, no new colors)
    Nearest,
    /// Linear filter
    Triangle,
    /// Cubic filter
    CatmullRom,
    /// Gaussian filter
    Gaussian,
    /// Lanczos with window 3 (sharpest, default)
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    /// Map to the `image` crate filter type
    #[must_use]
    pub fn to_filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Triangle => write!(f, "triangle"),
            Self::CatmullRom => write!(f, "catmullrom"),
            Self::Gaussian => write!(f, "gaussian"),
            Self::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// Segmentation thresholds (stages 1 to 5)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Maximum channel spread (exclusive) for a pixel to count as neutral backdrop
    pub chroma_threshold: u8,

    /// Average brightness ceiling (inclusive) for backdrop pixels
    pub background_brightness_ceiling: u8,

    /// Average brightness ceiling (exclusive) for shadow candidates
    pub shadow_brightness_ceiling: u8,

    /// Radius of the sampling disc used by shadow cleanup, in pixels
    pub shadow_sample_radius: u32,

    /// Grid step between samples inside the shadow sampling disc
    pub shadow_sample_step: u32,

    /// Background fraction that must be exceeded for a shadow pixel to be removed
    pub shadow_threshold: f32,

    /// Maximum number of shadow cleanup passes (0 disables the stage)
    pub shadow_passes: u32,

    /// Width of the alpha ramp at the subject boundary (0 = hard edge)
    pub feather_radius: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            chroma_threshold: 20,
            background_brightness_ceiling: 140,
            shadow_brightness_ceiling: 160,
            shadow_sample_radius: 12,
            shadow_sample_step: 2,
            shadow_threshold: 0.45,
            shadow_passes: 5,
            feather_radius: 2,
        }
    }
}

/// Output canvas and encoding settings (stage 6)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Side length of the square output canvas
    pub canonical_size: u32,

    /// Resampling filter
    pub resize_filter: ResizeFilter,

    /// Run lossless PNG optimization (palette and bit-depth reduction)
    pub optimize_png: bool,

    /// oxipng preset level (0-6)
    pub png_optimization_level: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            canonical_size: 512,
            resize_filter: ResizeFilter::default(),
            optimize_png: true,
            png_optimization_level: 2,
        }
    }
}

/// Configuration for cutout operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CutoutConfig {
    /// Segmentation thresholds
    pub segmentation: SegmentationConfig,

    /// Canvas and encoding settings
    pub output: OutputConfig,

    /// Enable debug mode (additional logging and validation)
    pub debug: bool,
}

/// Largest accepted canonical canvas side
pub const MAX_CANONICAL_SIZE: u32 = 8192;

/// Largest accepted shadow sampling radius
pub const MAX_SHADOW_SAMPLE_RADIUS: u32 = 128;

/// Largest accepted feather radius
pub const MAX_FEATHER_RADIUS: u32 = 64;

impl CutoutConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dish_cutout::CutoutConfig;
    ///
    /// let config = CutoutConfig::builder()
    ///     .feather_radius(3)
    ///     .canonical_size(256)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.output.canonical_size, 256);
    /// ```
    #[must_use]
    pub fn builder() -> CutoutConfigBuilder {
        CutoutConfigBuilder::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CutoutError::invalid_config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| CutoutError::file_io_error("read config file", path_ref, &e))?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CutoutError::internal(format!("Failed to serialize config: {}", e)))
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - chroma threshold: 1-255
    /// - shadow threshold: 0.0-1.0 (finite)
    /// - shadow sample step: at least 1
    /// - shadow sample radius: 0-128
    /// - feather radius: 0-64
    /// - canonical size: 1-8192
    /// - PNG optimization level: 0-6
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dish_cutout::CutoutConfig;
    ///
    /// let mut config = CutoutConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.output.canonical_size = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let seg = &self.segmentation;
        let defaults = SegmentationConfig::default();

        if seg.chroma_threshold == 0 {
            return Err(CutoutError::config_value_error(
                "chroma threshold",
                seg.chroma_threshold,
                "1-255",
                Some(defaults.chroma_threshold),
            ));
        }

        if !seg.shadow_threshold.is_finite() || !(0.0..=1.0).contains(&seg.shadow_threshold) {
            return Err(CutoutError::config_value_error(
                "shadow threshold",
                seg.shadow_threshold,
                "0.0-1.0",
                Some(defaults.shadow_threshold),
            ));
        }

        if seg.shadow_sample_step == 0 {
            return Err(CutoutError::config_value_error(
                "shadow sample step",
                seg.shadow_sample_step,
                ">= 1",
                Some(defaults.shadow_sample_step),
            ));
        }

        if seg.shadow_sample_radius > MAX_SHADOW_SAMPLE_RADIUS {
            return Err(CutoutError::config_value_error(
                "shadow sample radius",
                seg.shadow_sample_radius,
                "0-128",
                Some(defaults.shadow_sample_radius),
            ));
        }

        if seg.feather_radius > MAX_FEATHER_RADIUS {
            return Err(CutoutError::config_value_error(
                "feather radius",
                seg.feather_radius,
                "0-64",
                Some(defaults.feather_radius),
            ));
        }

        if self.output.canonical_size == 0 || self.output.canonical_size > MAX_CANONICAL_SIZE {
            return Err(CutoutError::config_value_error(
                "canonical size",
                self.output.canonical_size,
                "1-8192",
                Some(512),
            ));
        }

        if self.output.png_optimization_level > 6 {
            return Err(CutoutError::config_value_error(
                "PNG optimization level",
                self.output.png_optimization_level,
                "0-6",
                Some(2),
            ));
        }

        if seg.shadow_brightness_ceiling < seg.background_brightness_ceiling {
            log::warn!(
                "Shadow brightness ceiling ({}) is below the background ceiling ({}); shadow cleanup will only see pixels the classifier already rejected for chroma",
                seg.shadow_brightness_ceiling,
                seg.background_brightness_ceiling
            );
        }

        Ok(())
    }
}

/// Builder for `CutoutConfig`
#[derive(Debug, Default)]
pub struct CutoutConfigBuilder {
    config: CutoutConfig,
}

impl CutoutConfigBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: CutoutConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn chroma_threshold(mut self, threshold: u8) -> Self {
        self.config.segmentation.chroma_threshold = threshold;
        self
    }

    #[must_use]
    pub fn background_brightness_ceiling(mut self, ceiling: u8) -> Self {
        self.config.segmentation.background_brightness_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn shadow_brightness_ceiling(mut self, ceiling: u8) -> Self {
        self.config.segmentation.shadow_brightness_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn shadow_sample_radius(mut self, radius: u32) -> Self {
        self.config.segmentation.shadow_sample_radius = radius;
        self
    }

    #[must_use]
    pub fn shadow_sample_step(mut self, step: u32) -> Self {
        self.config.segmentation.shadow_sample_step = step;
        self
    }

    #[must_use]
    pub fn shadow_threshold(mut self, threshold: f32) -> Self {
        self.config.segmentation.shadow_threshold = threshold;
        self
    }

    #[must_use]
    pub fn shadow_passes(mut self, passes: u32) -> Self {
        self.config.segmentation.shadow_passes = passes;
        self
    }

    #[must_use]
    pub fn feather_radius(mut self, radius: u32) -> Self {
        self.config.segmentation.feather_radius = radius;
        self
    }

    #[must_use]
    pub fn canonical_size(mut self, size: u32) -> Self {
        self.config.output.canonical_size = size;
        self
    }

    #[must_use]
    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.config.output.resize_filter = filter;
        self
    }

    #[must_use]
    pub fn optimize_png(mut self, optimize: bool) -> Self {
        self.config.output.optimize_png = optimize;
        self
    }

    /// Set the oxipng preset level (clamped to 0-6)
    #[must_use]
    pub fn png_optimization_level(mut self, level: u8) -> Self {
        self.config.output.png_optimization_level = level.min(6);
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CutoutConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
