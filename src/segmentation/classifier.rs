//! Per-pixel backdrop predicate

use crate::config::SegmentationConfig;

/// Decides whether a single RGB value looks like studio backdrop.
///
/// A pixel is backdrop when it is near-neutral (channel spread below the
/// chroma threshold) and no brighter than the backdrop ceiling. Brightness is
/// compared on the channel sum so the hot path stays in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundClassifier {
    chroma_threshold: u8,
    brightness_sum_ceiling: u16,
}

impl BackgroundClassifier {
    #[must_use]
    pub fn new(chroma_threshold: u8, brightness_ceiling: u8) -> Self {
        Self {
            chroma_threshold,
            brightness_sum_ceiling: 3 * u16::from(brightness_ceiling),
        }
    }

    #[must_use]
    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(config.chroma_threshold, config.background_brightness_ceiling)
    }

    /// `true` if the pixel is removable backdrop
    #[inline]
    #[must_use]
    pub fn classify(&self, r: u8, g: u8, b: u8) -> bool {
        channel_spread(r, g, b) < self.chroma_threshold
            && brightness_sum(r, g, b) <= self.brightness_sum_ceiling
    }

    /// Convenience wrapper over an RGBA pixel; alpha is ignored
    #[inline]
    #[must_use]
    pub fn classify_rgba(&self, pixel: &image::Rgba<u8>) -> bool {
        let [r, g, b, _] = pixel.0;
        self.classify(r, g, b)
    }
}

/// `max(|r-g|, |g-b|, |r-b|)`, which equals `max - min` of the channels
#[inline]
#[must_use]
pub fn channel_spread(r: u8, g: u8, b: u8) -> u8 {
    r.max(g).max(b) - r.min(g).min(b)
}

/// `r + g + b`; average brightness times three
#[inline]
#[must_use]
pub fn brightness_sum(r: u8, g: u8, b: u8) -> u16 {
    u16::from(r) + u16::from(g) + u16::from(b)
}
