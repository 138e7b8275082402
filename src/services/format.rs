//! Canonical canvas fitting and PNG encoding (stage 6)

use crate::{
    config::{OutputConfig, ResizeFilter},
    error::{CutoutError, Result},
};
use image::{imageops, ImageFormat, Rgba, Rgba32FImage, RgbaImage};
use std::io::Cursor;

/// Service for turning a full-resolution cutout into the canonical output
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Size of `(width, height)` scaled to fit inside a `size`×`size` square.
    ///
    /// Scales up or down by `min(size/width, size/height)`; each side is
    /// rounded and clamped to `1..=size`.
    #[must_use]
    pub fn fit_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
        if width == 0 || height == 0 || size == 0 {
            return (0, 0);
        }
        let size_f = f64::from(size);
        let scale = (size_f / f64::from(width)).min(size_f / f64::from(height));
        let fit = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, size);
        (fit(width), fit(height))
    }

    /// Fit `image` into a fully transparent `size`×`size` canvas, centered.
    ///
    /// An input that is already `size`×`size` is copied without resampling.
    pub fn fit_to_canvas(image: &RgbaImage, size: u32, filter: ResizeFilter) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CutoutError::processing_stage_error(
                "canvas fitting",
                "input image has no pixels",
                Some(&format!("{}x{}", width, height)),
            ));
        }
        if size == 0 {
            return Err(CutoutError::invalid_config("canonical size must be at least 1"));
        }
        if width == size && height == size {
            return Ok(image.clone());
        }

        let (new_width, new_height) = Self::fit_dimensions(width, height, size);
        let resized = Self::resize_premultiplied(image, new_width, new_height, filter);

        let mut canvas = RgbaImage::new(size, size);
        let offset_x = (size - new_width) / 2;
        let offset_y = (size - new_height) / 2;
        imageops::replace(&mut canvas, &resized, i64::from(offset_x), i64::from(offset_y));

        log::debug!(
            "Fitted {}x{} into {}x{} canvas at ({}, {}) using {}",
            width,
            height,
            size,
            size,
            offset_x,
            offset_y,
            filter
        );
        Ok(canvas)
    }

    /// Resample with colour weighted by alpha.
    ///
    /// Fully transparent pixels still carry the backdrop colour; resampling
    /// straight RGBA would bleed it into the feathered edge. Colour is
    /// multiplied by alpha before filtering and divided back out afterwards.
    /// Pixels that end up fully transparent get zero RGB.
    pub fn resize_premultiplied(
        image: &RgbaImage,
        width: u32,
        height: u32,
        filter: ResizeFilter,
    ) -> RgbaImage {
        let premultiplied = Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            let alpha = f32::from(a) / 255.0;
            Rgba([
                f32::from(r) / 255.0 * alpha,
                f32::from(g) / 255.0 * alpha,
                f32::from(b) / 255.0 * alpha,
                alpha,
            ])
        });
        let resized = imageops::resize(&premultiplied, width, height, filter.to_filter_type());

        RgbaImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = resized.get_pixel(x, y).0;
            let alpha = (a * 255.0).round().clamp(0.0, 255.0) as u8;
            if alpha == 0 {
                return Rgba([0, 0, 0, 0]);
            }
            let unmultiply = |c: f32| (c / a * 255.0).round().clamp(0.0, 255.0) as u8;
            Rgba([unmultiply(r), unmultiply(g), unmultiply(b), alpha])
        })
    }

    /// Encode as RGBA PNG, then losslessly recompress when enabled.
    ///
    /// Recompression reduces color type and bit depth where possible (a
    /// palette with transparency for most cutouts). Transparent pixels keep
    /// their RGB values. If optimization fails the plain PNG is returned.
    pub fn encode_png(image: &RgbaImage, output: &OutputConfig) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| CutoutError::encode(format!("Failed to encode PNG: {}", e)))?;

        if !output.optimize_png {
            return Ok(png_bytes);
        }

        let mut options = oxipng::Options::from_preset(output.png_optimization_level.min(6));
        options.strip = oxipng::StripChunks::Safe;
        options.optimize_alpha = false;

        match oxipng::optimize_from_memory(&png_bytes, &options) {
            Ok(optimized) => {
                log::debug!(
                    "PNG optimized from {} to {} bytes (level {})",
                    png_bytes.len(),
                    optimized.len(),
                    output.png_optimization_level
                );
                Ok(optimized)
            },
            Err(e) => {
                log::warn!("PNG optimization failed, writing unoptimized output: {}", e);
                Ok(png_bytes)
            },
        }
    }

    /// Fit into the canonical canvas and encode in one step
    pub fn render(image: &RgbaImage, output: &OutputConfig) -> Result<(RgbaImage, Vec<u8>)> {
        let canvas = Self::fit_to_canvas(image, output.canonical_size, output.resize_filter)?;
        let bytes = Self::encode_png(&canvas, output)?;
        Ok((canvas, bytes))
    }
}
