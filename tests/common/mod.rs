//! Synthetic studio shots shared by the integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Uniform dark-grey studio backdrop
pub const BACKDROP: Rgba<u8> = Rgba([112, 112, 112, 255]);

/// Warm, saturated, bright enough to never pass as backdrop or shadow
pub const SUBJECT: Rgba<u8> = Rgba([240, 200, 60, 255]);

/// Dark neutral halo colour: shadow candidate, but not backdrop
pub const SHADOW: Rgba<u8> = Rgba([150, 150, 150, 255]);

pub fn backdrop(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, BACKDROP)
}

/// Paint a filled disc
pub fn disc(image: &mut RgbaImage, cx: i64, cy: i64, radius: i64, color: Rgba<u8>) {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = i64::from(x) - cx;
        let dy = i64::from(y) - cy;
        if dx * dx + dy * dy <= radius * radius {
            *pixel = color;
        }
    }
}

/// Paint a filled axis-aligned rectangle
pub fn rect(image: &mut RgbaImage, x0: u32, y0: u32, width: u32, height: u32, color: Rgba<u8>) {
    for y in y0..(y0 + height).min(image.height()) {
        for x in x0..(x0 + width).min(image.width()) {
            image.put_pixel(x, y, color);
        }
    }
}

/// The reference shot: a 600px bright dish centred on a 1024x768 backdrop
pub fn reference_dish() -> RgbaImage {
    let mut image = backdrop(1024, 768);
    disc(&mut image, 512, 384, 300, SUBJECT);
    image
}

/// A small plate, cheap enough for batch tests
pub fn small_dish() -> RgbaImage {
    let mut image = backdrop(96, 72);
    disc(&mut image, 48, 36, 20, SUBJECT);
    image
}

pub fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    let dynamic = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image.clone()).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image.clone()),
    };
    dynamic
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode test image");
    bytes
}

pub fn write_image(path: &Path, image: &RgbaImage) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    std::fs::write(path, encode(image, format)).expect("Failed to write fixture");
}

pub fn alpha_at(image: &RgbaImage, x: u32, y: u32) -> u8 {
    image.get_pixel(x, y)[3]
}

pub fn rgb_at(image: &RgbaImage, x: u32, y: u32) -> [u8; 3] {
    let p = image.get_pixel(x, y);
    [p[0], p[1], p[2]]
}
