//! Edge feathering (stage 5)

use super::mask::BackgroundMask;
use crate::error::{CutoutError, Result};
use image::RgbaImage;

/// Window offsets within `radius`, nearest first
fn window_offsets(radius: u32) -> Vec<(i32, i32, f32)> {
    let r = radius as i32;
    let mut offsets: Vec<(i32, i32, f32)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| (dx, dy) != (0, 0))
        .map(|(dx, dy)| (dx, dy, ((dx * dx + dy * dy) as f32).sqrt()))
        .collect();
    offsets.sort_by(|a, b| a.2.total_cmp(&b.2));
    offsets
}

/// Bounded distance from each pixel to the nearest background pixel.
///
/// Background pixels are 0. Foreground pixels get the Euclidean distance to
/// the closest background pixel inside the `(2r+1)²` window, or
/// `f32::INFINITY` if there is none. Pixels outside the image are ignored.
#[must_use]
pub fn distance_field(mask: &BackgroundMask, radius: u32) -> Vec<f32> {
    let width = i64::from(mask.width());
    let height = i64::from(mask.height());
    let offsets = window_offsets(radius);
    let mut field = vec![f32::INFINITY; mask.len()];

    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let idx = mask.index(x, y);
            let distance = if mask.is_background(idx) {
                0.0
            } else {
                offsets
                    .iter()
                    .find(|&&(dx, dy, _)| {
                        let nx = i64::from(x) + i64::from(dx);
                        let ny = i64::from(y) + i64::from(dy);
                        nx >= 0
                            && ny >= 0
                            && nx < width
                            && ny < height
                            && mask.is_background_at(nx as u32, ny as u32)
                    })
                    .map_or(f32::INFINITY, |&(_, _, d)| d)
            };
            if let Some(slot) = field.get_mut(idx) {
                *slot = distance;
            }
        }
    }

    field
}

/// Map a distance to an alpha value on a linear ramp of width `radius`
#[inline]
#[must_use]
pub fn ramp_alpha(distance: f32, radius: u32) -> u8 {
    if distance <= 0.0 {
        return 0;
    }
    let radius = radius as f32;
    if radius <= 0.0 || distance >= radius {
        return 255;
    }
    (255.0 * distance / radius).round().clamp(0.0, 255.0) as u8
}

/// Per-pixel alpha for the current mask
#[must_use]
pub fn feather_alpha(mask: &BackgroundMask, radius: u32) -> Vec<u8> {
    distance_field(mask, radius)
        .into_iter()
        .map(|d| ramp_alpha(d, radius))
        .collect()
}

/// Write `alpha` into the alpha channel of `image`; RGB is left untouched
pub fn apply_alpha(image: &mut RgbaImage, alpha: &[u8]) -> Result<()> {
    let expected = image.width() as usize * image.height() as usize;
    if alpha.len() != expected {
        return Err(CutoutError::processing_stage_error(
            "feathering",
            &format!("alpha has {} values, image has {} pixels", alpha.len(), expected),
            Some(&format!("{}x{}", image.width(), image.height())),
        ));
    }

    for (pixel, &a) in image.pixels_mut().zip(alpha) {
        pixel.0[3] = a;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Left half background, right half foreground
    fn half_mask(width: u32, height: u32, split: u32) -> BackgroundMask {
        let mut mask = BackgroundMask::new(width, height);
        for y in 0..height {
            for x in 0..split {
                let idx = mask.index(x, y);
                mask.mark(idx);
            }
        }
        mask
    }

    #[test]
    fn test_ramp_alpha() {
        assert_eq!(ramp_alpha(0.0, 2), 0);
        assert_eq!(ramp_alpha(1.0, 2), 128);
        assert_eq!(ramp_alpha(std::f32::consts::SQRT_2, 2), 180);
        assert_eq!(ramp_alpha(2.0, 2), 255);
        assert_eq!(ramp_alpha(f32::INFINITY, 2), 255);
        assert_eq!(ramp_alpha(1.0, 0), 255);
    }

    #[test]
    fn test_distance_field_straight_edge() {
        let mask = half_mask(8, 3, 3);
        let field = distance_field(&mask, 2);
        let row: Vec<f32> = (0..8).map(|x| field[mask.index(x, 1)]).collect();
        assert_eq!(&row[..3], &[0.0, 0.0, 0.0]);
        assert!((row[3] - 1.0).abs() < 1e-6);
        assert!((row[4] - 2.0).abs() < 1e-6);
        assert!(row[5].is_infinite());
    }

    #[test]
    fn test_alpha_is_monotonic_away_from_background() {
        let mask = half_mask(10, 5, 4);
        let alpha = feather_alpha(&mask, 3);
        for y in 0..5 {
            let row: Vec<u8> = (0..10).map(|x| alpha[mask.index(x, y)]).collect();
            assert!(row.windows(2).all(|w| w[0] <= w[1]), "row {y}: {row:?}");
            assert_eq!(row[9], 255);
            assert_eq!(row[0], 0);
        }
    }

    #[test]
    fn test_zero_radius_gives_hard_edge() {
        let mask = half_mask(6, 2, 3);
        let alpha = feather_alpha(&mask, 0);
        assert_eq!(&alpha[..6], &[0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_image_border_is_not_background() {
        let mask = BackgroundMask::new(4, 4);
        let alpha = feather_alpha(&mask, 2);
        assert!(alpha.iter().all(|&a| a == 255));
    }

    #[test]
    fn test_apply_alpha_preserves_rgb() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 255]));
        apply_alpha(&mut img, &[0, 128, 255]).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [10, 20, 30, 128]);
        assert_eq!(img.get_pixel(2, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_apply_alpha_rejects_wrong_length() {
        let mut img = RgbaImage::new(2, 2);
        assert!(apply_alpha(&mut img, &[0; 3]).is_err());
    }
}
