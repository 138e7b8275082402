//! Border-seeded flood fill (stage 2)

use super::classifier::BackgroundClassifier;
use super::mask::BackgroundMask;
use image::RgbaImage;
use std::collections::VecDeque;

/// Mark all backdrop pixels connected to the image border.
///
/// Seeds are the border pixels that classify as backdrop; the search then
/// expands breadth-first over 4-neighbours through classifier-positive
/// pixels only. Backdrop-coloured pixels enclosed by the subject are never
/// reached. The mask doubles as the visited set, so every pixel is queued at
/// most once and the queue never exceeds the pixel count.
#[must_use]
pub fn border_flood_fill(image: &RgbaImage, classifier: &BackgroundClassifier) -> BackgroundMask {
    let (width, height) = image.dimensions();
    let mut mask = BackgroundMask::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let w = width as usize;
    let h = height as usize;
    let pixels = image.as_raw();
    let is_backdrop = |idx: usize| -> bool {
        let base = idx * 4;
        match pixels.get(base..base + 3) {
            Some(&[r, g, b]) => classifier.classify(r, g, b),
            _ => false,
        }
    };

    let mut queue: VecDeque<usize> = VecDeque::with_capacity(2 * (w + h));

    for idx in border_indices(w, h) {
        if is_backdrop(idx) && mask.mark(idx) {
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let x = idx % w;
        let y = idx / w;

        let mut visit = |n: usize| {
            if !mask.is_background(n) && is_backdrop(n) {
                mask.mark(n);
                queue.push_back(n);
            }
        };

        if x > 0 {
            visit(idx - 1);
        }
        if x + 1 < w {
            visit(idx + 1);
        }
        if y > 0 {
            visit(idx - w);
        }
        if y + 1 < h {
            visit(idx + w);
        }
    }

    mask
}

/// Linear indices of the image border, each corner once
fn border_indices(w: usize, h: usize) -> impl Iterator<Item = usize> {
    let top = 0..w;
    let bottom = (0..w).filter(move |_| h > 1).map(move |x| (h - 1) * w + x);
    let sides = (1..h.saturating_sub(1)).flat_map(move |y| {
        let left = y * w;
        let right = y * w + w - 1;
        std::iter::once(left).chain(std::iter::once(right).filter(move |_| w > 1))
    });
    top.chain(bottom).chain(sides)
}
