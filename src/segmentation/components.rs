//! Largest-component selection (stage 4)

use super::mask::BackgroundMask;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Label value for background pixels
pub const UNLABELED: u32 = u32::MAX;

/// 4-connected foreground components of a mask
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    /// One label per pixel, `UNLABELED` for background
    pub labels: Vec<u32>,
    /// Pixel count per label, indexed by label
    pub sizes: Vec<usize>,
}

impl ComponentLabels {
    /// Number of components found
    #[must_use]
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Label of the largest component; ties go to the first found
    #[must_use]
    pub fn largest(&self) -> Option<u32> {
        let mut best: Option<(u32, usize)> = None;
        for (label, &size) in self.sizes.iter().enumerate() {
            if best.map_or(true, |(_, best_size)| size > best_size) {
                best = Some((label as u32, size));
            }
        }
        best.map(|(label, _)| label)
    }
}

/// Outcome of the component selection stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentReport {
    /// Foreground components found before selection
    pub components_found: usize,
    /// Pixel count of the kept component (0 when none)
    pub kept_pixels: usize,
    /// Pixels folded into the background
    pub discarded_pixels: usize,
}

/// Label every 4-connected foreground region.
///
/// Components are seeded in row-major order, so label 0 is the region
/// containing the first foreground pixel.
#[must_use]
pub fn label_components(mask: &BackgroundMask) -> ComponentLabels {
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    let len = mask.len();
    let mut labels = vec![UNLABELED; len];
    let mut sizes: Vec<usize> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for start in 0..len {
        if mask.is_background(start) || labels.get(start) != Some(&UNLABELED) {
            continue;
        }

        let label = sizes.len() as u32;
        let mut size = 0usize;
        labels[start] = label;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            size += 1;
            let x = idx % w;
            let y = idx / w;

            let mut visit = |n: usize| {
                if !mask.is_background(n) && labels[n] == UNLABELED {
                    labels[n] = label;
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

        sizes.push(size);
    }

    ComponentLabels { labels, sizes }
}

/// Fold every component except the largest into the background mask.
///
/// A mask with no foreground is left untouched.
pub fn keep_largest_component(mask: &mut BackgroundMask) -> ComponentReport {
    let components = label_components(mask);
    let Some(keep) = components.largest() else {
        return ComponentReport::default();
    };

    let discard = components
        .labels
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label != UNLABELED && label != keep)
        .map(|(idx, _)| idx);
    let discarded_pixels = mask.mark_all(discard);

    ComponentReport {
        components_found: components.count(),
        kept_pixels: components.sizes.get(keep as usize).copied().unwrap_or(0),
        discarded_pixels,
    }
}
