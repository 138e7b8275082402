//! Monotonic background mask
//!
//! One boolean per pixel, row-major. Pixels can only ever be marked as
//! background; no method clears a mark. Every stage after the flood fill
//! therefore only grows the mask.

/// Per-pixel background flags for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundMask {
    data: Vec<bool>,
    width: u32,
    height: u32,
}

impl BackgroundMask {
    /// Create an empty mask (everything foreground)
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![false; width as usize * height as usize],
            width,
            height,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of `(x, y)`
    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Background flag at a linear index; out-of-range indices read as foreground
    #[inline]
    #[must_use]
    pub fn is_background(&self, idx: usize) -> bool {
        self.data.get(idx).copied().unwrap_or(false)
    }

    /// Background flag at `(x, y)`
    #[inline]
    #[must_use]
    pub fn is_background_at(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.is_background(self.index(x, y))
    }

    /// Mark a pixel as background. Returns `true` if the flag changed.
    #[inline]
    pub fn mark(&mut self, idx: usize) -> bool {
        match self.data.get_mut(idx) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            },
            _ => false,
        }
    }

    /// Mark every index in `indices`, returning how many flags changed
    pub fn mark_all<I: IntoIterator<Item = usize>>(&mut self, indices: I) -> usize {
        indices.into_iter().filter(|&idx| self.mark(idx)).count()
    }

    /// Number of background pixels
    #[must_use]
    pub fn background_count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Number of foreground pixels
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.len() - self.background_count()
    }

    /// Whether every pixel is background
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.data.iter().all(|&b| b)
    }

    /// Raw row-major flags
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }
}
