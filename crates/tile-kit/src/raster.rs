//! Owned 8-bit rasters.
//!
//! [`Raster`] is the single pixel container used by the crate: image tiles
//! are 3-channel rasters, masks are 1-channel rasters ([`DenseMask`]).
//! Samples are stored row-major with channels interleaved, so sample
//! `(row, col, ch)` lives at `(row * width + col) * channels + ch`.

use crate::source::Window;

/// A row-major, channel-interleaved 8-bit raster.
///
/// # Example
///
/// ```
/// use tile_kit::Raster;
///
/// let mut tile = Raster::new(2, 3, 3);
/// tile.set(1, 2, 0, 200);
/// assert_eq!(tile.get(1, 2, 0), 200);
/// assert_eq!(tile.data().len(), 2 * 3 * 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<u8>,
}

/// A single-channel raster of small integer labels.
///
/// After decoding an RLE annotation the values are `{0, 1}`; after class
/// multiplication they are `{0, class_index}`.
pub type DenseMask = Raster;

impl Raster {
    /// Create a zero-filled raster.
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            data: vec![0; height * width * channels],
        }
    }

    /// Create a zero-filled single-channel mask.
    #[inline]
    pub fn mask(height: usize, width: usize) -> DenseMask {
        Self::new(height, width, 1)
    }

    /// Wrap existing samples.
    ///
    /// Returns `None` when `data.len() != height * width * channels`.
    pub fn from_vec(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != height * width * channels {
            return None;
        }
        Some(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Create a raster where every pixel has the given per-channel value.
    pub fn filled(height: usize, width: usize, pixel: &[u8]) -> Self {
        let mut data = Vec::with_capacity(height * width * pixel.len());
        for _ in 0..height * width {
            data.extend_from_slice(pixel);
        }
        Self {
            height,
            width,
            channels: pixel.len(),
            data,
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(height, width)` of the raster.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.width + col) * self.channels + channel
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize, channel: usize) -> u8 {
        self.data[self.offset(row, col, channel)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: u8) {
        let i = self.offset(row, col, channel);
        self.data[i] = value;
    }

    /// Iterate over pixels as channel slices, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Largest sample value (0 for an empty raster).
    pub fn max_value(&self) -> u8 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all samples across all channels.
    pub fn sample_sum(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }

    /// Multiply every sample by `factor`, saturating at 255.
    pub fn scale_labels(&mut self, factor: u8) {
        for v in &mut self.data {
            *v = v.saturating_mul(factor);
        }
    }

    /// Copy the sub-rectangle `window` of `self` into a new raster.
    ///
    /// # Panics
    ///
    /// Panics if `window` extends past the raster bounds.
    pub fn crop(&self, window: Window) -> Raster {
        assert!(
            window.row_end <= self.height && window.col_end <= self.width,
            "crop window {:?} outside {}x{} raster",
            window,
            self.height,
            self.width
        );
        let mut out = Raster::new(window.height(), window.width(), self.channels);
        let row_len = window.width() * self.channels;
        for r in 0..window.height() {
            let src = self.offset(window.row_start + r, window.col_start, 0);
            let dst = r * row_len;
            out.data[dst..dst + row_len].copy_from_slice(&self.data[src..src + row_len]);
        }
        out
    }

    /// Paste `rows x cols` samples of row-major, channel-interleaved `src`
    /// (with `src_channels` channels per pixel) at `(row, col)`.
    ///
    /// When `src_channels == 1` and `self` has more channels, the samples
    /// land in `channel` only. Otherwise channel counts must match and
    /// `channel` is ignored.
    pub(crate) fn paste(
        &mut self,
        src: &[u8],
        rows: usize,
        cols: usize,
        src_channels: usize,
        (row, col): (usize, usize),
        channel: usize,
    ) {
        debug_assert_eq!(src.len(), rows * cols * src_channels);
        debug_assert!(row + rows <= self.height && col + cols <= self.width);

        if src_channels == self.channels {
            let row_len = cols * self.channels;
            for r in 0..rows {
                let dst = self.offset(row + r, col, 0);
                let s = r * row_len;
                self.data[dst..dst + row_len].copy_from_slice(&src[s..s + row_len]);
            }
        } else {
            for r in 0..rows {
                for c in 0..cols {
                    let dst = self.offset(row + r, col + c, channel);
                    self.data[dst] = src[r * cols + c];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Raster::from_vec(2, 2, 3, vec![0; 11]).is_none());
        assert!(Raster::from_vec(2, 2, 3, vec![0; 12]).is_some());
    }

    #[test]
    fn test_crop_copies_window() {
        let mut r = Raster::mask(3, 4);
        for row in 0..3 {
            for col in 0..4 {
                r.set(row, col, 0, (row * 10 + col) as u8);
            }
        }
        let c = r.crop(Window::new(1, 3, 2, 4));
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c.data(), &[12, 13, 22, 23]);
    }

    #[test]
    fn test_paste_single_channel_into_rgb() {
        let mut r = Raster::new(2, 2, 3);
        r.paste(&[7, 8], 1, 2, 1, (1, 0), 2);
        assert_eq!(r.get(1, 0, 2), 7);
        assert_eq!(r.get(1, 1, 2), 8);
        assert_eq!(r.get(1, 1, 0), 0);
        assert_eq!(r.get(0, 0, 2), 0);
    }

    #[test]
    fn test_scale_labels_saturates() {
        let mut m = Raster::from_vec(1, 3, 1, vec![0, 1, 200]).unwrap();
        m.scale_labels(3);
        assert_eq!(m.data(), &[0, 3, 255]);
    }

    #[test]
    fn test_filled_and_max() {
        let r = Raster::filled(2, 2, &[1, 9, 3]);
        assert_eq!(r.max_value(), 9);
        assert_eq!(r.sample_sum(), 4 * 13);
        assert_eq!(r.pixels().count(), 4);
    }
}
