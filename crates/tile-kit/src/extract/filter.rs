//! Empty-tile classification.

use crate::color::count_saturated;
use crate::raster::Raster;

/// Tile edge at which the pixel-count threshold equals its base value.
pub const REFERENCE_TILE_SIZE: usize = 640;

/// Default saturation threshold.
pub const DEFAULT_SATURATION_THRESHOLD: u8 = 40;

/// Default base pixel-count threshold (at [`REFERENCE_TILE_SIZE`]).
pub const DEFAULT_PIXEL_THRESHOLD: u64 = 1000;

/// Rejects background tiles.
///
/// A tile is empty when at most `pixel_threshold` pixels have a saturation
/// above `saturation_threshold`, or when the sum of all its samples is at
/// most `pixel_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptinessFilter {
    pub saturation_threshold: u8,
    pub pixel_threshold: u64,
}

impl Default for EmptinessFilter {
    fn default() -> Self {
        Self::for_tile_size(
            REFERENCE_TILE_SIZE,
            DEFAULT_SATURATION_THRESHOLD,
            DEFAULT_PIXEL_THRESHOLD,
        )
    }
}

impl EmptinessFilter {
    /// Scale the pixel-count threshold with the output tile edge:
    /// `base * (tile_size / 640)^2`, using integer division.
    ///
    /// The scale uses the output tile edge only; the downsample factor does
    /// not enter. Edges below 640 therefore give a threshold of 0.
    ///
    /// ```
    /// use tile_kit::EmptinessFilter;
    ///
    /// assert_eq!(EmptinessFilter::for_tile_size(640, 40, 1000).pixel_threshold, 1000);
    /// assert_eq!(EmptinessFilter::for_tile_size(1280, 40, 1000).pixel_threshold, 4000);
    /// assert_eq!(EmptinessFilter::for_tile_size(512, 40, 1000).pixel_threshold, 0);
    /// ```
    pub fn for_tile_size(tile_size: usize, saturation_threshold: u8, pixel_base: u64) -> Self {
        let scale = (tile_size / REFERENCE_TILE_SIZE) as u64;
        Self {
            saturation_threshold,
            pixel_threshold: pixel_base * scale * scale,
        }
    }

    /// Whether `image` (3 channels) should be rejected.
    pub fn is_empty(&self, image: &Raster) -> bool {
        debug_assert_eq!(image.channels(), 3);
        let saturated = count_saturated(image.data(), self.saturation_threshold) as u64;
        saturated <= self.pixel_threshold || image.sample_sum() <= self.pixel_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white_always_empty() {
        for filter in [
            EmptinessFilter::default(),
            EmptinessFilter {
                saturation_threshold: 0,
                pixel_threshold: 0,
            },
        ] {
            assert!(filter.is_empty(&Raster::new(16, 16, 3)));
            assert!(filter.is_empty(&Raster::filled(16, 16, &[255, 255, 255])));
        }
    }

    #[test]
    fn test_saturated_tile_is_kept() {
        let filter = EmptinessFilter {
            saturation_threshold: 40,
            pixel_threshold: 10,
        };
        let tile = Raster::filled(4, 4, &[200, 60, 150]);
        assert!(!filter.is_empty(&tile));
    }

    #[test]
    fn test_pixel_count_boundary_is_inclusive() {
        let filter = EmptinessFilter {
            saturation_threshold: 40,
            pixel_threshold: 3,
        };
        let mut tile = Raster::filled(2, 2, &[255, 255, 255]);
        for col in 0..2 {
            tile.set(0, col, 1, 0);
            tile.set(0, col, 2, 0);
        }
        tile.set(1, 0, 1, 0);
        // 3 saturated pixels == threshold -> still empty
        assert!(filter.is_empty(&tile));
        tile.set(1, 1, 1, 0);
        assert!(!filter.is_empty(&tile));
    }
}
