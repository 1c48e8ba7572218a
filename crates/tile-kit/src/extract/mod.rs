//! Windowed tile extraction.
//!
//! [`TileExtractor`] owns one source image (and optionally its decoded
//! mask) for as long as its tiles are being produced. For each tile index
//! it:
//!
//! 1. maps the index onto the source via [`TileGeometry::region`],
//! 2. reads only the in-bounds window, plane by plane, into a zero tile of
//!    `effective_tile x effective_tile x 3`,
//! 3. copies the matching mask window into a zero mask tile,
//! 4. downsamples by `reduce` (area filter for the image, nearest for the mask),
//! 5. classifies the tile with an [`EmptinessFilter`].
//!
//! Dropping the extractor releases the source.
//!
//! ```
//! use tile_kit::{EmptinessFilter, MemorySource, Raster, TileExtractor, TileStatus};
//!
//! let image = Raster::filled(30, 30, &[200, 40, 120]);
//! let filter = EmptinessFilter { saturation_threshold: 40, pixel_threshold: 10 };
//! let mut extractor =
//!     TileExtractor::new(MemorySource::interleaved(image), None, 8, 2, filter).unwrap();
//!
//! assert_eq!(extractor.len(), 4);
//! let tile = extractor.get(0).unwrap();
//! assert_eq!(tile.image.shape(), (8, 8));
//! assert_eq!(tile.status, TileStatus::Accepted(0));
//! ```

mod error;
mod filter;

pub use error::ExtractError;
pub use filter::{
    EmptinessFilter, DEFAULT_PIXEL_THRESHOLD, DEFAULT_SATURATION_THRESHOLD, REFERENCE_TILE_SIZE,
};

use crate::geometry::{TileGeometry, TileRegion};
use crate::raster::{DenseMask, Raster};
use crate::resize::{resize, Filter};
use crate::source::{ChannelLayout, RasterSource};

/// Outcome of the emptiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Accepted(usize),
    Rejected,
}

impl TileStatus {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, TileStatus::Accepted(_))
    }
}

/// One extracted tile.
#[derive(Debug, Clone)]
pub struct Tile {
    pub index: usize,
    /// `tile_size x tile_size x 3` image block.
    pub image: Raster,
    /// `tile_size x tile_size` mask block (all zero without a mask).
    pub mask: DenseMask,
    pub status: TileStatus,
}

/// Cuts fixed-size tiles out of one source image.
pub struct TileExtractor<S> {
    source: S,
    layout: ChannelLayout,
    mask: Option<DenseMask>,
    geometry: TileGeometry,
    filter: EmptinessFilter,
}

impl<S: RasterSource> TileExtractor<S> {
    /// Build an extractor for `source`.
    ///
    /// `mask`, when given, must have the source's `(height, width)`.
    pub fn new(
        source: S,
        mask: Option<DenseMask>,
        tile_size: usize,
        reduce: usize,
        filter: EmptinessFilter,
    ) -> Result<Self, ExtractError> {
        let (height, width) = source.shape();
        let geometry = TileGeometry::compute(height, width, tile_size, reduce)?;

        let layout = source.layout();
        if let ChannelLayout::Layered { layers } = layout {
            if layers > 3 {
                return Err(ExtractError::TooManyLayers { layers });
            }
        }

        if let Some(mask) = &mask {
            if mask.shape() != (height, width) {
                return Err(ExtractError::MaskShape {
                    expected: (height, width),
                    actual: mask.shape(),
                });
            }
        }

        Ok(Self {
            source,
            layout,
            mask,
            geometry,
            filter,
        })
    }

    /// Number of tiles in the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    #[inline]
    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// Give the source back.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Extract tile `index`.
    pub fn get(&mut self, index: usize) -> Result<Tile, ExtractError> {
        let region = self.geometry.region(index)?;
        let edge = self.geometry.effective_tile;

        let mut image = Raster::new(edge, edge, 3);
        self.read_image(&region, &mut image)?;

        let mut mask = Raster::mask(edge, edge);
        if let Some(full) = &self.mask {
            let window = full.crop(region.source);
            mask.paste(
                window.data(),
                window.height(),
                window.width(),
                1,
                region.dest,
                0,
            );
        }

        if self.geometry.reduce != 1 {
            let size = self.geometry.tile_size;
            image = resize(&image, size, size, Filter::Area)?;
            mask = resize(&mask, size, size, Filter::Nearest)?;
        }

        let status = if self.filter.is_empty(&image) {
            TileStatus::Rejected
        } else {
            TileStatus::Accepted(index)
        };

        Ok(Tile {
            index,
            image,
            mask,
            status,
        })
    }

    fn read_image(&mut self, region: &TileRegion, image: &mut Raster) -> Result<(), ExtractError> {
        let window = region.source;
        if window.is_empty() {
            return Ok(());
        }
        let samples = self.layout.samples_per_plane();
        let expected = window.area() * samples;

        for plane in 0..self.layout.planes() {
            let data = self
                .source
                .read_plane(plane, window)
                .map_err(|source| ExtractError::Source {
                    plane,
                    window,
                    source,
                })?;
            if data.len() != expected {
                return Err(ExtractError::ShortRead {
                    plane,
                    expected,
                    actual: data.len(),
                });
            }
            // Layer order is channel order.
            image.paste(
                &data,
                window.height(),
                window.width(),
                samples,
                region.dest,
                plane,
            );
        }
        Ok(())
    }

    /// Iterate over all tiles in index order.
    pub fn tiles(&mut self) -> Tiles<'_, S> {
        Tiles {
            extractor: self,
            next: 0,
        }
    }
}

/// Iterator returned by [`TileExtractor::tiles`].
pub struct Tiles<'a, S> {
    extractor: &'a mut TileExtractor<S>,
    next: usize,
}

impl<S: RasterSource> Iterator for Tiles<'_, S> {
    type Item = Result<Tile, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.extractor.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.extractor.get(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.extractor.len().saturating_sub(self.next);
        (left, Some(left))
    }
}
