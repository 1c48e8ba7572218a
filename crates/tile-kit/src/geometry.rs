//! Tile grid geometry.
//!
//! A source image of `height x width` pixels is padded up to a multiple of
//! the effective tile edge (`tile_size * reduce`) in each dimension and cut
//! into a row-major grid. Roughly half of the padding precedes the image
//! origin, so the first row/column of tiles may start at a negative
//! coordinate; reads are clipped to the image and the clipped region is
//! placed at its offset inside an otherwise zero tile.
//!
//! ```text
//!   x0 = floor(-pad0 / 2) + n0 * effective_tile
//!   ┌──────────────┬──────────────┐
//!   │ pad   ┌──────┼──────┐       │
//!   │       │image │      │       │
//!   ├───────┼──────┼──────┼───────┤
//!   │       └──────┼──────┘  pad  │
//!   └──────────────┴──────────────┘
//! ```

use std::fmt;

use crate::source::Window;

/// Invalid geometry request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A dimension or tiling parameter is zero.
    ZeroParameter { name: &'static str },
    /// `tile_size * reduce` overflows.
    TileTooLarge { tile_size: usize, reduce: usize },
    /// Tile index past the end of the grid.
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::ZeroParameter { name } => write!(f, "{} must be positive", name),
            GeometryError::TileTooLarge { tile_size, reduce } => write!(
                f,
                "tile size {} with reduce factor {} overflows",
                tile_size, reduce
            ),
            GeometryError::IndexOutOfRange { index, len } => {
                write!(f, "tile index {} out of range (grid has {} tiles)", index, len)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Padded tile grid for one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Source height in pixels.
    pub height: usize,
    /// Source width in pixels.
    pub width: usize,
    /// Output tile edge after downsampling.
    pub tile_size: usize,
    /// Integer downsample factor.
    pub reduce: usize,
    /// Tile edge in source pixels (`tile_size * reduce`).
    pub effective_tile: usize,
    /// Total padding along the rows.
    pub pad0: usize,
    /// Total padding along the columns.
    pub pad1: usize,
    /// Tiles per grid column.
    pub n0max: usize,
    /// Tiles per grid row.
    pub n1max: usize,
}

/// Mapping of one tile onto the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub index: usize,
    /// Top-left corner of the tile in source coordinates (may be negative).
    pub origin: (i64, i64),
    /// Part of the tile that lies inside the source.
    pub source: Window,
    /// Where `source` lands inside the `effective_tile`-sized tile.
    pub dest: (usize, usize),
}

impl TileGeometry {
    /// Compute the grid for an image of `height x width`.
    ///
    /// ```
    /// use tile_kit::TileGeometry;
    ///
    /// let g = TileGeometry::compute(1000, 1000, 640, 1).unwrap();
    /// assert_eq!(g.effective_tile, 640);
    /// assert_eq!((g.pad0, g.pad1), (280, 280));
    /// assert_eq!((g.n0max, g.n1max), (2, 2));
    /// assert_eq!(g.len(), 4);
    /// ```
    pub fn compute(
        height: usize,
        width: usize,
        tile_size: usize,
        reduce: usize,
    ) -> Result<Self, GeometryError> {
        for (name, value) in [
            ("height", height),
            ("width", width),
            ("tile size", tile_size),
            ("reduce factor", reduce),
        ] {
            if value == 0 {
                return Err(GeometryError::ZeroParameter { name });
            }
        }
        let effective_tile = tile_size
            .checked_mul(reduce)
            .ok_or(GeometryError::TileTooLarge { tile_size, reduce })?;

        let pad0 = (effective_tile - height % effective_tile) % effective_tile;
        let pad1 = (effective_tile - width % effective_tile) % effective_tile;

        Ok(Self {
            height,
            width,
            tile_size,
            reduce,
            effective_tile,
            pad0,
            pad1,
            n0max: (height + pad0) / effective_tile,
            n1max: (width + pad1) / effective_tile,
        })
    }

    /// Number of tiles in the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.n0max * self.n1max
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map tile `index` (row-major over the grid) onto the source.
    pub fn region(&self, index: usize) -> Result<TileRegion, GeometryError> {
        if index >= self.len() {
            return Err(GeometryError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        let (n0, n1) = (index / self.n1max, index % self.n1max);
        let tile = self.effective_tile as i64;

        let x0 = (-(self.pad0 as i64)).div_euclid(2) + n0 as i64 * tile;
        let y0 = (-(self.pad1 as i64)).div_euclid(2) + n1 as i64 * tile;

        let p00 = x0.max(0);
        let p01 = (x0 + tile).min(self.height as i64);
        let p10 = y0.max(0);
        let p11 = (y0 + tile).min(self.width as i64);

        Ok(TileRegion {
            index,
            origin: (x0, y0),
            source: Window::new(p00 as usize, p01 as usize, p10 as usize, p11 as usize),
            dest: ((p00 - x0) as usize, (p10 - y0) as usize),
        })
    }

    /// Iterate over all tile regions in index order.
    pub fn regions(&self) -> impl Iterator<Item = TileRegion> + '_ {
        (0..self.len()).filter_map(move |i| self.region(i).ok())
    }
}
