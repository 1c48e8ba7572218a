//! Windowed access to source images.
//!
//! Whole-slide images do not fit in memory, so the extractor only ever asks
//! a source for the rectangle a tile needs. Two physical layouts exist:
//!
//! - **Interleaved**: one resource holding all three channels per pixel.
//!   Plane 0 yields `3` samples per pixel.
//! - **Layered**: one single-channel resource per channel ("layer").
//!   Plane `i` yields `1` sample per pixel and becomes channel `i`.
//!
//! The layout is resolved once, when the source is opened.

use std::fmt;

use crate::raster::Raster;

/// Boxed error returned by [`RasterSource`] implementations.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Half-open pixel rectangle `[row_start, row_end) x [col_start, col_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Window {
    #[inline]
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.row_end.saturating_sub(self.row_start)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.col_end.saturating_sub(self.col_start)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..{}, cols {}..{}",
            self.row_start, self.row_end, self.col_start, self.col_end
        )
    }
}

/// How the channels of a source image are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// One plane with 3 interleaved samples per pixel.
    Interleaved,
    /// `layers` planes with one sample per pixel each.
    Layered { layers: usize },
}

impl ChannelLayout {
    /// Number of planes a reader must visit.
    #[inline]
    pub fn planes(&self) -> usize {
        match self {
            ChannelLayout::Interleaved => 1,
            ChannelLayout::Layered { layers } => *layers,
        }
    }

    /// Samples per pixel within one plane.
    #[inline]
    pub fn samples_per_plane(&self) -> usize {
        match self {
            ChannelLayout::Interleaved => 3,
            ChannelLayout::Layered { .. } => 1,
        }
    }
}

/// A source image that can be read one window at a time.
pub trait RasterSource {
    /// `(height, width)` in pixels.
    fn shape(&self) -> (usize, usize);

    fn layout(&self) -> ChannelLayout;

    /// Read `window` of plane `plane` as row-major samples.
    ///
    /// The returned buffer holds `window.area() * layout().samples_per_plane()`
    /// bytes. `window` always lies inside [`shape()`](RasterSource::shape).
    fn read_plane(&mut self, plane: usize, window: Window) -> Result<Vec<u8>, SourceError>;
}

impl<S: RasterSource + ?Sized> RasterSource for Box<S> {
    fn shape(&self) -> (usize, usize) {
        (**self).shape()
    }

    fn layout(&self) -> ChannelLayout {
        (**self).layout()
    }

    fn read_plane(&mut self, plane: usize, window: Window) -> Result<Vec<u8>, SourceError> {
        (**self).read_plane(plane, window)
    }
}

/// An in-memory source, mostly useful for tests and small images.
#[derive(Debug, Clone)]
pub struct MemorySource {
    planes: Vec<Raster>,
    layout: ChannelLayout,
}

impl MemorySource {
    /// A 3-channel interleaved source.
    ///
    /// # Panics
    ///
    /// Panics if `image` does not have exactly 3 channels.
    pub fn interleaved(image: Raster) -> Self {
        assert_eq!(image.channels(), 3, "interleaved source needs 3 channels");
        Self {
            planes: vec![image],
            layout: ChannelLayout::Interleaved,
        }
    }

    /// A layered source built from single-channel planes of equal shape.
    ///
    /// # Panics
    ///
    /// Panics if `layers` is empty, a layer is not single-channel, or the
    /// layer shapes differ.
    pub fn layered(layers: Vec<Raster>) -> Self {
        assert!(!layers.is_empty(), "layered source needs at least one layer");
        let shape = layers[0].shape();
        for layer in &layers {
            assert_eq!(layer.channels(), 1, "layers must be single-channel");
            assert_eq!(layer.shape(), shape, "layers must share one shape");
        }
        let n = layers.len();
        Self {
            planes: layers,
            layout: ChannelLayout::Layered { layers: n },
        }
    }
}

impl RasterSource for MemorySource {
    fn shape(&self) -> (usize, usize) {
        self.planes[0].shape()
    }

    fn layout(&self) -> ChannelLayout {
        self.layout
    }

    fn read_plane(&mut self, plane: usize, window: Window) -> Result<Vec<u8>, SourceError> {
        let raster = self
            .planes
            .get(plane)
            .ok_or_else(|| format!("plane {plane} does not exist"))?;
        Ok(raster.crop(window).into_vec())
    }
}
