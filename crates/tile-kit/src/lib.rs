#![allow(clippy::needless_range_loop, clippy::module_inception)]

//! tile-kit: tiling primitives for whole-slide segmentation datasets
//!
//! This crate turns gigapixel source images and their run-length encoded
//! annotations into fixed-size image/mask tile pairs, without ever holding
//! a whole image in memory.
//!
//! # Building Blocks
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`rle`] | Column-major, 1-indexed run-length mask codec |
//! | [`geometry`] | Padded tile grid and source-to-tile mapping |
//! | [`source`] | Windowed reads from interleaved or layered sources |
//! | [`extract`] | Tile extraction, downsampling and empty-tile rejection |
//! | [`resize`] | Area and nearest-neighbour resampling |
//! | [`color`] | HSV saturation |
//! | [`stats`] | Streaming per-channel mean / standard deviation |
//!
//! # Quick Start
//!
//! ```
//! use tile_kit::{rle, EmptinessFilter, MemorySource, Raster, RunningStats, TileExtractor};
//!
//! let image = Raster::filled(40, 40, &[180, 60, 140]);
//! let mask = rle::decode("1 40", 40, 40).unwrap(); // first column
//!
//! let filter = EmptinessFilter { saturation_threshold: 40, pixel_threshold: 10 };
//! let mut extractor =
//!     TileExtractor::new(MemorySource::interleaved(image), Some(mask), 16, 2, filter).unwrap();
//!
//! let mut stats = RunningStats::new();
//! for tile in extractor.tiles() {
//!     let tile = tile.unwrap();
//!     if tile.status.is_accepted() {
//!         stats.observe(&tile.image).unwrap();
//!     }
//! }
//! let summary = stats.finalize().unwrap();
//! assert!(summary.mean[0] > 0.0);
//! ```
//!
//! # Coordinate Conventions
//!
//! - Shapes are always `(height, width)`.
//! - Rasters are row-major with interleaved channels.
//! - RLE strings are column-major: flat index `i` is pixel
//!   `(i % height, i / height)`, and starts are 1-indexed.
//! - Tile indices are row-major over the grid: `n0 = index / n1max`,
//!   `n1 = index % n1max`.

pub mod color;
pub mod extract;
pub mod geometry;
pub mod raster;
pub mod resize;
pub mod rle;
pub mod source;
pub mod stats;


pub use extract::{EmptinessFilter, ExtractError, Tile, TileExtractor, TileStatus};
pub use geometry::{GeometryError, TileGeometry, TileRegion};
pub use raster::{DenseMask, Raster};
pub use resize::{Filter, ResizeError};
pub use rle::RleError;
pub use source::{ChannelLayout, MemorySource, RasterSource, SourceError, Window};
pub use stats::{ChannelStats, RunningStats, StatsError};
