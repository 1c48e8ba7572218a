//! Streaming per-channel normalization statistics.
//!
//! Every accepted tile contributes its per-channel mean and mean-of-squares
//! (values normalized to `[0, 1]`). The global mean is the average of the
//! tile means; the standard deviation is `sqrt(E[x^2] - mean^2)`. Tiles
//! are never retained.

use std::fmt;

use crate::raster::Raster;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// `finalize` was called before any tile was observed.
    NoObservations,
    /// A tile did not have 3 channels.
    ChannelCount { expected: usize, actual: usize },
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::NoObservations => {
                write!(f, "no tiles observed, statistics are undefined")
            }
            StatsError::ChannelCount { expected, actual } => write!(
                f,
                "statistics need {}-channel tiles, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for StatsError {}

/// Final mean and standard deviation per channel, in `[0, 1]` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: [f64; 3],
    pub std: [f64; 3],
}

impl ChannelStats {
    /// The same statistics in 8-bit units.
    pub fn to_u8_scale(&self) -> ChannelStats {
        ChannelStats {
            mean: self.mean.map(|v| v * 255.0),
            std: self.std.map(|v| v * 255.0),
        }
    }
}

/// Running first and second moments over observed tiles.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    sum_means: [f64; 3],
    sum_squares: [f64; 3],
    tiles: u64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tiles observed so far.
    #[inline]
    pub fn count(&self) -> u64 {
        self.tiles
    }

    /// Add one tile.
    pub fn observe(&mut self, tile: &Raster) -> Result<(), StatsError> {
        if tile.channels() != 3 {
            return Err(StatsError::ChannelCount {
                expected: 3,
                actual: tile.channels(),
            });
        }
        let pixels = (tile.height() * tile.width()) as f64;
        if pixels == 0.0 {
            return Ok(());
        }

        let mut sum = [0f64; 3];
        let mut sum_sq = [0f64; 3];
        for px in tile.pixels() {
            for ch in 0..3 {
                let v = px[ch] as f64 / 255.0;
                sum[ch] += v;
                sum_sq[ch] += v * v;
            }
        }
        for ch in 0..3 {
            self.sum_means[ch] += sum[ch] / pixels;
            self.sum_squares[ch] += sum_sq[ch] / pixels;
        }
        self.tiles += 1;
        Ok(())
    }

    /// Derive mean and standard deviation.
    pub fn finalize(&self) -> Result<ChannelStats, StatsError> {
        if self.tiles == 0 {
            return Err(StatsError::NoObservations);
        }
        let n = self.tiles as f64;
        let mean = self.sum_means.map(|s| s / n);
        let mut std = [0f64; 3];
        for ch in 0..3 {
            // Rounding can push a zero variance slightly negative.
            let var = self.sum_squares[ch] / n - mean[ch] * mean[ch];
            std[ch] = var.max(0.0).sqrt();
        }
        Ok(ChannelStats { mean, std })
    }
}
