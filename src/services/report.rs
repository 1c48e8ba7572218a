use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tile_kit::ChannelStats;

use crate::error::StoreError;

/// Tile counts for one source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub organ: String,
    /// Mask label the source's tiles were multiplied by
    pub label: u8,
    pub total_tiles: usize,
    pub accepted_tiles: usize,
}

/// Degenerate data that does not stop a build or split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Every tile of the source was rejected as empty.
    EmptySource { id: String },
    /// An annotated class never appeared in an accepted mask tile.
    MissingClass { class: String, label: u8 },
    /// No tile was accepted at all; normalization statistics are undefined.
    NoAcceptedTiles,
    /// Mask tiles carry a label the class table does not name.
    UnknownLabel { label: u8, tiles: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EmptySource { id } => {
                write!(f, "source {id} produced no accepted tiles")
            }
            Diagnostic::MissingClass { class, label } => {
                write!(f, "class {class} (label {label}) never appeared in an accepted tile")
            }
            Diagnostic::NoAcceptedTiles => {
                write!(f, "no tiles accepted, normalization statistics are undefined")
            }
            Diagnostic::UnknownLabel { label, tiles } => {
                write!(f, "label {label} in {tiles} mask tiles is not in the class table")
            }
        }
    }
}

/// Per-channel normalization constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationStats {
    /// Accepted tiles the statistics were computed over
    pub tiles: u64,
    /// Mean in `[0, 1]`
    pub mean: [f64; 3],
    /// Standard deviation in `[0, 1]`
    pub std: [f64; 3],
    /// Mean in 8-bit units
    pub mean_u8: [f64; 3],
    /// Standard deviation in 8-bit units
    pub std_u8: [f64; 3],
}

impl NormalizationStats {
    pub fn new(tiles: u64, stats: ChannelStats) -> Self {
        let scaled = stats.to_u8_scale();
        Self {
            tiles,
            mean: stats.mean,
            std: stats.std,
            mean_u8: scaled.mean,
            std_u8: scaled.std,
        }
    }
}

/// Outcome of a corpus build, written as `stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusReport {
    pub sources: Vec<SourceSummary>,
    /// Image/mask tile pairs written
    pub tiles_written: usize,
    /// `None` when no tile was accepted
    pub stats: Option<NormalizationStats>,
    /// Distinct mask values over all accepted tiles, ascending
    pub observed_labels: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CorpusReport {
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Io(e.into()))
    }

    pub fn write_json(&self, path: &Path) -> Result<(), StoreError> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self).map_err(|e| StoreError::Io(e.into()))?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
