use std::path::PathBuf;

use thiserror::Error;
use tile_kit::{ExtractError, RleError, StatsError};

/// Invalid configuration. Raised before any tile is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive")]
    NonPositive { name: &'static str },

    #[error("tile size {tile_size} with reduce factor {reduce} is too large")]
    TileTooLarge { tile_size: usize, reduce: usize },

    #[error("fold count must be at least 2, got {0}")]
    TooFewFolds(usize),

    #[error("fold count {folds} exceeds the number of items ({items})")]
    FoldsExceedItems { folds: usize, items: usize },

    #[error("fold count {folds} exceeds the size of every label group (largest has {largest})")]
    FoldsExceedGroups { folds: usize, largest: usize },

    #[error("class table is empty")]
    EmptyClassTable,

    #[error("class {name:?} has index 0, which is reserved for background")]
    ZeroClassIndex { name: String },

    #[error("classes {first:?} and {second:?} share index {index}")]
    DuplicateClassIndex {
        first: String,
        second: String,
        index: u8,
    },

    #[error("source {id} has unknown class {class:?}")]
    UnknownClass { id: String, class: String },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Failure opening or reading a source image.
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("source image not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TIFF error in {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("unsupported image {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

/// Failure reading or writing a tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("entry {0} already written")]
    DuplicateEntry(String),

    #[error("entry {0} not found")]
    MissingEntry(String),

    #[error("store already closed")]
    Closed,

    #[error("PNG encode error: {0}")]
    PngEncode(String),

    #[error("PNG decode error in {name}: {reason}")]
    PngDecode { name: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Any failure of a corpus build or fold split.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Slide(#[from] SlideError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Format error in source {id}: {source}")]
    Format {
        id: String,
        #[source]
        source: RleError,
    },

    #[error("Extraction error in source {id}: {source}")]
    Extract {
        id: String,
        #[source]
        source: ExtractError,
    },

    #[error("Annotation table error: {0}")]
    Annotations(#[from] csv::Error),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
}
