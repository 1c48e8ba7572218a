//! Error type for tile extraction.

use std::fmt;

use crate::geometry::GeometryError;
use crate::resize::ResizeError;
use crate::source::{SourceError, Window};

/// Failure while cutting a tile out of a source image.
#[derive(Debug)]
pub enum ExtractError {
    /// Invalid tiling parameters or tile index.
    Geometry(GeometryError),
    /// Downsampling failed.
    Resize(ResizeError),
    /// The source could not serve a window.
    Source {
        plane: usize,
        window: Window,
        source: SourceError,
    },
    /// The source returned fewer or more samples than the window needs.
    ShortRead {
        plane: usize,
        expected: usize,
        actual: usize,
    },
    /// The mask shape differs from the source shape.
    MaskShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A layered source has more layers than an RGB tile has channels.
    TooManyLayers { layers: usize },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Geometry(err) => write!(f, "geometry error: {}", err),
            ExtractError::Resize(err) => write!(f, "resize error: {}", err),
            ExtractError::Source {
                plane,
                window,
                source,
            } => write!(f, "failed to read plane {} ({}): {}", plane, window, source),
            ExtractError::ShortRead {
                plane,
                expected,
                actual,
            } => write!(
                f,
                "plane {} returned {} samples, expected {}",
                plane, actual, expected
            ),
            ExtractError::MaskShape { expected, actual } => write!(
                f,
                "mask is {}x{} but the image is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            ExtractError::TooManyLayers { layers } => {
                write!(f, "source has {} layers, at most 3 are supported", layers)
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Geometry(err) => Some(err),
            ExtractError::Resize(err) => Some(err),
            ExtractError::Source { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<GeometryError> for ExtractError {
    fn from(err: GeometryError) -> Self {
        ExtractError::Geometry(err)
    }
}

impl From<ResizeError> for ExtractError {
    fn from(err: ResizeError) -> Self {
        ExtractError::Resize(err)
    }
}
