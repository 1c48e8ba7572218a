//! Run-length mask codec.
//!
//! Annotations arrive as whitespace-separated `start length` pairs over a
//! **column-major** flattening of the mask, with **1-indexed** starts. Flat
//! index `i` therefore addresses pixel `(row, col) = (i % height, i / height)`.
//!
//! ```
//! use tile_kit::{rle, Raster};
//!
//! // Rows 1..4 of column 0 in a 4x4 mask: flat indices 2, 3, 4 (1-indexed).
//! let mask = rle::decode("2 3", 4, 4).unwrap();
//! assert_eq!(mask.get(1, 0, 0), 1);
//! assert_eq!(mask.get(3, 0, 0), 1);
//! assert_eq!(mask.get(0, 0, 0), 0);
//!
//! assert_eq!(rle::encode(&mask, 1).unwrap(), vec![Some("2 3".to_string())]);
//! ```

use std::fmt;
use std::num::ParseIntError;

use crate::raster::{DenseMask, Raster};

/// Malformed run-length string.
#[derive(Debug, Clone, PartialEq)]
pub enum RleError {
    /// The string holds an odd number of tokens.
    OddTokenCount { count: usize },
    /// A token is not a non-negative integer.
    InvalidToken {
        position: usize,
        token: String,
        source: ParseIntError,
    },
    /// A run starts at 0; starts are 1-indexed.
    ZeroStart { run: usize },
    /// A run extends past the end of the mask.
    RunOutOfRange { run: usize, end: u64, size: u64 },
    /// Only single-channel masks can be encoded.
    NotSingleChannel { channels: usize },
}

impl fmt::Display for RleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RleError::OddTokenCount { count } => {
                write!(f, "odd number of RLE tokens ({})", count)
            }
            RleError::InvalidToken {
                position, token, ..
            } => write!(f, "invalid RLE token {:?} at position {}", token, position),
            RleError::ZeroStart { run } => {
                write!(f, "run {} starts at 0 (starts are 1-indexed)", run)
            }
            RleError::RunOutOfRange { run, end, size } => write!(
                f,
                "run {} ends at pixel {} but the mask has {} pixels",
                run, end, size
            ),
            RleError::NotSingleChannel { channels } => {
                write!(f, "cannot encode a mask with {} channels", channels)
            }
        }
    }
}

impl std::error::Error for RleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RleError::InvalidToken { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Decode a run-length string into a `height x width` binary mask.
///
/// An empty (or all-whitespace) string decodes to an all-zero mask.
pub fn decode(rle: &str, height: usize, width: usize) -> Result<DenseMask, RleError> {
    let tokens = rle
        .split_whitespace()
        .enumerate()
        .map(|(position, token)| {
            token
                .parse::<u64>()
                .map_err(|source| RleError::InvalidToken {
                    position,
                    token: token.to_string(),
                    source,
                })
        })
        .collect::<Result<Vec<u64>, _>>()?;

    if tokens.len() % 2 != 0 {
        return Err(RleError::OddTokenCount {
            count: tokens.len(),
        });
    }

    let size = (height * width) as u64;
    let mut mask = Raster::mask(height, width);

    for (run, pair) in tokens.chunks_exact(2).enumerate() {
        let (start, length) = (pair[0], pair[1]);
        if start == 0 {
            return Err(RleError::ZeroStart { run });
        }
        let lo = start - 1;
        let hi = lo.saturating_add(length);
        if hi > size {
            return Err(RleError::RunOutOfRange { run, end: hi, size });
        }
        let data = mask.data_mut();
        for flat in lo as usize..hi as usize {
            let (row, col) = (flat % height, flat / height);
            data[row * width + col] = 1;
        }
    }

    Ok(mask)
}

/// Encode each class `1..=num_classes` of `mask` as a run-length string.
///
/// Entry `k - 1` describes the pixels equal to `k`. Classes absent from the
/// mask yield `None`, which is distinct from any real run list.
pub fn encode(mask: &DenseMask, num_classes: u8) -> Result<Vec<Option<String>>, RleError> {
    if mask.channels() != 1 {
        return Err(RleError::NotSingleChannel {
            channels: mask.channels(),
        });
    }
    let (height, width) = mask.shape();
    let data = mask.data();

    let encoded = (1..=num_classes)
        .map(|class| {
            let mut runs: Vec<String> = Vec::new();
            let mut run_start: Option<usize> = None;

            for flat in 0..height * width {
                let (row, col) = (flat % height, flat / height);
                let inside = data[row * width + col] == class;
                match (inside, run_start) {
                    (true, None) => run_start = Some(flat),
                    (false, Some(start)) => {
                        runs.push(format!("{} {}", start + 1, flat - start));
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = run_start {
                runs.push(format!("{} {}", start + 1, height * width - start));
            }

            if runs.is_empty() {
                None
            } else {
                Some(runs.join(" "))
            }
        })
        .collect();
    Ok(encoded)
}
