//! Tile resampling.
//!
//! Two filters cover the downsampling step:
//!
//! - [`Filter::Area`] averages each source block. Used for image tiles,
//!   where intensities are continuous.
//! - [`Filter::Nearest`] picks one source sample. Used for masks: any
//!   smoothing filter would invent label values that do not exist.

use std::fmt;

use crate::raster::Raster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Box average over the source block (integer scale factors only).
    Area,
    /// Nearest neighbour, `src = floor(dst * src_len / dst_len)`.
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    /// Target or source has a zero dimension.
    EmptyDimension,
    /// Area filtering needs source dimensions that are multiples of the target.
    NonIntegralScale {
        from: (usize, usize),
        to: (usize, usize),
    },
}

impl fmt::Display for ResizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeError::EmptyDimension => write!(f, "cannot resize to or from an empty raster"),
            ResizeError::NonIntegralScale { from, to } => write!(
                f,
                "area resize needs an integer scale: {}x{} -> {}x{}",
                from.0, from.1, to.0, to.1
            ),
        }
    }
}

impl std::error::Error for ResizeError {}

/// Resize `src` to `height x width`.
///
/// Returns a clone when the size already matches.
pub fn resize(
    src: &Raster,
    height: usize,
    width: usize,
    filter: Filter,
) -> Result<Raster, ResizeError> {
    if height == 0 || width == 0 || src.height() == 0 || src.width() == 0 {
        return Err(ResizeError::EmptyDimension);
    }
    if src.shape() == (height, width) {
        return Ok(src.clone());
    }
    match filter {
        Filter::Area => resize_area(src, height, width),
        Filter::Nearest => Ok(resize_nearest(src, height, width)),
    }
}

fn resize_area(src: &Raster, height: usize, width: usize) -> Result<Raster, ResizeError> {
    if src.height() % height != 0 || src.width() % width != 0 {
        return Err(ResizeError::NonIntegralScale {
            from: src.shape(),
            to: (height, width),
        });
    }
    let (fy, fx) = (src.height() / height, src.width() / width);
    let channels = src.channels();
    let area = (fy * fx) as u32;
    let mut out = Raster::new(height, width, channels);
    let mut acc = vec![0u32; channels];

    for row in 0..height {
        for col in 0..width {
            acc.iter_mut().for_each(|a| *a = 0);
            for sy in row * fy..(row + 1) * fy {
                for sx in col * fx..(col + 1) * fx {
                    for (ch, a) in acc.iter_mut().enumerate() {
                        *a += src.get(sy, sx, ch) as u32;
                    }
                }
            }
            for (ch, &a) in acc.iter().enumerate() {
                // Round half up, as integer-scale area filters do.
                out.set(row, col, ch, ((a + area / 2) / area) as u8);
            }
        }
    }
    Ok(out)
}

fn resize_nearest(src: &Raster, height: usize, width: usize) -> Raster {
    let channels = src.channels();
    let mut out = Raster::new(height, width, channels);
    for row in 0..height {
        let sy = row * src.height() / height;
        for col in 0..width {
            let sx = col * src.width() / width;
            for ch in 0..channels {
                out.set(row, col, ch, src.get(sy, sx, ch));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_noop_same_dimensions() {
        let input = Raster::filled(4, 4, &[10, 20, 30]);
        let output = resize(&input, 4, 4, Filter::Area).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_area_averages_blocks() {
        let src = Raster::from_vec(2, 2, 1, vec![0, 10, 20, 31]).unwrap();
        let out = resize(&src, 1, 1, Filter::Area).unwrap();
        // (0 + 10 + 20 + 31 + 2) / 4 = 15
        assert_eq!(out.data(), &[15]);
    }

    #[test]
    fn test_area_keeps_channels_separate() {
        let src = Raster::filled(3, 3, &[255, 0, 90]);
        let out = resize(&src, 1, 1, Filter::Area).unwrap();
        assert_eq!(out.data(), &[255, 0, 90]);
    }

    #[test]
    fn test_area_rejects_fractional_scale() {
        let src = Raster::mask(5, 5);
        assert!(matches!(
            resize(&src, 2, 2, Filter::Area),
            Err(ResizeError::NonIntegralScale { .. })
        ));
    }

    #[test]
    fn test_nearest_never_invents_labels() {
        let mut src = Raster::mask(6, 6);
        for row in 0..6 {
            for col in 0..6 {
                src.set(row, col, 0, if (row + col) % 2 == 0 { 0 } else { 4 });
            }
        }
        let out = resize(&src, 2, 2, Filter::Nearest).unwrap();
        assert!(out.data().iter().all(|&v| v == 0 || v == 4));
        // src (0,0) and (0,3) -> dst (0,0)=0, (0,1)=4
        assert_eq!(out.get(0, 0, 0), 0);
        assert_eq!(out.get(0, 1, 0), 4);
    }

    #[test]
    fn test_empty_dimension_rejected() {
        let src = Raster::mask(2, 2);
        assert_eq!(
            resize(&src, 0, 1, Filter::Nearest),
            Err(ResizeError::EmptyDimension)
        );
    }
}
