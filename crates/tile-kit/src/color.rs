//! HSV saturation for 8-bit pixels.
//!
//! Only the saturation channel is needed: tissue in stained slides is
//! colored, while background glass is near-white or gray. Saturation is
//! symmetric in the channel order, so RGB and BGR inputs give the same value.

/// 8-bit HSV saturation: `255 * (max - min) / max`, rounded, 0 for black.
///
/// ```
/// use tile_kit::color::saturation;
///
/// assert_eq!(saturation([255, 255, 255]), 0);
/// assert_eq!(saturation([0, 0, 0]), 0);
/// assert_eq!(saturation([200, 0, 0]), 255);
/// assert_eq!(saturation([200, 100, 100]), 128);
/// ```
#[inline]
pub fn saturation(rgb: [u8; 3]) -> u8 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]) as u32;
    if max == 0 {
        return 0;
    }
    let min = rgb[0].min(rgb[1]).min(rgb[2]) as u32;
    ((255 * (max - min) + max / 2) / max) as u8
}

/// Count pixels of a 3-channel sample buffer whose saturation exceeds `threshold`.
pub fn count_saturated(samples: &[u8], threshold: u8) -> usize {
    samples
        .chunks_exact(3)
        .filter(|px| saturation([px[0], px[1], px[2]]) > threshold)
        .count()
}
