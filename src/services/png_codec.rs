use std::io::Cursor;

use tile_kit::{DenseMask, Raster};

use crate::error::StoreError;

/// Encode a 3-channel image tile as an 8-bit RGB PNG.
pub fn encode_rgb(image: &Raster) -> Result<Vec<u8>, StoreError> {
    if image.channels() != 3 {
        return Err(StoreError::PngEncode(format!(
            "expected 3 channels, got {}",
            image.channels()
        )));
    }
    encode(image, png::ColorType::Rgb)
}

/// Encode a mask tile as an 8-bit grayscale PNG.
pub fn encode_gray(mask: &DenseMask) -> Result<Vec<u8>, StoreError> {
    if mask.channels() != 1 {
        return Err(StoreError::PngEncode(format!(
            "expected 1 channel, got {}",
            mask.channels()
        )));
    }
    encode(mask, png::ColorType::Grayscale)
}

fn encode(raster: &Raster, color: png::ColorType) -> Result<Vec<u8>, StoreError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder =
            png::Encoder::new(&mut buf, raster.width() as u32, raster.height() as u32);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder
            .write_header()
            .map_err(|e| StoreError::PngEncode(e.to_string()))?;
        writer
            .write_image_data(raster.data())
            .map_err(|e| StoreError::PngEncode(e.to_string()))?;
    }
    Ok(buf.into_inner())
}

/// Decode an 8-bit PNG into a raster.
///
/// Palette and sub-byte images are expanded to 8 bits; grayscale stays
/// single-channel, everything else keeps its channel count.
pub fn decode(name: &str, bytes: &[u8]) -> Result<Raster, StoreError> {
    let err = |reason: String| StoreError::PngDecode {
        name: name.to_string(),
        reason,
    };

    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().map_err(|e| err(e.to_string()))?;
    let mut data = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut data).map_err(|e| err(e.to_string()))?;
    data.truncate(info.buffer_size());

    let channels = info.color_type.samples();
    let (width, height) = (info.width as usize, info.height as usize);
    Raster::from_vec(height, width, channels, data)
        .ok_or_else(|| err(format!("unexpected buffer size for {width}x{height}")))
}

/// Largest sample value of a PNG mask tile.
pub fn mask_label(name: &str, bytes: &[u8]) -> Result<u8, StoreError> {
    Ok(decode(name, bytes)?.max_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_roundtrip() {
        let mut image = Raster::new(5, 7, 3);
        for (i, v) in image.data_mut().iter_mut().enumerate() {
            *v = (i * 11 % 256) as u8;
        }
        let bytes = encode_rgb(&image).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(decode("t.png", &bytes).unwrap(), image);
    }

    #[test]
    fn test_gray_mask_label() {
        let mut mask = Raster::mask(4, 4);
        mask.set(2, 3, 0, 4);
        let bytes = encode_gray(&mask).unwrap();
        let decoded = decode("m.png", &bytes).unwrap();
        assert_eq!(decoded.channels(), 1);
        assert_eq!(decoded, mask);
        assert_eq!(mask_label("m.png", &bytes).unwrap(), 4);
    }

    #[test]
    fn test_channel_mismatch() {
        assert!(encode_rgb(&Raster::mask(2, 2)).is_err());
        assert!(encode_gray(&Raster::new(2, 2, 3)).is_err());
    }

    #[test]
    fn test_garbage_names_entry() {
        match decode("bad.png", b"not a png") {
            Err(StoreError::PngDecode { name, .. }) => assert_eq!(name, "bad.png"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
