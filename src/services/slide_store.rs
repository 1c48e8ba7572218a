use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tile_kit::{ChannelLayout, MemorySource, RasterSource, SourceError, Window};

use crate::error::SlideError;

/// Resolves a source identifier to an openable image.
pub trait SlideStore {
    type Slide: RasterSource;

    fn open(&self, id: &str) -> Result<Self::Slide, SlideError>;
}

/// Source images stored as `{dir}/{id}.tiff`.
pub struct TiffSlideStore {
    dir: PathBuf,
}

impl TiffSlideStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.tiff"))
    }
}

impl SlideStore for TiffSlideStore {
    type Slide = TiffSlide;

    fn open(&self, id: &str) -> Result<TiffSlide, SlideError> {
        TiffSlide::open(&self.path_for(id))
    }
}

/// In-memory source images keyed by identifier
#[derive(Default)]
pub struct InMemorySlideStore {
    slides: HashMap<String, MemorySource>,
}

impl InMemorySlideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, slide: MemorySource) {
        self.slides.insert(id.into(), slide);
    }
}

impl SlideStore for InMemorySlideStore {
    type Slide = MemorySource;

    fn open(&self, id: &str) -> Result<MemorySource, SlideError> {
        self.slides
            .get(id)
            .cloned()
            .ok_or_else(|| SlideError::NotFound(PathBuf::from(id)))
    }
}

/// A whole-slide TIFF read one window at a time.
///
/// 8-bit RGB or RGBA files are interleaved sources. An 8-bit grayscale file
/// is a layered source: every image directory with the first directory's
/// pixel shape is one layer, in file order. Directories with another shape
/// (reduced-resolution pyramid levels) are ignored.
pub struct TiffSlide {
    path: PathBuf,
    height: usize,
    width: usize,
    layout: ChannelLayout,
    planes: Vec<PlaneReader>,
}

impl std::fmt::Debug for TiffSlide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiffSlide")
            .field("path", &self.path)
            .field("height", &self.height)
            .field("width", &self.width)
            .field("layout", &self.layout)
            .finish()
    }
}

impl TiffSlide {
    pub fn open(path: &Path) -> Result<Self, SlideError> {
        if !path.exists() {
            return Err(SlideError::NotFound(path.to_path_buf()));
        }

        let mut decoder = open_decoder(path)?;
        let (width, height) = decoder.dimensions().map_err(tiff_error(path))?;
        let color = decoder.colortype().map_err(tiff_error(path))?;

        let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
        if planar != 1 {
            return Err(unsupported(path, "planar sample layout"));
        }

        let (layout, planes) = match color {
            ColorType::RGB(8) | ColorType::RGBA(8) => {
                let samples = if color == ColorType::RGB(8) { 3 } else { 4 };
                let plane = PlaneReader::new(decoder, samples, 3);
                (ChannelLayout::Interleaved, vec![plane])
            }
            ColorType::Gray(8) => {
                let directories = layer_directories(path, &mut decoder, (width, height))?;
                let layers = directories.len();
                if layers > 3 {
                    return Err(unsupported(
                        path,
                        &format!("{layers} layers, at most 3 are supported"),
                    ));
                }
                let mut planes = Vec::with_capacity(layers);
                for &directory in &directories {
                    let mut decoder = open_decoder(path)?;
                    for _ in 0..directory {
                        decoder.next_image().map_err(tiff_error(path))?;
                    }
                    planes.push(PlaneReader::new(decoder, 1, 1));
                }
                (ChannelLayout::Layered { layers }, planes)
            }
            other => {
                return Err(unsupported(path, &format!("color type {other:?}")));
            }
        };

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            planes = planes.len(),
            "Opened source image"
        );

        Ok(Self {
            path: path.to_path_buf(),
            height: height as usize,
            width: width as usize,
            layout,
            planes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for TiffSlide {
    fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn layout(&self) -> ChannelLayout {
        self.layout
    }

    fn read_plane(&mut self, plane: usize, window: Window) -> Result<Vec<u8>, SourceError> {
        let path = &self.path;
        let reader = self
            .planes
            .get_mut(plane)
            .ok_or_else(|| unsupported(path, &format!("plane {plane} does not exist")))?;
        Ok(reader.read_window(path, self.width, window)?)
    }
}

/// One decoder handle plus the chunks of its previous window.
struct PlaneReader {
    decoder: Decoder<BufReader<File>>,
    /// Samples per pixel stored in the file.
    samples: usize,
    /// Samples per pixel returned to the caller.
    keep: usize,
    cache: HashMap<u32, Vec<u8>>,
}

impl PlaneReader {
    fn new(decoder: Decoder<BufReader<File>>, samples: usize, keep: usize) -> Self {
        Self {
            decoder,
            samples,
            keep,
            cache: HashMap::new(),
        }
    }

    fn read_window(
        &mut self,
        path: &Path,
        image_width: usize,
        window: Window,
    ) -> Result<Vec<u8>, SlideError> {
        let mut out = vec![0u8; window.area() * self.keep];
        if window.is_empty() {
            return Ok(out);
        }

        let (cw, ch) = self.decoder.chunk_dimensions();
        let (cw, ch) = (cw as usize, ch as usize);
        let chunks_across = image_width.div_ceil(cw);

        let rows = window.row_start / ch..=(window.row_end - 1) / ch;
        let cols = window.col_start / cw..=(window.col_end - 1) / cw;

        let needed: Vec<(usize, usize)> = rows
            .flat_map(|cr| cols.clone().map(move |cc| (cr, cc)))
            .collect();
        let indices: Vec<u32> = needed
            .iter()
            .map(|&(cr, cc)| (cr * chunks_across + cc) as u32)
            .collect();
        self.cache.retain(|idx, _| indices.contains(idx));

        for (&(cr, cc), &idx) in needed.iter().zip(&indices) {
            let (dw, dh) = self.decoder.chunk_data_dimensions(idx);
            let (dw, dh) = (dw as usize, dh as usize);
            if !self.cache.contains_key(&idx) {
                let data = match self.decoder.read_chunk(idx).map_err(tiff_error(path))? {
                    DecodingResult::U8(data) => data,
                    _ => return Err(unsupported(path, "non 8-bit samples")),
                };
                if data.len() < dw * dh * self.samples {
                    return Err(unsupported(path, &format!("truncated chunk {idx}")));
                }
                self.cache.insert(idx, data);
            }
            let chunk = &self.cache[&idx];

            let (oy, ox) = (cr * ch, cc * cw);
            let row_lo = window.row_start.max(oy);
            let row_hi = window.row_end.min(oy + dh);
            let col_lo = window.col_start.max(ox);
            let col_hi = window.col_end.min(ox + dw);
            if row_lo >= row_hi || col_lo >= col_hi {
                continue;
            }

            for row in row_lo..row_hi {
                let src_row = ((row - oy) * dw + (col_lo - ox)) * self.samples;
                let dst_row = ((row - window.row_start) * window.width()
                    + (col_lo - window.col_start))
                    * self.keep;
                let n = col_hi - col_lo;
                if self.samples == self.keep {
                    out[dst_row..dst_row + n * self.keep]
                        .copy_from_slice(&chunk[src_row..src_row + n * self.samples]);
                } else {
                    for i in 0..n {
                        let s = src_row + i * self.samples;
                        let d = dst_row + i * self.keep;
                        out[d..d + self.keep].copy_from_slice(&chunk[s..s + self.keep]);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, SlideError> {
    let file = File::open(path).map_err(|source| SlideError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(tiff_error(path))?;
    Ok(decoder.with_limits(Limits::unlimited()))
}

/// Count the directories that form layers of a grayscale source.
/// Directory indices of the layers: the first directory plus every later
/// one of the same shape. Other shapes (pyramid levels) are skipped.
fn layer_directories(
    path: &Path,
    decoder: &mut Decoder<BufReader<File>>,
    shape: (u32, u32),
) -> Result<Vec<usize>, SlideError> {
    let mut directories = vec![0];
    let mut directory = 0;
    while decoder.more_images() {
        decoder.next_image().map_err(tiff_error(path))?;
        directory += 1;
        if decoder.dimensions().map_err(tiff_error(path))? != shape {
            continue;
        }
        match decoder.colortype().map_err(tiff_error(path))? {
            ColorType::Gray(8) => directories.push(directory),
            other => {
                return Err(unsupported(
                    path,
                    &format!("directory {directory} has color type {other:?}"),
                ));
            }
        }
    }
    Ok(directories)
}

fn tiff_error(path: &Path) -> impl Fn(tiff::TiffError) -> SlideError + '_ {
    move |source| SlideError::Tiff {
        path: path.to_path_buf(),
        source,
    }
}

fn unsupported(path: &Path, reason: &str) -> SlideError {
    SlideError::Unsupported {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};
    use tile_kit::Raster;

    fn gradient(height: u32, width: u32, channels: u32) -> Vec<u8> {
        let mut data = Vec::new();
        for row in 0..height {
            for col in 0..width {
                for ch in 0..channels {
                    data.push(((row * 7 + col * 3 + ch * 50) % 251) as u8);
                }
            }
        }
        data
    }

    fn expected_window(
        data: &[u8],
        width: usize,
        channels: usize,
        window: Window,
        keep: usize,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        for row in window.row_start..window.row_end {
            for col in window.col_start..window.col_end {
                let base = (row * width + col) * channels;
                out.extend_from_slice(&data[base..base + keep]);
            }
        }
        out
    }

    #[test]
    fn test_rgb_multi_strip_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tiff");
        let data = gradient(37, 29, 3);
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            let mut image = encoder.new_image::<colortype::RGB8>(29, 37).unwrap();
            image.rows_per_strip(4).unwrap();
            image.write_data(&data).unwrap();
        }

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.shape(), (37, 29));
        assert_eq!(slide.layout(), ChannelLayout::Interleaved);

        // spans several strips, then a window sharing some of them
        for window in [Window::new(3, 17, 5, 20), Window::new(10, 37, 0, 29)] {
            let got = slide.read_plane(0, window).unwrap();
            assert_eq!(got, expected_window(&data, 29, 3, window, 3));
        }
    }

    #[test]
    fn test_rgba_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.tiff");
        let data = gradient(8, 6, 4);
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            encoder
                .write_image::<colortype::RGBA8>(6, 8, &data)
                .unwrap();
        }
        let mut slide = TiffSlide::open(&path).unwrap();
        let window = Window::new(1, 7, 2, 6);
        let got = slide.read_plane(0, window).unwrap();
        assert_eq!(got, expected_window(&data, 6, 4, window, 3));
    }

    #[test]
    fn test_gray_pages_are_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.tiff");
        let layers: Vec<Vec<u8>> = (0..3u8).map(|i| vec![i * 40 + 10; 12 * 9]).collect();
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            for layer in &layers {
                encoder.write_image::<colortype::Gray8>(9, 12, layer).unwrap();
            }
            // a reduced-resolution level is not a layer
            encoder
                .write_image::<colortype::Gray8>(4, 6, &[0u8; 24])
                .unwrap();
        }

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.layout(), ChannelLayout::Layered { layers: 3 });
        let window = Window::new(2, 5, 1, 4);
        for (plane, layer) in layers.iter().enumerate() {
            let got = slide.read_plane(plane, window).unwrap();
            assert_eq!(got, vec![layer[0]; 9]);
        }
        assert!(slide.read_plane(3, window).is_err());
    }

    #[test]
    fn test_pyramid_level_between_layers_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interleaved_levels.tiff");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            encoder
                .write_image::<colortype::Gray8>(9, 12, &[10u8; 12 * 9])
                .unwrap();
            encoder
                .write_image::<colortype::Gray8>(4, 6, &[99u8; 24])
                .unwrap();
            encoder
                .write_image::<colortype::Gray8>(9, 12, &[50u8; 12 * 9])
                .unwrap();
        }

        let mut slide = TiffSlide::open(&path).unwrap();
        assert_eq!(slide.layout(), ChannelLayout::Layered { layers: 2 });
        let window = Window::new(0, 12, 0, 9);
        assert_eq!(slide.read_plane(0, window).unwrap(), vec![10u8; 12 * 9]);
        assert_eq!(slide.read_plane(1, window).unwrap(), vec![50u8; 12 * 9]);
    }

    #[test]
    fn test_four_layers_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("four.tiff");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            for _ in 0..4 {
                encoder
                    .write_image::<colortype::Gray8>(3, 3, &[1u8; 9])
                    .unwrap();
            }
        }
        assert!(matches!(
            TiffSlide::open(&path),
            Err(SlideError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_sixteen_bit_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.tiff");
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(file).unwrap();
            encoder
                .write_image::<colortype::Gray16>(2, 2, &[1u16; 4])
                .unwrap();
        }
        assert!(matches!(
            TiffSlide::open(&path),
            Err(SlideError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let store = TiffSlideStore::new("/nonexistent");
        assert!(matches!(store.open("abc"), Err(SlideError::NotFound(_))));
    }

    #[test]
    fn test_memory_store() {
        let mut store = InMemorySlideStore::new();
        store.insert("a", MemorySource::interleaved(Raster::filled(2, 2, &[1, 2, 3])));
        assert_eq!(store.open("a").unwrap().shape(), (2, 2));
        assert!(store.open("b").is_err());
    }
}
