//! Test fixtures: scratch corpora with TIFF sources and annotation tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};

/// Stained tissue colour (high saturation)
pub const TISSUE: [u8; 3] = [200, 40, 120];

/// Slide background (saturation 0)
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

/// A scratch directory with `images/`, an annotation table and an output dir.
pub struct TestCorpus {
    dir: TempDir,
    rows: Vec<(String, String, String)>,
}

impl TestCorpus {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        Self {
            dir,
            rows: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root().join("images")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn annotations_path(&self) -> PathBuf {
        self.root().join("train.csv")
    }

    /// Add an interleaved RGB source whose pixels come from `pixel(row, col)`.
    pub fn add_rgb(
        &mut self,
        id: &str,
        organ: &str,
        rle: &str,
        (height, width): (u32, u32),
        pixel: impl Fn(u32, u32) -> [u8; 3],
    ) -> &mut Self {
        let mut data = Vec::with_capacity((height * width * 3) as usize);
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&pixel(row, col));
            }
        }
        let file = File::create(self.images_dir().join(format!("{id}.tiff"))).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image::<colortype::RGB8>(width, height)
            .unwrap();
        image.rows_per_strip(7).unwrap();
        image.write_data(&data).unwrap();

        self.rows.push((id.into(), organ.into(), rle.into()));
        self
    }

    /// Add a layered source: one grayscale page per channel.
    pub fn add_layered(
        &mut self,
        id: &str,
        organ: &str,
        rle: &str,
        (height, width): (u32, u32),
        pixel: impl Fn(u32, u32) -> [u8; 3],
    ) -> &mut Self {
        let file = File::create(self.images_dir().join(format!("{id}.tiff"))).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        for channel in 0..3 {
            let mut plane = Vec::with_capacity((height * width) as usize);
            for row in 0..height {
                for col in 0..width {
                    plane.push(pixel(row, col)[channel]);
                }
            }
            encoder
                .write_image::<colortype::Gray8>(width, height, &plane)
                .unwrap();
        }

        self.rows.push((id.into(), organ.into(), rle.into()));
        self
    }

    /// Write the annotation table for every source added so far.
    pub fn write_annotations(&self) -> PathBuf {
        let path = self.annotations_path();
        let mut writer = csv::Writer::from_path(&path).unwrap();
        writer
            .write_record(["id", "organ", "data_source", "rle"])
            .unwrap();
        for (id, organ, rle) in &self.rows {
            writer
                .write_record([id.as_str(), organ.as_str(), "HPA", rle.as_str()])
                .unwrap();
        }
        writer.flush().unwrap();
        path
    }
}

/// Tissue in columns `< split`, background elsewhere.
pub fn left_tissue(split: u32) -> impl Fn(u32, u32) -> [u8; 3] {
    move |_, col| if col < split { TISSUE } else { BACKGROUND }
}

/// Column-major RLE covering whole columns `[first, first + count)`.
pub fn column_rle(height: u32, first: u32, count: u32) -> String {
    format!("{} {}", first * height + 1, count * height)
}
