use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::StoreError;

/// Append-only sink of named tile blobs
pub trait TileWriter {
    /// Add one entry. Names are never overwritten.
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Close the store. Any later call fails with [`StoreError::Closed`].
    fn finish(&mut self) -> Result<(), StoreError>;
}

/// Read access to a set of named tile blobs
pub trait TileReader {
    /// Entry names, sorted.
    fn names(&self) -> Vec<String>;

    fn read(&mut self, name: &str) -> Result<Vec<u8>, StoreError>;
}

/// Tile sink writing a zip archive.
///
/// PNG data is already compressed, so entries are stored as is.
pub struct ZipTileWriter {
    path: PathBuf,
    writer: Option<ZipWriter<BufWriter<File>>>,
    names: HashSet<String>,
}

impl ZipTileWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(ZipWriter::new(BufWriter::new(file))),
            names: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TileWriter for ZipTileWriter {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let writer = self.writer.as_mut().ok_or(StoreError::Closed)?;
        if !self.names.insert(name.to_string()) {
            return Err(StoreError::DuplicateEntry(name.to_string()));
        }
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        let writer = self.writer.take().ok_or(StoreError::Closed)?;
        let mut inner = writer.finish()?;
        inner.flush()?;
        tracing::debug!(path = %self.path.display(), entries = self.names.len(), "Closed tile archive");
        Ok(())
    }
}

/// In-memory tile store, readable and writable
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    entries: BTreeMap<String, Vec<u8>>,
    closed: bool,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }
}

impl TileWriter for MemoryTileStore {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        if self.entries.contains_key(name) {
            return Err(StoreError::DuplicateEntry(name.to_string()));
        }
        self.entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}

impl TileReader for MemoryTileStore {
    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::MissingEntry(name.to_string()))
    }
}

/// Tiles read from a zip archive
pub struct ZipTileReader {
    archive: ZipArchive<BufReader<File>>,
}

impl ZipTileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            archive: ZipArchive::new(BufReader::new(file))?,
        })
    }
}

impl TileReader for ZipTileReader {
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|n| n.ends_with(".png"))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, StoreError> {
        let mut entry = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => StoreError::MissingEntry(name.to_string()),
            other => StoreError::Zip(other),
        })?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Tiles read from a directory of `.png` files
pub struct DirTileReader {
    dir: PathBuf,
    names: Vec<String>,
}

impl DirTileReader {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".png") {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(Self { dir, names })
    }
}

impl TileReader for DirTileReader {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.dir.join(name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::MissingEntry(name.to_string()),
            _ => StoreError::Io(e),
        })
    }
}

/// Open a directory or a zip archive of mask tiles.
pub fn open_tile_reader(path: &Path) -> Result<Box<dyn TileReader>, StoreError> {
    if path.is_dir() {
        Ok(Box::new(DirTileReader::open(path)?))
    } else {
        Ok(Box::new(ZipTileReader::open(path)?))
    }
}

/// Extract every entry of a tile archive into `out`. Returns the entry count.
pub fn unpack(archive: &Path, out: &Path) -> Result<usize, StoreError> {
    fs::create_dir_all(out)?;
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    let count = zip.len();
    zip.extract(out)?;
    tracing::info!(
        archive = %archive.display(),
        out = %out.display(),
        entries = count,
        "Unpacked tile archive"
    );
    Ok(count)
}

/// Identifier of a tile: its file name without the `.png` suffix.
pub fn tile_stem(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.strip_suffix(".png").unwrap_or(base)
}
