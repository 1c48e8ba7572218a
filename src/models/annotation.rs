use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::error::{ConfigError, PipelineError};
use crate::models::ClassTable;

/// One row of the annotation table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Annotation {
    /// Source image identifier, also the stem of its tile names
    pub id: String,

    /// Class name, looked up in the class table
    pub organ: String,

    /// Column-major RLE mask; empty means no annotation
    #[serde(default)]
    pub rle: String,
}

/// Read an annotation table from a CSV file with a header row.
///
/// Columns `id`, `organ` and `rle` are required; others are ignored.
pub fn read_annotations(path: &Path) -> Result<Vec<Annotation>, PipelineError> {
    let reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let rows = collect_rows(reader)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded annotation table");
    Ok(rows)
}

/// Read an annotation table from any CSV reader.
pub fn parse_annotations<R: Read>(input: R) -> Result<Vec<Annotation>, PipelineError> {
    let reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    collect_rows(reader)
}

fn collect_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Annotation>, PipelineError> {
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let mut row: Annotation = record?;
        row.rle = row.rle.trim().to_string();
        rows.push(row);
    }
    Ok(rows)
}

/// Check every row's class against `classes`.
///
/// Runs over the whole table before any image is opened, so an unknown
/// class never leaves a partially written corpus behind.
pub fn validate_annotations(
    rows: &[Annotation],
    classes: &ClassTable,
) -> Result<(), ConfigError> {
    match rows.iter().find(|r| classes.index_of(&r.organ).is_none()) {
        Some(row) => Err(ConfigError::UnknownClass {
            id: row.id.clone(),
            class: row.organ.clone(),
        }),
        None => Ok(()),
    }
}
