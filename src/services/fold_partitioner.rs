use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{PipelineError, StoreError};
use crate::models::{ClassTable, FoldConfig};
use crate::services::png_codec;
use crate::services::report::Diagnostic;
use crate::services::stratified_split::StratifiedKFold;
use crate::services::tile_store::{tile_stem, TileReader};

/// A written mask tile and its stratification label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldItem {
    /// File stem shared by the image and mask tile
    pub id: String,
    /// Largest mask value, 0 for a tile without foreground
    pub label: u8,
}

/// One cross-validation fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<String>,
    pub valid: Vec<String>,
    /// Validation tiles per label
    pub valid_counts: BTreeMap<u8, usize>,
}

/// All folds of one split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldPlan {
    pub folds: Vec<Fold>,
    /// Labels outside the class table
    pub diagnostics: Vec<Diagnostic>,
}

/// Read every mask tile and derive its label. Items are sorted by id.
pub fn collect_items(reader: &mut dyn TileReader) -> Result<Vec<FoldItem>, StoreError> {
    let mut items = Vec::new();
    for name in reader.names() {
        let bytes = reader.read(&name)?;
        let label = png_codec::mask_label(&name, &bytes)?;
        items.push(FoldItem {
            id: tile_stem(&name).to_string(),
            label,
        });
    }
    items.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::debug!(items = items.len(), "Collected mask tiles");
    Ok(items)
}

/// Splits a tile corpus into stratified folds.
pub struct FoldPartitioner<'a> {
    classes: &'a ClassTable,
    config: FoldConfig,
}

impl<'a> FoldPartitioner<'a> {
    pub fn new(classes: &'a ClassTable, config: FoldConfig) -> Self {
        Self { classes, config }
    }

    pub fn partition(&self, items: &[FoldItem]) -> Result<FoldPlan, PipelineError> {
        self.config.validate()?;

        let mut diagnostics = Vec::new();
        for (label, tiles) in label_counts(items.iter().map(|i| i.label)) {
            if label != 0 && self.classes.name_of(label).is_none() {
                tracing::warn!(label, tiles, "Mask label not in class table");
                diagnostics.push(Diagnostic::UnknownLabel { label, tiles });
            }
        }

        let labels: Vec<u8> = items.iter().map(|i| i.label).collect();
        let splitter = StratifiedKFold::new(self.config.count, self.config.seed);
        let folds = splitter
            .split(&labels)?
            .into_iter()
            .enumerate()
            .map(|(index, fold)| Fold {
                index,
                train: fold.train.iter().map(|&i| items[i].id.clone()).collect(),
                valid: fold.valid.iter().map(|&i| items[i].id.clone()).collect(),
                valid_counts: label_counts(fold.valid.iter().map(|&i| labels[i])),
            })
            .collect();

        Ok(FoldPlan { folds, diagnostics })
    }

    /// Human-readable name of a label
    pub fn label_name(&self, label: u8) -> &str {
        match label {
            0 => "background",
            _ => self.classes.name_of(label).unwrap_or("unknown"),
        }
    }

    /// Write `fold_{k}.txt`, `valid_{k}.txt` and `class_counts.csv` to `dir`.
    pub fn write(&self, plan: &FoldPlan, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir)?;
        for fold in &plan.folds {
            write_ids(&dir.join(format!("fold_{}.txt", fold.index)), &fold.train)?;
            write_ids(&dir.join(format!("valid_{}.txt", fold.index)), &fold.valid)?;
        }

        let mut labels: Vec<u8> = plan
            .folds
            .iter()
            .flat_map(|f| f.valid_counts.keys().copied())
            .collect();
        labels.sort_unstable();
        labels.dedup();

        let mut csv = csv::Writer::from_path(dir.join("class_counts.csv"))?;
        let mut header = vec!["label".to_string(), "class".to_string()];
        header.extend(plan.folds.iter().map(|f| format!("fold_{}", f.index)));
        csv.write_record(&header)?;
        for label in labels {
            let mut record = vec![label.to_string(), self.label_name(label).to_string()];
            record.extend(
                plan.folds
                    .iter()
                    .map(|f| f.valid_counts.get(&label).copied().unwrap_or(0).to_string()),
            );
            csv.write_record(&record)?;
        }
        csv.flush()?;

        tracing::info!(dir = %dir.display(), folds = plan.folds.len(), "Wrote fold splits");
        Ok(())
    }
}

fn label_counts(labels: impl Iterator<Item = u8>) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

fn write_ids(path: &Path, ids: &[String]) -> Result<(), StoreError> {
    let mut out = std::io::BufWriter::new(fs::File::create(path)?);
    for id in ids {
        writeln!(out, "{id}")?;
    }
    out.flush()?;
    Ok(())
}
