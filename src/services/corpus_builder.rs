use std::collections::BTreeSet;
use std::path::Path;

use tile_kit::{
    rle, EmptinessFilter, RasterSource, RunningStats, StatsError, TileExtractor, TileStatus,
};

use crate::error::{ConfigError, PipelineError, StoreError};
use crate::models::{validate_annotations, Annotation, ClassTable, TilingConfig};
use crate::services::png_codec;
use crate::services::report::{CorpusReport, Diagnostic, NormalizationStats, SourceSummary};
use crate::services::slide_store::SlideStore;
use crate::services::tile_store::{TileWriter, ZipTileWriter};

/// Image tile archive written by [`CorpusBuilder::build_into`]
pub const IMAGE_ARCHIVE: &str = "train.zip";
/// Mask tile archive written by [`CorpusBuilder::build_into`]
pub const MASK_ARCHIVE: &str = "masks.zip";
/// Run report written by [`CorpusBuilder::build_into`]
pub const REPORT_FILE: &str = "stats.json";

/// Turns annotated source images into image/mask tile archives.
///
/// Sources are processed one at a time; each source handle is dropped as
/// soon as its last tile has been produced. Accepted tiles are written to
/// both stores as `{id}_{index:04}.png`, with mask values multiplied by the
/// source's class label.
pub struct CorpusBuilder<'a, S> {
    slides: &'a S,
    classes: &'a ClassTable,
    tiling: TilingConfig,
}

/// Accumulated state of one build
struct Accumulator {
    stats: RunningStats,
    seen: [bool; 256],
    tiles_written: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            stats: RunningStats::new(),
            seen: [false; 256],
            tiles_written: 0,
        }
    }
}

impl<'a, S: SlideStore> CorpusBuilder<'a, S> {
    pub fn new(slides: &'a S, classes: &'a ClassTable, tiling: TilingConfig) -> Self {
        Self {
            slides,
            classes,
            tiling,
        }
    }

    /// Build the corpus into `out` as `train.zip`, `masks.zip` and
    /// `stats.json`. Nothing is created when the configuration or the
    /// annotation classes are invalid.
    pub fn build_into(
        &self,
        annotations: &[Annotation],
        out: &Path,
    ) -> Result<CorpusReport, PipelineError> {
        self.tiling.validate()?;
        validate_annotations(annotations, self.classes)?;

        std::fs::create_dir_all(out).map_err(StoreError::from)?;
        let mut images = ZipTileWriter::create(out.join(IMAGE_ARCHIVE))?;
        let mut masks = ZipTileWriter::create(out.join(MASK_ARCHIVE))?;
        let report = self.build(annotations, &mut images, &mut masks)?;
        report.write_json(&out.join(REPORT_FILE))?;
        Ok(report)
    }

    /// Build the corpus for every annotation row.
    ///
    /// Configuration and class names are checked before any image is
    /// opened. Both stores are finished exactly once on success.
    pub fn build(
        &self,
        annotations: &[Annotation],
        images: &mut dyn TileWriter,
        masks: &mut dyn TileWriter,
    ) -> Result<CorpusReport, PipelineError> {
        self.tiling.validate()?;
        validate_annotations(annotations, self.classes)?;

        let filter = self.tiling.emptiness_filter();
        let mut acc = Accumulator::new();
        let mut sources = Vec::with_capacity(annotations.len());
        let mut diagnostics = Vec::new();

        for row in annotations {
            let summary = self.process(row, filter, &mut acc, images, masks)?;
            if summary.accepted_tiles == 0 {
                tracing::warn!(source = %row.id, "Source produced no accepted tiles");
                diagnostics.push(Diagnostic::EmptySource { id: row.id.clone() });
            }
            sources.push(summary);
        }

        images.finish()?;
        masks.finish()?;

        let observed_labels: Vec<u8> = (0..=255u8).filter(|&v| acc.seen[v as usize]).collect();

        let annotated: BTreeSet<(u8, &str)> = sources
            .iter()
            .map(|s| (s.label, s.organ.as_str()))
            .collect();
        for (label, class) in annotated {
            if !acc.seen[label as usize] {
                tracing::warn!(class, label, "Class never appeared in an accepted tile");
                diagnostics.push(Diagnostic::MissingClass {
                    class: class.to_string(),
                    label,
                });
            }
        }

        let stats = match acc.stats.finalize() {
            Ok(stats) => Some(NormalizationStats::new(acc.stats.count(), stats)),
            Err(StatsError::NoObservations) => {
                tracing::warn!("No tiles accepted, normalization statistics are undefined");
                diagnostics.push(Diagnostic::NoAcceptedTiles);
                None
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            sources = sources.len(),
            tiles = acc.tiles_written,
            diagnostics = diagnostics.len(),
            "Corpus build finished"
        );

        Ok(CorpusReport {
            sources,
            tiles_written: acc.tiles_written,
            stats,
            observed_labels,
            diagnostics,
        })
    }

    fn process(
        &self,
        row: &Annotation,
        filter: EmptinessFilter,
        acc: &mut Accumulator,
        images: &mut dyn TileWriter,
        masks: &mut dyn TileWriter,
    ) -> Result<SourceSummary, PipelineError> {
        let label = self
            .classes
            .index_of(&row.organ)
            .ok_or_else(|| ConfigError::UnknownClass {
                id: row.id.clone(),
                class: row.organ.clone(),
            })?;

        let slide = self.slides.open(&row.id)?;
        let (height, width) = slide.shape();
        let mask = rle::decode(&row.rle, height, width).map_err(|source| PipelineError::Format {
            id: row.id.clone(),
            source,
        })?;

        let extract_error = |source| PipelineError::Extract {
            id: row.id.clone(),
            source,
        };
        let mut extractor = TileExtractor::new(
            slide,
            Some(mask),
            self.tiling.tile_size,
            self.tiling.reduce,
            filter,
        )
        .map_err(extract_error)?;

        let total_tiles = extractor.len();
        let mut accepted_tiles = 0;
        for tile in extractor.tiles() {
            let mut tile = tile.map_err(extract_error)?;
            let TileStatus::Accepted(index) = tile.status else {
                continue;
            };

            tile.mask.scale_labels(label);
            for &v in tile.mask.data() {
                acc.seen[v as usize] = true;
            }
            acc.stats.observe(&tile.image)?;

            let name = format!("{}_{:04}.png", row.id, index);
            images.put(&name, &png_codec::encode_rgb(&tile.image)?)?;
            masks.put(&name, &png_codec::encode_gray(&tile.mask)?)?;
            accepted_tiles += 1;
            acc.tiles_written += 1;
        }

        tracing::info!(
            source = %row.id,
            organ = %row.organ,
            height,
            width,
            accepted = accepted_tiles,
            total = total_tiles,
            "Processed source"
        );

        Ok(SourceSummary {
            id: row.id.clone(),
            organ: row.organ.clone(),
            label,
            total_tiles,
            accepted_tiles,
        })
    }
}
