//! Corpus builds over real TIFF sources and zip archives.

mod common;

use common::fixtures::{column_rle, left_tissue, TISSUE};
use common::{assert_png, TestCorpus};
use pretty_assertions::assert_eq;

use slidetile::error::{ConfigError, PipelineError, SlideError};
use slidetile::models::{read_annotations, ClassTable, TilingConfig};
use slidetile::services::png_codec;
use slidetile::services::{
    CorpusBuilder, CorpusReport, Diagnostic, TileReader, TiffSlideStore, ZipTileReader,
};

fn tiling() -> TilingConfig {
    TilingConfig {
        tile_size: 16,
        reduce: 2,
        saturation_threshold: 40,
        pixel_threshold: 1000,
    }
}

fn build(corpus: &TestCorpus) -> Result<CorpusReport, PipelineError> {
    let rows = read_annotations(&corpus.write_annotations())?;
    let classes = ClassTable::default();
    let slides = TiffSlideStore::new(corpus.images_dir());
    CorpusBuilder::new(&slides, &classes, tiling()).build_into(&rows, &corpus.out_dir())
}

#[test]
fn test_build_writes_matching_archives() {
    let mut corpus = TestCorpus::new();
    corpus
        .add_rgb("kid1", "kidney", &column_rle(50, 0, 10), (50, 70), left_tissue(30))
        .add_layered("lung1", "lung", "", (40, 40), |_, _| TISSUE)
        .add_rgb("blank", "spleen", "", (20, 20), left_tissue(0));

    let report = build(&corpus).unwrap();

    let mut train = ZipTileReader::open(corpus.out_dir().join("train.zip")).unwrap();
    let mut masks = ZipTileReader::open(corpus.out_dir().join("masks.zip")).unwrap();
    let expected = vec![
        "kid1_0000.png",
        "kid1_0001.png",
        "kid1_0003.png",
        "kid1_0004.png",
        "lung1_0000.png",
        "lung1_0001.png",
        "lung1_0002.png",
        "lung1_0003.png",
    ];
    assert_eq!(train.names(), expected);
    assert_eq!(masks.names(), expected);

    for name in &expected {
        let image = train.read(name).unwrap();
        assert_png(&image);
        let image = png_codec::decode(name, &image).unwrap();
        assert_eq!(image.shape(), (16, 16));
        assert_eq!(image.channels(), 3);

        let mask = png_codec::decode(name, &masks.read(name).unwrap()).unwrap();
        assert_eq!(mask.shape(), (16, 16));
        assert_eq!(mask.channels(), 1);
    }

    let mut label = |name: &str| {
        let bytes = masks.read(name).unwrap();
        png_codec::mask_label(name, &bytes).unwrap()
    };
    assert_eq!(label("kid1_0000.png"), 1);
    assert_eq!(label("kid1_0003.png"), 1);
    assert_eq!(label("kid1_0001.png"), 0);
    assert_eq!(label("lung1_0002.png"), 0);

    assert_eq!(report.tiles_written, 8);
    assert_eq!(report.observed_labels, vec![0, 1]);
    assert_eq!(
        report.diagnostics,
        vec![
            Diagnostic::EmptySource {
                id: "blank".to_string()
            },
            Diagnostic::MissingClass {
                class: "spleen".to_string(),
                label: 4
            },
            Diagnostic::MissingClass {
                class: "lung".to_string(),
                label: 5
            },
        ]
    );
    let counts: Vec<(usize, usize)> = report
        .sources
        .iter()
        .map(|s| (s.total_tiles, s.accepted_tiles))
        .collect();
    assert_eq!(counts, vec![(6, 4), (4, 4), (1, 0)]);
}

#[test]
fn test_stats_json_written() {
    let mut corpus = TestCorpus::new();
    corpus.add_layered("s1", "prostate", "", (32, 32), |_, _| TISSUE);
    build(&corpus).unwrap();

    let text = std::fs::read_to_string(corpus.out_dir().join("stats.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["tiles_written"], 1);
    assert_eq!(json["stats"]["tiles"], 1);
    let mean = json["stats"]["mean_u8"][0].as_f64().unwrap();
    assert!((mean - 200.0).abs() < 1e-6, "mean was {mean}");
    let std = json["stats"]["std"][1].as_f64().unwrap();
    assert!(std.abs() < 1e-6);
}

#[test]
fn test_layered_and_interleaved_sources_agree() {
    let pattern = |row: u32, col: u32| {
        [
            (row * 5 + 60) as u8,
            (col * 3 + 20) as u8,
            ((row + col) * 2 + 90) as u8,
        ]
    };
    let mut corpus = TestCorpus::new();
    corpus
        .add_rgb("rgb", "kidney", "", (45, 38), pattern)
        .add_layered("lay", "kidney", "", (45, 38), pattern);
    build(&corpus).unwrap();

    let mut train = ZipTileReader::open(corpus.out_dir().join("train.zip")).unwrap();
    let names = train.names();
    let rgb: Vec<&String> = names.iter().filter(|n| n.starts_with("rgb_")).collect();
    assert!(!rgb.is_empty());
    for name in rgb {
        let twin = name.replacen("rgb_", "lay_", 1);
        let a = png_codec::decode(name, &train.read(name).unwrap()).unwrap();
        let b = png_codec::decode(&twin, &train.read(&twin).unwrap()).unwrap();
        assert_eq!(a, b, "{name} differs from {twin}");
    }
}

#[test]
fn test_unknown_organ_fails_before_reading_images() {
    let mut corpus = TestCorpus::new();
    corpus.add_rgb("a", "liver", "", (10, 10), left_tissue(10));
    let err = build(&corpus).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::UnknownClass { .. })
    ));
    assert!(!corpus.out_dir().join("train.zip").exists());
    assert!(!corpus.out_dir().join("masks.zip").exists());
    assert!(!corpus.out_dir().join("stats.json").exists());
}

#[test]
fn test_invalid_tiling_leaves_no_output() {
    let mut corpus = TestCorpus::new();
    corpus.add_rgb("a", "kidney", "", (10, 10), left_tissue(10));
    let rows = read_annotations(&corpus.write_annotations()).unwrap();
    let classes = ClassTable::default();
    let slides = TiffSlideStore::new(corpus.images_dir());
    let tiling = TilingConfig {
        reduce: 0,
        ..tiling()
    };

    let err = CorpusBuilder::new(&slides, &classes, tiling)
        .build_into(&rows, &corpus.out_dir())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(!corpus.out_dir().exists());
}

#[test]
fn test_missing_source_image() {
    let mut corpus = TestCorpus::new();
    corpus.add_rgb("a", "kidney", "", (10, 10), left_tissue(10));
    std::fs::remove_file(corpus.images_dir().join("a.tiff")).unwrap();
    let err = build(&corpus).unwrap_err();
    assert!(matches!(err, PipelineError::Slide(SlideError::NotFound(_))));
}

#[test]
fn test_run_past_image_end_is_a_format_error() {
    let mut corpus = TestCorpus::new();
    corpus.add_rgb("a", "kidney", "95 10", (10, 10), left_tissue(10));
    match build(&corpus).unwrap_err() {
        PipelineError::Format { id, .. } => assert_eq!(id, "a"),
        other => panic!("unexpected error: {other}"),
    }
}
