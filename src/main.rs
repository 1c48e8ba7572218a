use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slidetile::models::{read_annotations, AppConfig};
use slidetile::services::{
    collect_items, open_tile_reader, unpack, CorpusBuilder, FoldPartitioner, TiffSlideStore,
};

#[derive(Parser)]
#[command(name = "slidetile")]
#[command(about = "Tile annotated whole-slide images into segmentation training corpora")]
struct Cli {
    /// YAML configuration file (falls back to $CONFIG_FILE)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut source images into image/mask tile archives
    Build {
        /// Annotation table (CSV with id, organ, rle columns)
        #[arg(short, long)]
        annotations: PathBuf,

        /// Directory holding `{id}.tiff` source images
        #[arg(short, long)]
        images: PathBuf,

        /// Output directory for train.zip, masks.zip and stats.json
        #[arg(short, long)]
        out: PathBuf,

        /// Output tile edge in pixels
        #[arg(long)]
        tile_size: Option<usize>,

        /// Downsample factor
        #[arg(long)]
        reduce: Option<usize>,

        /// Saturation above which a pixel counts as tissue
        #[arg(long)]
        saturation_threshold: Option<u8>,

        /// Tissue pixel count threshold at a 640 px tile edge
        #[arg(long)]
        pixel_threshold: Option<u64>,
    },
    /// Split written mask tiles into stratified cross-validation folds
    Split {
        /// Mask tiles: a zip archive or a directory of PNG files
        #[arg(short, long)]
        masks: PathBuf,

        /// Output directory for fold_k.txt / valid_k.txt
        #[arg(short, long)]
        out: PathBuf,

        /// Number of folds
        #[arg(long)]
        folds: Option<usize>,

        /// Shuffle seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Extract a tile archive into a directory
    Unpack {
        /// Tile archive
        #[arg(short, long)]
        archive: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var("CONFIG_FILE").ok().map(PathBuf::from));

    match cli.command {
        Some(Commands::Build {
            annotations,
            images,
            out,
            tile_size,
            reduce,
            saturation_threshold,
            pixel_threshold,
        }) => {
            init_logging();
            let mut config = load_config(config_path.as_deref())?;
            let tiling = &mut config.tiling;
            tiling.tile_size = tile_size.unwrap_or(tiling.tile_size);
            tiling.reduce = reduce.unwrap_or(tiling.reduce);
            tiling.saturation_threshold =
                saturation_threshold.unwrap_or(tiling.saturation_threshold);
            tiling.pixel_threshold = pixel_threshold.unwrap_or(tiling.pixel_threshold);
            run_build(&config, &annotations, &images, &out)
        }
        Some(Commands::Split {
            masks,
            out,
            folds,
            seed,
        }) => {
            init_logging();
            let mut config = load_config(config_path.as_deref())?;
            config.folds.count = folds.unwrap_or(config.folds.count);
            config.folds.seed = seed.unwrap_or(config.folds.seed);
            run_split(&config, &masks, &out)
        }
        Some(Commands::Unpack { archive, out }) => {
            init_logging();
            let count = unpack(&archive, &out)
                .with_context(|| format!("Failed to unpack {}", archive.display()))?;
            println!("Unpacked {count} entries into {}", out.display());
            Ok(())
        }
        None => run_status_command(config_path.as_deref()),
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidetile=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    AppConfig::load(path).context("Failed to load configuration")
}

/// Tile every annotated source and write the archives and report
fn run_build(
    config: &AppConfig,
    annotations: &Path,
    images: &Path,
    out: &Path,
) -> anyhow::Result<()> {
    let classes = config.validate().context("Invalid configuration")?;
    let rows = read_annotations(annotations)
        .with_context(|| format!("Failed to read {}", annotations.display()))?;

    let slides = TiffSlideStore::new(images);
    let builder = CorpusBuilder::new(&slides, &classes, config.tiling);
    let report = builder
        .build_into(&rows, out)
        .with_context(|| format!("Failed to build corpus into {}", out.display()))?;

    println!(
        "Wrote {} tile pairs from {} sources to {}",
        report.tiles_written,
        report.sources.len(),
        out.display()
    );
    if let Some(stats) = &report.stats {
        println!("  mean: {:?}", stats.mean_u8);
        println!("  std:  {:?}", stats.std_u8);
    }
    println!("  labels observed: {:?}", report.observed_labels);
    for diagnostic in &report.diagnostics {
        println!("  warning: {diagnostic}");
    }
    Ok(())
}

/// Stratify written mask tiles into folds
fn run_split(config: &AppConfig, masks: &Path, out: &Path) -> anyhow::Result<()> {
    let classes = config.validate().context("Invalid configuration")?;
    let mut reader =
        open_tile_reader(masks).with_context(|| format!("Failed to open {}", masks.display()))?;
    let items = collect_items(reader.as_mut())?;

    let partitioner = FoldPartitioner::new(&classes, config.folds);
    let plan = partitioner.partition(&items)?;
    partitioner.write(&plan, out)?;

    println!(
        "Split {} tiles into {} folds in {}",
        items.len(),
        plan.folds.len(),
        out.display()
    );
    for fold in &plan.folds {
        let counts: Vec<String> = fold
            .valid_counts
            .iter()
            .map(|(label, n)| format!("{}={n}", partitioner.label_name(*label)))
            .collect();
        println!(
            "  fold {}: {} train, {} valid ({})",
            fold.index,
            fold.train.len(),
            fold.valid.len(),
            counts.join(", ")
        );
    }
    for diagnostic in &plan.diagnostics {
        println!("  warning: {diagnostic}");
    }
    Ok(())
}

/// Display the effective configuration
fn run_status_command(config_path: Option<&Path>) -> anyhow::Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    println!("Slidetile v{VERSION}");
    println!("Whole-slide tiling for segmentation training sets\n");

    println!("Environment Variables:");
    println!(
        "  CONFIG_FILE = {}",
        std::env::var("CONFIG_FILE").as_deref().unwrap_or("(not set)")
    );
    println!(
        "  RUST_LOG    = {}",
        std::env::var("RUST_LOG")
            .as_deref()
            .unwrap_or("slidetile=info (default)")
    );

    let source = match config_path {
        Some(path) if path.exists() => path.display().to_string(),
        Some(_) => "defaults (file not found)".to_string(),
        None => "defaults".to_string(),
    };
    println!("\nConfig: {source}");

    let config = match config_path.filter(|p| p.exists()) {
        Some(path) => load_config(Some(path))?,
        None => AppConfig::default(),
    };

    let t = &config.tiling;
    println!("\nTiling:");
    println!("  tile_size            = {}", t.tile_size);
    println!("  reduce               = {}", t.reduce);
    println!("  saturation_threshold = {}", t.saturation_threshold);
    println!(
        "  pixel_threshold      = {} (effective {})",
        t.pixel_threshold,
        t.emptiness_filter().pixel_threshold
    );

    println!("\nFolds:");
    println!("  count = {}", config.folds.count);
    println!("  seed  = {}", config.folds.seed);

    println!("\nClasses:");
    match config.validate() {
        Ok(classes) => {
            for (index, name) in classes.iter() {
                println!("  {index}: {name}");
            }
        }
        Err(e) => println!("  invalid: {e}"),
    }

    println!("\nRun 'slidetile --help' for commands.");
    Ok(())
}
