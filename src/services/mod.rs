pub mod corpus_builder;
pub mod fold_partitioner;
pub mod png_codec;
pub mod report;
pub mod slide_store;
pub mod stratified_split;
pub mod tile_store;

pub use corpus_builder::CorpusBuilder;
pub use fold_partitioner::{collect_items, Fold, FoldItem, FoldPartitioner, FoldPlan};
pub use report::{CorpusReport, Diagnostic, NormalizationStats, SourceSummary};
pub use slide_store::{InMemorySlideStore, SlideStore, TiffSlide, TiffSlideStore};
pub use stratified_split::{FoldIndices, StratifiedKFold};
pub use tile_store::{
    open_tile_reader, unpack, DirTileReader, MemoryTileStore, TileReader, TileWriter,
    ZipTileReader, ZipTileWriter,
};
