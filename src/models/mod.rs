pub mod annotation;
pub mod class_table;
pub mod config;

pub use annotation::{parse_annotations, read_annotations, validate_annotations, Annotation};
pub use class_table::{default_classes, ClassTable};
pub use config::{AppConfig, FoldConfig, TilingConfig};
