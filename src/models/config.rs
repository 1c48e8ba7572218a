use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::class_table::{default_classes, ClassTable};

/// Pipeline configuration loaded from a YAML file.
///
/// Every field has a default, so an empty file (or no file) is valid.
///
/// ```yaml
/// tiling:
///   tile_size: 640
///   reduce: 3
///   saturation_threshold: 40
///   pixel_threshold: 1000
/// folds:
///   count: 5
///   seed: 7
/// classes:
///   kidney: 1
///   prostate: 2
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub tiling: TilingConfig,

    #[serde(default)]
    pub folds: FoldConfig,

    /// Class name to mask label
    #[serde(default = "default_classes")]
    pub classes: BTreeMap<String, u8>,
}

/// Tile extraction knobs
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TilingConfig {
    /// Output tile edge in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,

    /// Integer downsample factor applied to each tile
    #[serde(default = "default_reduce")]
    pub reduce: usize,

    /// HSV saturation above which a pixel counts as tissue
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: u8,

    /// Minimum tissue pixel count at a 640 px tile edge
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: u64,
}

fn default_tile_size() -> usize {
    640
}

fn default_reduce() -> usize {
    3
}

fn default_saturation_threshold() -> u8 {
    tile_kit::extract::DEFAULT_SATURATION_THRESHOLD
}

fn default_pixel_threshold() -> u64 {
    tile_kit::extract::DEFAULT_PIXEL_THRESHOLD
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            reduce: default_reduce(),
            saturation_threshold: default_saturation_threshold(),
            pixel_threshold: default_pixel_threshold(),
        }
    }
}

impl TilingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::NonPositive { name: "tile size" });
        }
        if self.reduce == 0 {
            return Err(ConfigError::NonPositive {
                name: "reduce factor",
            });
        }
        if self.tile_size.checked_mul(self.reduce).is_none() {
            return Err(ConfigError::TileTooLarge {
                tile_size: self.tile_size,
                reduce: self.reduce,
            });
        }
        Ok(())
    }

    /// Emptiness filter scaled to this tile size.
    pub fn emptiness_filter(&self) -> tile_kit::EmptinessFilter {
        tile_kit::EmptinessFilter::for_tile_size(
            self.tile_size,
            self.saturation_threshold,
            self.pixel_threshold,
        )
    }
}

/// Cross-validation split knobs
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct FoldConfig {
    /// Number of folds
    #[serde(default = "default_fold_count")]
    pub count: usize,

    /// Shuffle seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_fold_count() -> usize {
    5
}

fn default_seed() -> u64 {
    7
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            count: default_fold_count(),
            seed: default_seed(),
        }
    }
}

impl FoldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count < 2 {
            return Err(ConfigError::TooFewFolds(self.count));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default(),
            folds: FoldConfig::default(),
            classes: default_classes(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            tracing::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::info!(
            path = %path.display(),
            classes = config.classes.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check all knobs and build the class table.
    pub fn validate(&self) -> Result<ClassTable, ConfigError> {
        self.tiling.validate()?;
        self.folds.validate()?;
        self.class_table()
    }

    pub fn class_table(&self) -> Result<ClassTable, ConfigError> {
        ClassTable::new(self.classes.iter().map(|(n, i)| (n.clone(), *i)))
    }
}
