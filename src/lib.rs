//! slidetile - whole-slide tiling for segmentation training sets
//!
//! Turns annotated gigapixel TIFF slides into image/mask PNG tile archives,
//! normalization statistics and stratified cross-validation splits.
//! This library exposes modules for integration testing.

pub mod error;
pub mod models;
pub mod services;
