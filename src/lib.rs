//! Tsunagi - Filename-Grouped Image Stitching Library
//!
//! This crate groups the images of a directory by a key derived from their
//! filenames (`<key>_<index>.<ext>`), joins every group horizontally into one
//! composite JPEG, and can compile a directory of images into a paginated EPUB
//! with one numbered title per page.
//!
//! # Getting Started
//!
//! Describe the run with `TsunagiConfig`'s builder, then execute it with one of
//! its entry points. Per-file and per-group problems never abort a batch; they
//! are collected into the returned report.
//!
//! ```rust,no_run
//! use tsunagi::prelude::*;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> tsunagi::error::Result<()> {
//!     // 1. Configure the run
//!     let config = TsunagiConfig::builder()
//!         .source_path(PathBuf::from("./store_photos"))
//!         .target_path(PathBuf::from("./joined"))
//!         .output_quality(95u8)
//!         .build()?;
//!
//!     // 2. Stitch every group found in the source directory
//!     let report = config.stitch_from_source().await?;
//!     if report.is_noop() {
//!         println!("No files named like <key>_<number>.<ext> were found.");
//!     }
//!     for group in &report.groups {
//!         println!("{}: {:?}", group.key, group.status);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! The building blocks are public too: [`collector::classify_filename`],
//! [`loader::load_source_image`] and [`compositor::stitch_horizontal`] can be
//! used on their own.

pub mod collector;
pub mod compositor;
pub mod error;
pub mod generator;
pub mod loader;
pub mod path_utils;
pub mod tsunagi;
pub mod types;

// Publicly expose the main `TsunagiConfig` struct and its builder
pub use tsunagi::TsunagiConfig;
pub use tsunagi::TsunagiConfigBuilder;

// Re-export core types for direct access
pub use types::{
    BatchReport, CollectedGroups, CollectionFinding, CollectionReport, DocumentMetadata,
    DocumentReport, FileFailure, Group, GroupKey, GroupMember, GroupReport, GroupStatus,
    OrderIndex, SourceImage, TsunagiExecutionMode,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types, so `use tsunagi::prelude::*;` is
/// enough for typical use.
pub mod prelude {
    pub use super::{
        BatchReport, CollectedGroups, CollectionFinding, CollectionReport, DocumentMetadata,
        DocumentReport, FileFailure, Group, GroupKey, GroupMember, GroupReport, GroupStatus,
        OrderIndex, SourceImage, TsunagiConfig, TsunagiConfigBuilder, TsunagiExecutionMode,
        error, types,
    };
    pub use crate::collector::{Collector, classify_filename};
    pub use crate::compositor::stitch_horizontal;
    pub use crate::loader::load_source_image;
    pub use regex::Regex;
    pub use std::path::{Path, PathBuf};
}
