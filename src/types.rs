//! Core data types, enums, and reports for the Tsunagi stitching library.
//!
//! This module defines the fundamental data structures used throughout Tsunagi:
//! - Grouping structures (`Group`, `GroupMember`, `CollectedGroups`)
//! - The decoded image wrapper (`SourceImage`)
//! - Reporting types (`CollectionReport`, `BatchReport`, `DocumentReport`)
//! - Document metadata (`DocumentMetadata`)
//! - Execution modes for preflight validation (`TsunagiExecutionMode`)

use chrono::{DateTime, Utc};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Identity string shared by every image destined for the same composite.
pub type GroupKey = String;

/// Integer taken from a filename, controlling left-to-right placement.
pub type OrderIndex = u64;

/// Image extensions the collector admits (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff"];

/// Returns true when the path carries one of the [`SUPPORTED_EXTENSIONS`].
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// One file admitted to a group, with the index parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct GroupMember {
    pub path: PathBuf,
    pub index: OrderIndex,
}

/// Files sharing one [`GroupKey`], sorted ascending by [`OrderIndex`].
///
/// Groups built by the collector always hold at least one member. Groups handed
/// in by a caller may be empty; the batch driver reports those as having no
/// usable images.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct Group {
    pub key: GroupKey,
    pub members: Vec<GroupMember>,
}

impl Group {
    /// Builds a group from paths already in the desired order.
    /// Indices are assigned from the position in `paths`, starting at 1.
    pub fn from_ordered_paths(key: impl Into<GroupKey>, paths: Vec<PathBuf>) -> Self {
        let members = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| GroupMember {
                path,
                index: i as OrderIndex + 1,
            })
            .collect();
        Self {
            key: key.into(),
            members,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.members.iter().map(|m| &m.path)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A non-fatal observation made while scanning a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub enum CollectionFinding {
    /// Directory or other non-regular entry
    NotAFile(PathBuf),
    UnsupportedExtension(PathBuf),
    /// Name does not have the `<key>_<index>.<ext>` shape, or is not valid UTF-8
    Unclassifiable(PathBuf),
    /// Key matched but the index could not be parsed; the file was placed at index 0
    MissingOrderIndex(PathBuf),
}

/// Summary of one directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct CollectionReport {
    pub scanned_entries: usize,
    pub findings: Vec<CollectionFinding>,
}

/// Outcome of the collection phase: groups ordered by key, plus the scan report.
#[derive(Debug, Clone, Default)]
pub struct CollectedGroups {
    pub groups: Vec<Group>,
    pub report: CollectionReport,
}

impl CollectedGroups {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.key == key)
    }
}

/// A decoded bitmap normalized to 8-bit RGB, tagged with the file it came from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>, pixels: RgbImage) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// A file that could not be used, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Final state of one group after a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub enum GroupStatus {
    Stitched {
        output_path: PathBuf,
        width: u32,
        height: u32,
        images_used: usize,
    },
    /// Every member failed to decode (or the group was empty)
    NoUsableImages,
    CompositeFailed(String),
    WriteFailed {
        output_path: PathBuf,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct GroupReport {
    pub key: GroupKey,
    pub status: GroupStatus,
    pub decode_failures: Vec<FileFailure>,
}

impl GroupReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, GroupStatus::Stitched { .. })
    }
}

/// Aggregate result of one batch run.
///
/// An empty `groups` list means no conforming files were found; that is a no-op,
/// not a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct BatchReport {
    pub groups: Vec<GroupReport>,
    /// Present when the run started from a directory scan.
    pub collection: Option<CollectionReport>,
}

impl BatchReport {
    /// Number of groups whose composite was written.
    pub fn succeeded(&self) -> usize {
        self.groups.iter().filter(|g| g.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.groups.len() - self.succeeded()
    }

    /// True when no groups were formed at all.
    pub fn is_noop(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.key == key)
    }
}

/// Metadata embedded into a compiled document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct DocumentMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String, // e.g., "en", "zh"
    pub description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Creates a `DocumentMetadata` with the given title and default language "en".
    pub fn default_with_title(title: String) -> Self {
        Self {
            title,
            language: "en".to_string(),
            ..Default::default()
        }
    }
}

/// Outcome of [`compile_document`](crate::TsunagiConfig::compile_document).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct DocumentReport {
    /// `None` when no page could be added and nothing was written.
    pub output_path: Option<PathBuf>,
    /// Page titles in document order.
    pub pages: Vec<String>,
    pub failures: Vec<FileFailure>,
}

/// Specifies the intended starting point for a Tsunagi run.
/// Used by `TsunagiConfig::preflight_check` to tailor validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TsunagiExecutionMode {
    /// Groups are collected from the configured `source_path`.
    FromSource,
    /// The caller hands in groups it built itself.
    FromCollectedData,
    /// A titled document is compiled from a directory of images.
    Document,
}
