//! Filename classification and group collection.
//!
//! A source directory holds flat files named `<key>_<index>.<ext>`. This module
//! derives the group key and order index from each name and buckets files that
//! share a key into [`Group`]s sorted by index. Anything that does not fit the
//! pattern is dropped and recorded as a [`CollectionFinding`], never raised as an
//! error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use tokio::fs::{ReadDir, read_dir};

use crate::error::{Error, Result};
use crate::path_utils::get_file_name_lossy;
use crate::types::{
    CollectedGroups, CollectionFinding, CollectionReport, Group, GroupKey, GroupMember,
    OrderIndex, has_supported_extension,
};

/// Name of the capture holding the group key in a classifier pattern.
pub const KEY_CAPTURE: &str = "key";
/// Name of the capture holding the order index in a classifier pattern.
pub const INDEX_CAPTURE: &str = "index";

lazy_static! {
    /// Default classifier pattern: `<key>_<digits>.<ext>`.
    /// The key is greedy, so it runs up to the last underscore before the digits.
    pub static ref DEFAULT_GROUP_REGEX: Regex =
        Regex::new(r"^(?P<key>.+)_(?P<index>\d+)\.(?P<ext>\w+)$").unwrap();
}

/// Checks that a custom classifier pattern defines both required captures.
pub fn validate_group_regex(regex: &Regex) -> std::result::Result<(), String> {
    let names: Vec<&str> = regex.capture_names().flatten().collect();
    for required in [KEY_CAPTURE, INDEX_CAPTURE] {
        if !names.contains(&required) {
            return Err(format!(
                "Pattern '{}' is missing the named capture `{}`",
                regex.as_str(),
                required
            ));
        }
    }
    Ok(())
}

/// Extracts the group key from a filename, or `None` when the name is unclassifiable.
pub fn extract_group_key(file_name: &str, regex: &Regex) -> Option<GroupKey> {
    regex
        .captures(file_name)
        .and_then(|caps| caps.name(KEY_CAPTURE))
        .map(|m| m.as_str().to_string())
        .filter(|key| !key.is_empty())
}

/// Extracts the order index from a filename.
///
/// Returns `None` when the pattern does not match or the digits do not fit an
/// [`OrderIndex`].
pub fn extract_order_index(file_name: &str, regex: &Regex) -> Option<OrderIndex> {
    regex
        .captures(file_name)
        .and_then(|caps| caps.name(INDEX_CAPTURE))
        .and_then(|m| m.as_str().parse::<OrderIndex>().ok())
}

/// Classifies a filename with the default pattern.
///
/// # Examples
///
/// ```
/// use tsunagi::collector::classify_filename;
///
/// assert_eq!(classify_filename("shop_a_12.jpg"), Some(("shop_a".to_string(), 12)));
/// assert_eq!(classify_filename("cover.jpg"), None);
/// ```
pub fn classify_filename(file_name: &str) -> Option<(GroupKey, OrderIndex)> {
    classify_filename_with(file_name, &DEFAULT_GROUP_REGEX)
}

/// Classifies a filename with a caller-supplied pattern.
pub fn classify_filename_with(file_name: &str, regex: &Regex) -> Option<(GroupKey, OrderIndex)> {
    let key = extract_group_key(file_name, regex)?;
    let index = extract_order_index(file_name, regex)?;
    Some((key, index))
}

/// Scans one directory and groups its image files by classified key.
#[derive(Debug)]
pub struct Collector<'a> {
    base_directory: &'a Path,
    group_name_regex: Option<&'a Regex>, // Custom classifier pattern
}

impl<'a> Collector<'a> {
    /// Creates a new Collector for the specified directory.
    ///
    /// # Arguments
    ///
    /// * `base_directory` - Directory whose immediate children are scanned
    /// * `group_name_regex` - Optional custom classifier; falls back to [`DEFAULT_GROUP_REGEX`]
    pub fn new(base_directory: &'a Path, group_name_regex: Option<&'a Regex>) -> Self {
        Self {
            base_directory,
            group_name_regex,
        }
    }

    fn active_regex(&self) -> &Regex {
        self.group_name_regex.unwrap_or(&DEFAULT_GROUP_REGEX)
    }

    /// Collects every classifiable image in the base directory into groups.
    ///
    /// Groups come back ordered by key; members are sorted ascending by index with
    /// a stable sort, so ties keep directory enumeration order.
    ///
    /// # Returns
    ///
    /// * `Ok(CollectedGroups)` - Possibly empty; an empty result is not an error
    /// * `Err(Error)` - The directory could not be read
    pub async fn collect_groups(&self) -> Result<CollectedGroups> {
        let entries = Self::collect_entries(self.base_directory).await?;
        let regex = self.active_regex();

        let mut report = CollectionReport {
            scanned_entries: entries.len(),
            findings: Vec::new(),
        };
        let mut buckets: BTreeMap<GroupKey, Vec<GroupMember>> = BTreeMap::new();

        for (path, is_file) in entries {
            if !is_file {
                debug!("Skipping non-file entry {:?}", path);
                report.findings.push(CollectionFinding::NotAFile(path));
                continue;
            }
            if !has_supported_extension(&path) {
                debug!("Skipping unsupported file {:?}", path);
                report
                    .findings
                    .push(CollectionFinding::UnsupportedExtension(path));
                continue;
            }

            // A key is only taken from a name that is valid UTF-8.
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!("Skipping non-UTF-8 file name {:?}", path);
                report.findings.push(CollectionFinding::Unclassifiable(path));
                continue;
            };
            let Some(key) = extract_group_key(file_name, regex) else {
                debug!("Skipping unclassifiable file {:?}", path);
                report.findings.push(CollectionFinding::Unclassifiable(path));
                continue;
            };

            let index = match extract_order_index(file_name, regex) {
                Some(index) => index,
                None => {
                    warn!(
                        "Could not parse an order index from {:?}; placing it first in group '{}'",
                        path, key
                    );
                    report
                        .findings
                        .push(CollectionFinding::MissingOrderIndex(path.clone()));
                    0
                }
            };

            buckets
                .entry(key)
                .or_default()
                .push(GroupMember { path, index });
        }

        let groups = buckets
            .into_iter()
            .map(|(key, mut members)| {
                members.sort_by_key(|m| m.index);
                Group { key, members }
            })
            .collect();

        Ok(CollectedGroups { groups, report })
    }

    /// Lists the immediate children of `directory` with a flag telling whether
    /// each one is a regular file (symlinks are followed).
    pub async fn collect_entries(directory: &Path) -> Result<Vec<(PathBuf, bool)>> {
        let mut entries: Vec<(PathBuf, bool)> = Vec::new();

        let mut paths: ReadDir = read_dir(directory).await.map_err(Error::Io)?;

        while let Some(entry) = paths.next_entry().await.map_err(Error::Io)? {
            let path = entry.path();
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            entries.push((path, is_file));
        }

        Ok(entries)
    }

    /// Lists the supported image files of `directory` sorted by file name.
    /// Used by the document compiler, which orders pages lexically.
    pub async fn collect_images_by_name(directory: &Path) -> Result<Vec<PathBuf>> {
        let mut images: Vec<PathBuf> = Self::collect_entries(directory)
            .await?
            .into_iter()
            .filter(|(path, is_file)| *is_file && has_supported_extension(path))
            .map(|(path, _)| path)
            .collect();
        images.sort_by_key(|path| get_file_name_lossy(path));
        Ok(images)
    }
}
