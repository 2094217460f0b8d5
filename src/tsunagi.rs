use log::{debug, error, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::task::spawn_blocking;

use crate::collector::{Collector, validate_group_regex};
use crate::compositor::{DEFAULT_JPEG_QUALITY, encode_jpeg, stitch_horizontal, write_composite};
use crate::error::{Error, Result};
use crate::generator::{DocumentPage, Generator, epub::EPub};
use crate::loader::load_source_image;
use crate::path_utils::{composite_output_path, get_file_stem_lossy, sanitize_filename};
use crate::types::{
    BatchReport, CollectedGroups, DocumentMetadata, DocumentReport, FileFailure, Group,
    GroupReport, GroupStatus, SourceImage, TsunagiExecutionMode,
};

/// The main Tsunagi configuration, built declaratively using the builder pattern.
///
/// This struct holds every setting a stitching or document run needs. Once
/// configured, it executes through one of its entry points:
///
/// - [`stitch_from_source`](TsunagiConfig::stitch_from_source): scan, group, stitch, write
/// - [`stitch_from_collected_data`](TsunagiConfig::stitch_from_collected_data): stitch caller-built groups
/// - [`collect_groups`](TsunagiConfig::collect_groups): scan and group only
/// - [`compile_document`](TsunagiConfig::compile_document): titled EPUB from a directory of images
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use tsunagi::prelude::*;
/// # use std::path::PathBuf;
/// let config = TsunagiConfig::builder()
///     .source_path(PathBuf::from("./store_photos"))
///     .target_path(PathBuf::from("./joined"))
///     .output_quality(90u8)
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct TsunagiConfig {
    /// Directory whose immediate children are grouped and stitched.
    ///
    /// Required for [`stitch_from_source`](TsunagiConfig::stitch_from_source) and
    /// [`collect_groups`](TsunagiConfig::collect_groups).
    #[builder(default)]
    pub source_path: PathBuf,

    /// Directory where composites (`<key>.jpg`) and documents (`<title>.epub`) are written.
    #[builder(default)]
    pub target_path: PathBuf,

    /// JPEG quality (1-100) for composites and for images embedded in documents.
    #[builder(default = "DEFAULT_JPEG_QUALITY")]
    pub output_quality: u8,

    /// Whether to create `target_path` when it does not exist.
    ///
    /// If `false` and the directory is missing, every group reports a write failure.
    #[builder(default = "true")]
    pub create_output_directory: bool,

    /// Custom classifier pattern.
    ///
    /// Must define the named captures `key` and `index`. If not provided, files are
    /// classified as `<key>_<index>.<ext>`.
    ///
    /// Example: `r"^(?P<index>\d+)-(?P<key>.+)\.\w+$"` to group `03-lobby.png` under "lobby"
    #[builder(default)]
    pub group_name_regex_str: Option<String>,

    /// Metadata for documents produced by [`compile_document`](TsunagiConfig::compile_document).
    #[builder(default = "DocumentMetadata::default_with_title(\"Untitled Document\".to_string())")]
    pub metadata: DocumentMetadata,

    /// Compiled regex from `group_name_regex_str`. Internal use only.
    #[builder(setter(skip), default = "self.compile_group_name_regex()")]
    pub(crate) compiled_group_name_regex: Option<Regex>,
}

impl std::fmt::Debug for TsunagiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsunagiConfig")
            .field("source_path", &self.source_path)
            .field("target_path", &self.target_path)
            .field("output_quality", &self.output_quality)
            .field("create_output_directory", &self.create_output_directory)
            .field("group_name_regex_str", &self.group_name_regex_str)
            .field("metadata", &self.metadata)
            // Skip the compiled regex in debug output
            .finish()
    }
}

impl TsunagiConfig {
    /// Creates a new builder for configuring `TsunagiConfig`.
    pub fn builder() -> TsunagiConfigBuilder {
        TsunagiConfigBuilder::default()
    }

    /// Performs validation checks on the configuration for a specific execution mode.
    ///
    /// All entry points call this automatically; calling it manually is only useful
    /// for early error reporting.
    ///
    /// # Arguments
    ///
    /// * `mode` - The intended execution mode:
    ///   - [`TsunagiExecutionMode::FromSource`]: `source_path` must be an existing directory
    ///   - [`TsunagiExecutionMode::FromCollectedData`]: only `target_path` is checked
    ///   - [`TsunagiExecutionMode::Document`]: a document title is required
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use tsunagi::prelude::*;
    /// # use std::path::PathBuf;
    /// # fn main() -> tsunagi::error::Result<()> {
    /// let config = TsunagiConfig::builder()
    ///     .source_path(PathBuf::from("./source"))
    ///     .target_path(PathBuf::from("./output"))
    ///     .build()?;
    ///
    /// config.preflight_check(TsunagiExecutionMode::FromSource)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn preflight_check(&self, mode: TsunagiExecutionMode) -> Result<&Self> {
        if self.target_path.as_os_str().is_empty() {
            return Err(Error::Other("Target path is required".to_string()));
        }
        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::Other(
                "Output quality must be between 1 and 100.".to_string(),
            ));
        }

        match mode {
            TsunagiExecutionMode::FromSource => self.validate_source()?,
            TsunagiExecutionMode::FromCollectedData => {
                // Groups are passed to `stitch_from_collected_data` directly; nothing to check here.
            }
            TsunagiExecutionMode::Document => {
                if self.metadata.title.trim().is_empty() {
                    return Err(Error::Other("Document title is required".to_string()));
                }
            }
        }

        Ok(self)
    }

    /// Validates only the source-related parts of the configuration.
    fn validate_source(&self) -> Result<()> {
        if self.source_path.as_os_str().is_empty() {
            return Err(Error::Other(
                "`source_path` must be set for `FromSource` execution mode.".to_string(),
            ));
        }
        Self::validate_directory(&self.source_path, "Source")
    }

    fn validate_directory(path: &Path, role: &str) -> Result<()> {
        crate::path_utils::validate_path(path)?;

        if !path.exists() {
            return Err(Error::NotFound(format!(
                "{} path does not exist: {:?}",
                role, path
            )));
        }
        if !path.is_dir() {
            return Err(Error::InvalidPath(
                path.to_path_buf(),
                format!("{} path is not a directory.", role),
            ));
        }
        Ok(())
    }

    /// Scans `source_path` and groups its images without stitching anything.
    ///
    /// # Returns
    ///
    /// * `Ok(CollectedGroups)` - Groups ordered by key plus the scan report; may be empty
    /// * `Err(Error)` - The source directory is missing, not a directory, or unreadable
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use tsunagi::prelude::*;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> tsunagi::error::Result<()> {
    /// let config = TsunagiConfig::builder()
    ///     .source_path(PathBuf::from("./store_photos"))
    ///     .target_path(PathBuf::from("./joined"))
    ///     .build()?;
    ///
    /// let collected = config.collect_groups().await?;
    /// for group in &collected.groups {
    ///     println!("{}: {} images", group.key, group.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn collect_groups(&self) -> Result<CollectedGroups> {
        self.validate_source()?;

        let collector = Collector::new(
            &self.source_path,
            self.compiled_group_name_regex.as_ref(),
        );
        let collected = collector.collect_groups().await?;

        info!(
            "Collected {} group(s) from {} entries in {:?} ({} skipped)",
            collected.groups.len(),
            collected.report.scanned_entries,
            self.source_path,
            collected.report.findings.len()
        );
        Ok(collected)
    }

    // --- Core entry points ---

    /// Runs the full pipeline from the source directory.
    ///
    /// 1. **Collection**: groups the images of `source_path` by filename
    /// 2. **Stitching**: for each group in turn, decodes its images and joins them horizontally
    /// 3. **Writing**: saves `<key>.jpg` into `target_path`
    ///
    /// Only an invalid source location or configuration aborts the run. Decode and
    /// write problems are recorded per group in the returned [`BatchReport`]; a
    /// directory without conforming files yields a report where
    /// [`is_noop`](BatchReport::is_noop) is true.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use tsunagi::prelude::*;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> tsunagi::error::Result<()> {
    /// let config = TsunagiConfig::builder()
    ///     .source_path(PathBuf::from("./store_photos"))
    ///     .target_path(PathBuf::from("./joined"))
    ///     .build()?;
    ///
    /// let report = config.stitch_from_source().await?;
    /// println!("{} of {} groups stitched", report.succeeded(), report.groups.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn stitch_from_source(&self) -> Result<BatchReport> {
        self.preflight_check(TsunagiExecutionMode::FromSource)?;
        let collected = self.collect_groups().await?;

        let mut report = self.stitch_from_collected_data(collected.groups).await?;
        report.collection = Some(collected.report);
        Ok(report)
    }

    /// Stitches groups built by the caller.
    ///
    /// Members are used in the order given. Groups are processed one after the
    /// other; a failing group never affects the next. A group whose output path
    /// was already written earlier in the same run is reported as a write
    /// failure instead of replacing that file.
    pub async fn stitch_from_collected_data(&self, groups: Vec<Group>) -> Result<BatchReport> {
        self.preflight_check(TsunagiExecutionMode::FromCollectedData)?;

        if groups.is_empty() {
            info!("No groups to stitch; nothing was written");
            return Ok(BatchReport::default());
        }

        self.prepare_target_directory().await;

        let mut reports = Vec::with_capacity(groups.len());
        let mut claimed_outputs: HashMap<PathBuf, String> = HashMap::new();
        for group in groups {
            let key = group.key.clone();
            let output_path = composite_output_path(&self.target_path, &key);
            if let Some(owner) = claimed_outputs.get(&output_path) {
                error!(
                    "Group '{}': output {:?} was already written by group '{}'",
                    key, output_path, owner
                );
                reports.push(GroupReport {
                    status: GroupStatus::WriteFailed {
                        reason: format!(
                            "output path {:?} was already written by group '{}'",
                            output_path, owner
                        ),
                        output_path,
                    },
                    key,
                    decode_failures: Vec::new(),
                });
                continue;
            }
            claimed_outputs.insert(output_path.clone(), key.clone());
            let quality = self.output_quality;

            let report = match spawn_blocking(move || process_group(group, &output_path, quality))
                .await
            {
                Ok(report) => report,
                Err(e) => GroupReport {
                    key,
                    status: GroupStatus::CompositeFailed(format!("processing task failed: {}", e)),
                    decode_failures: Vec::new(),
                },
            };
            reports.push(report);
        }

        let report = BatchReport {
            groups: reports,
            collection: None,
        };
        if report.succeeded() > 0 {
            info!(
                "Stitched {} of {} group(s) into {:?}",
                report.succeeded(),
                report.groups.len(),
                self.target_path
            );
        } else {
            warn!(
                "None of the {} group(s) could be stitched",
                report.groups.len()
            );
        }
        Ok(report)
    }

    /// Compiles the images of `image_directory` into one titled EPUB.
    ///
    /// Images are taken in file-name order. The page for the `n`-th file is titled
    /// `"<n>. <file stem>"` and shows the image re-encoded as JPEG at
    /// `output_quality`. Files that cannot be decoded are skipped and listed in the
    /// report; their position number is not reused. The document is written to
    /// `<target_path>/<sanitized title>.epub`, unless no page could be added.
    /// A missing target directory is created only when `create_output_directory`
    /// is set; otherwise the call fails before anything is written.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use tsunagi::prelude::*;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> tsunagi::error::Result<()> {
    /// let config = TsunagiConfig::builder()
    ///     .target_path(PathBuf::from("./documents"))
    ///     .metadata(DocumentMetadata::default_with_title("Filter inspections".to_string()))
    ///     .build()?;
    ///
    /// let report = config.compile_document(Path::new("./joined")).await?;
    /// println!("{:?}", report.output_path);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compile_document(&self, image_directory: &Path) -> Result<DocumentReport> {
        self.preflight_check(TsunagiExecutionMode::Document)?;
        Self::validate_directory(image_directory, "Image")?;
        if !self.create_output_directory && !self.target_path.is_dir() {
            return Err(Error::NotFound(format!(
                "Target path does not exist and `create_output_directory` is off: {:?}",
                self.target_path
            )));
        }

        let images = Collector::collect_images_by_name(image_directory).await?;
        if images.is_empty() {
            info!("No images found in {:?}; no document written", image_directory);
            return Ok(DocumentReport::default());
        }

        let mut pages: Vec<DocumentPage> = Vec::with_capacity(images.len());
        let mut failures = Vec::new();
        for (position, path) in images.into_iter().enumerate() {
            let title = format!("{}. {}", position + 1, get_file_stem_lossy(&path));
            let quality = self.output_quality;
            let job_path = path.clone();

            let encoded = spawn_blocking(move || -> Result<Vec<u8>> {
                let image = load_source_image(&job_path)?;
                encode_jpeg(&image.pixels, quality)
            })
            .await?;

            match encoded {
                Ok(jpeg) => pages.push(DocumentPage { title, jpeg }),
                Err(e) => {
                    warn!("Skipping {:?} in document: {}", path, e);
                    failures.push(FileFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if pages.is_empty() {
            warn!("No image in {:?} could be decoded; no document written", image_directory);
            return Ok(DocumentReport {
                output_path: None,
                pages: Vec::new(),
                failures,
            });
        }

        self.prepare_target_directory().await;
        let mut generator = EPub::new(&self.target_path, &sanitize_filename(&self.metadata.title))?;
        generator.set_metadata(&self.metadata).await?;
        for page in &pages {
            generator.add_page(page).await?;
        }
        let output_path = generator.save().await?;
        info!("Wrote {} page(s) to {:?}", pages.len(), output_path);

        Ok(DocumentReport {
            output_path: Some(output_path),
            pages: pages.into_iter().map(|p| p.title).collect(),
            failures,
        })
    }

    /// Creates the target directory when allowed. Failures are logged only; the
    /// writes that follow report them.
    async fn prepare_target_directory(&self) {
        if self.target_path.is_dir() || !self.create_output_directory {
            return;
        }
        match fs::create_dir_all(&self.target_path).await {
            Ok(()) => debug!("Created output directory {:?}", self.target_path),
            Err(e) => error!(
                "Could not create output directory {:?}: {}",
                self.target_path, e
            ),
        }
    }
}

/// Decodes, stitches and writes one group to `output_path`. Never fails; every
/// problem ends up in the returned report.
fn process_group(group: Group, output_path: &Path, quality: u8) -> GroupReport {
    let Group { key, members } = group;
    let mut decode_failures = Vec::new();
    let mut images: Vec<SourceImage> = Vec::with_capacity(members.len());

    for member in members {
        match load_source_image(&member.path) {
            Ok(image) => images.push(image),
            Err(e) => {
                warn!("Group '{}': skipping {:?}: {}", key, member.path, e);
                decode_failures.push(FileFailure {
                    path: member.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    if images.is_empty() {
        error!("Group '{}': no usable images", key);
        return GroupReport {
            key,
            status: GroupStatus::NoUsableImages,
            decode_failures,
        };
    }

    let images_used = images.len();
    let composite = match stitch_horizontal(&images) {
        Ok(composite) => composite,
        Err(e) => {
            error!("Group '{}': stitching failed: {}", key, e);
            return GroupReport {
                key,
                status: GroupStatus::CompositeFailed(e.to_string()),
                decode_failures,
            };
        }
    };
    drop(images);

    let output_path = output_path.to_path_buf();
    let status = match write_composite(&composite, &output_path, quality) {
        Ok(()) => {
            info!(
                "Group '{}': {} image(s) -> {:?} ({}x{})",
                key,
                images_used,
                output_path,
                composite.width(),
                composite.height()
            );
            GroupStatus::Stitched {
                output_path,
                width: composite.width(),
                height: composite.height(),
                images_used,
            }
        }
        Err(e) => {
            error!("Group '{}': could not write {:?}: {}", key, output_path, e);
            GroupStatus::WriteFailed {
                output_path,
                reason: e.to_string(),
            }
        }
    };

    GroupReport {
        key,
        status,
        decode_failures,
    }
}

impl TsunagiConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(Some(s)) = &self.group_name_regex_str {
            let regex = Regex::new(s).map_err(|_| format!("Invalid group_name_regex: {}", s))?;
            validate_group_regex(&regex)?;
        }

        if let Some(quality) = self.output_quality {
            if !(1..=100).contains(&quality) {
                return Err("Output quality must be between 1 and 100.".to_string());
            }
        }

        Ok(())
    }

    fn compile_group_name_regex(&self) -> Option<Regex> {
        match &self.group_name_regex_str {
            Some(Some(s)) => Regex::new(s).ok(),
            _ => None,
        }
    }
}
