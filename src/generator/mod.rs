//! Generator module provides the trait and implementation for document output.
//!
//! A document is a paginated file where every page carries a title line and one
//! image. The EPUB generator is the implementation shipped with the crate.

use crate::error::Result;
use crate::types::DocumentMetadata;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod epub;

/// One page ready for a generator: its title and the image already encoded as JPEG.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub title: String,
    pub jpeg: Vec<u8>,
}

/// Common interface for document generators.
///
/// Implementations handle the specifics of each file format. Pages appear in the
/// order they are added.
#[async_trait]
pub trait Generator {
    /// Creates a new generator instance.
    ///
    /// # Parameters
    /// * `output_dir` - Existing directory where the generated file will be saved
    /// * `base_filename` - Base name of the output file, without extension
    fn new(output_dir: &Path, base_filename: &str) -> Result<Self>
    where
        Self: Sized;

    /// Appends a titled page.
    async fn add_page(&mut self, page: &DocumentPage) -> Result<&mut Self>
    where
        Self: Sized;

    /// Sets document-level metadata: title, authors, language and optional
    /// description and release date.
    async fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<&mut Self>
    where
        Self: Sized;

    /// Finalizes the document and writes it to disk.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written file
    async fn save(self) -> Result<PathBuf>;
}
