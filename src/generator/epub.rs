use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generator::{DocumentPage, Generator};
use crate::path_utils::path_to_string_lossy;
use crate::types::DocumentMetadata;
use async_trait::async_trait;
use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ZipLibrary};

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Generates the XHTML for one page: a centered title followed by the image.
///
/// # Arguments
///
/// * `image_source` - Path to the image relative to the EPUB content root
/// * `page_title` - Title shown above the image (escaped here)
fn generate_xhtml(image_source: &str, page_title: &str) -> String {
    const TEMPLATE: &str = include_str!("../../templates/Page.xhtml");
    TEMPLATE
        .replace("%title%", &escape_xml(page_title))
        .replace("%src%", image_source)
}

/// A generator for creating EPUB files with one titled image per page.
///
/// This struct wraps the `EpubBuilder` functionality and implements the `Generator` trait.
pub struct EPub {
    epub: EpubBuilder<ZipLibrary>,
    output_path: PathBuf,
    filename_base: String,
    page_index: usize, // 0-based index for pages added
}

#[async_trait]
impl Generator for EPub {
    fn new(output_dir: &Path, filename_base: &str) -> Result<Self> {
        let mut epub = EpubBuilder::new(ZipLibrary::new()?)?;

        epub.epub_version(EpubVersion::V30);

        epub.stylesheet(include_bytes!("../../templates/Page.css").as_slice())?;

        Ok(EPub {
            epub,
            output_path: output_dir.to_path_buf(),
            filename_base: filename_base.to_string(),
            page_index: 0,
        })
    }

    async fn add_page(&mut self, page: &DocumentPage) -> Result<&mut Self> {
        let page_number = self.page_index + 1;

        let image_name = format!("images/page_{:03}.jpg", page_number);
        self.epub
            .add_resource(&image_name, Cursor::new(page.jpeg.as_slice()), "image/jpeg")?;

        let xhtml_content = generate_xhtml(&image_name, &page.title);
        let content_path = format!("page_{:03}.xhtml", page_number);
        self.epub.add_content(
            EpubContent::new(content_path, xhtml_content.as_bytes()).title(&page.title),
        )?;

        self.page_index += 1;
        Ok(self)
    }

    async fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<&mut Self> {
        self.epub.metadata("title", &metadata.title)?;

        for author in &metadata.authors {
            self.epub.metadata("author", author)?;
        }
        self.epub.set_lang(&metadata.language);

        if let Some(description) = &metadata.description {
            self.epub.metadata("description", description)?;
        }
        if let Some(release_date) = metadata.release_date {
            self.epub.set_publication_date(release_date);
        }
        self.epub.metadata("generator", "tsunagi")?;

        Ok(self)
    }

    async fn save(mut self) -> Result<PathBuf> {
        let output_file_path = self
            .output_path
            .join(format!("{}.epub", self.filename_base));

        let file = File::create(&output_file_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create EPUB file '{}': {}",
                    path_to_string_lossy(&output_file_path),
                    e
                ),
            ))
        })?;

        self.epub.generate(file)?;
        Ok(output_file_path)
    }
}
