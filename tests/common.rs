//! Common test utilities and constants for the Tsunagi crate.
//!
//! Provides functions for setting up test directories, writing synthetic
//! images in the supported formats, and inspecting generated documents.

use image::codecs::gif::GifEncoder;
use image::{Frame, Rgb, RgbImage, Rgba, RgbaImage};
use rand::{Rng, distributions::Alphanumeric};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tsunagi::error::{Error, Result};

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(60);

#[allow(dead_code)]
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
#[allow(dead_code)]
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Scratch directories for one test.
#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
}

/// Creates a fresh, uniquely named test directory with a `source` subdirectory.
/// The `target` directory is only named, not created, so tests can check that
/// the library creates it.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let unique_sub_path = format!("{}-{}", sub_path, rand_string);
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(unique_sub_path);
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let source_dir = base_dir.join("source");
    let target_dir = base_dir.join("target");

    fs::create_dir_all(&source_dir).await.unwrap();

    TestDirs {
        base_dir,
        source_dir,
        target_dir,
    }
}

/// Writes a solid-color image; the format follows the file extension.
#[allow(dead_code)]
pub async fn create_image(path: &Path, width: u32, height: u32, color: Rgb<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let img = RgbImage::from_pixel(width, height, color);
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || img.save(path_clone))
        .await
        .map_err(|e| Error::Other(e.to_string()))?
        .map_err(Error::Image)?;
    Ok(())
}

/// Writes an animated GIF whose frames have the given colors, all `width`x`height`.
#[allow(dead_code)]
pub async fn create_animated_gif(
    path: &Path,
    width: u32,
    height: u32,
    colors: &[Rgb<u8>],
) -> Result<()> {
    let frames: Vec<Frame> = colors
        .iter()
        .map(|c| Frame::new(RgbaImage::from_pixel(width, height, Rgba([c[0], c[1], c[2], 255]))))
        .collect();
    let path_clone = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::create(path_clone)?;
        let mut encoder = GifEncoder::new(file);
        encoder.encode_frames(frames)?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Other(e.to_string()))??;
    Ok(())
}

/// Writes bytes that no decoder accepts, under an image extension.
#[allow(dead_code)]
pub async fn create_corrupt_image(path: &Path) -> Result<()> {
    fs::write(path, b"this is not image data").await?;
    Ok(())
}

/// Lists the file names in `dir`, sorted. Missing directory yields an empty list.
#[allow(dead_code)]
pub async fn list_file_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(mut entries) = fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    names
}

/// Checks that a ZIP-based file (EPUB) exists and contains at least one entry.
#[allow(dead_code)]
pub fn assert_valid_zip_file(path: &Path) {
    assert!(path.exists(), "Output file does not exist: {:?}", path);
    assert!(path.is_file(), "Output path is not a file: {:?}", path);

    let file = std::fs::File::open(path).unwrap();
    let zip = zip::ZipArchive::new(file).unwrap();
    assert!(zip.len() > 0, "Output archive is empty: {:?}", path);
}

/// Reads one entry of a ZIP-based file as text.
#[allow(dead_code)]
pub fn read_zip_entry(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

/// Names of every entry in a ZIP-based file.
#[allow(dead_code)]
pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive.file_names().map(|n| n.to_string()).collect()
}
