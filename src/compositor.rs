//! Horizontal compositing of a group's images onto one canvas.
//!
//! Geometry: the canvas is as wide as all inputs together and as tall as the
//! tallest input. Inputs are pasted left to right, top aligned, with no gaps and
//! no overlap. Whatever an input does not cover stays white.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, imageops};

use crate::error::{Error, Result};
use crate::path_utils::path_to_string_lossy;
use crate::types::SourceImage;

/// Fill color for canvas regions no input covers.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Default JPEG quality for written composites.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Computes `(width, height)` of the canvas for the given input sizes.
///
/// Returns `None` for an empty input or when the summed width overflows `u32`.
pub fn canvas_dimensions(sizes: &[(u32, u32)]) -> Option<(u32, u32)> {
    if sizes.is_empty() {
        return None;
    }
    let width = sizes
        .iter()
        .try_fold(0u32, |acc, (w, _)| acc.checked_add(*w))?;
    let height = sizes.iter().map(|(_, h)| *h).max()?;
    Some((width, height))
}

/// Left edge of every input: the running sum of the widths before it.
pub fn horizontal_offsets(widths: &[u32]) -> Vec<u32> {
    widths
        .iter()
        .scan(0u32, |x, w| {
            let offset = *x;
            *x = x.saturating_add(*w);
            Some(offset)
        })
        .collect()
}

/// Stitches the images, in order, into one composite.
///
/// # Errors
///
/// * [`Error::EmptyGroup`] when `images` is empty
/// * [`Error::Unsupported`] when the combined width does not fit in a `u32`
///
/// # Examples
///
/// ```
/// use image::{Rgb, RgbImage};
/// use tsunagi::compositor::stitch_horizontal;
/// use tsunagi::types::SourceImage;
///
/// let left = SourceImage::new("a_1.png", RgbImage::from_pixel(10, 20, Rgb([0, 0, 0])));
/// let right = SourceImage::new("a_2.png", RgbImage::from_pixel(30, 5, Rgb([0, 0, 0])));
/// let canvas = stitch_horizontal(&[left, right]).unwrap();
/// assert_eq!(canvas.dimensions(), (40, 20));
/// ```
pub fn stitch_horizontal(images: &[SourceImage]) -> Result<RgbImage> {
    if images.is_empty() {
        return Err(Error::EmptyGroup);
    }

    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width(), i.height())).collect();
    let (width, height) = canvas_dimensions(&sizes).ok_or_else(|| {
        Error::Unsupported(format!(
            "combined width of {} images exceeds the maximum canvas width",
            images.len()
        ))
    })?;

    let widths: Vec<u32> = sizes.iter().map(|(w, _)| *w).collect();
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    for (image, x) in images.iter().zip(horizontal_offsets(&widths)) {
        imageops::replace(&mut canvas, &image.pixels, x as i64, 0);
    }

    Ok(canvas)
}

/// Encodes `image` as JPEG at `quality` (clamped to 1-100) into `path`,
/// replacing any existing file.
pub fn write_composite(image: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create output file '{}': {}",
                path_to_string_lossy(path),
                e
            ),
        ))
    })?;
    let writer = BufWriter::new(file);

    JpegEncoder::new_with_quality(writer, quality.clamp(1, 100)).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(())
}

/// Encodes `image` as JPEG into memory.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}
