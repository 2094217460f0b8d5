//! Image loading and normalization.
//!
//! Every image entering the compositor goes through [`load_source_image`], which
//! guarantees a single-frame 8-bit RGB bitmap regardless of the file's format.

use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::error::{Error, Result};
use crate::types::SourceImage;

/// Decodes one file into a [`SourceImage`].
///
/// The format is sniffed from the file contents, falling back to the extension.
/// Animated GIFs contribute their first frame only. Alpha channels and palettes
/// are dropped by an unconditional conversion to RGB8.
///
/// # Errors
///
/// Any open or decode problem is returned as [`Error::Decode`] carrying the path,
/// so callers can record it against the file and move on.
pub fn load_source_image(path: &Path) -> Result<SourceImage> {
    let pixels = decode_rgb(path).map_err(|e| match e {
        Error::Decode(..) => e,
        other => Error::Decode(path.to_path_buf(), other.to_string()),
    })?;
    Ok(SourceImage::new(path, pixels))
}

fn decode_rgb(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;

    let decoded = match reader.format() {
        Some(ImageFormat::Gif) => first_gif_frame(path, reader.into_inner())?,
        Some(_) => reader.decode()?,
        None => {
            return Err(Error::Decode(
                path.to_path_buf(),
                "unrecognized image format".to_string(),
            ));
        }
    };

    Ok(decoded.into_rgb8())
}

/// Decodes only the first frame of a (possibly animated) GIF.
fn first_gif_frame<R>(path: &Path, reader: R) -> Result<DynamicImage>
where
    R: std::io::BufRead + std::io::Seek,
{
    let decoder = GifDecoder::new(reader)?;
    let frame = decoder
        .into_frames()
        .next()
        .ok_or_else(|| Error::Decode(path.to_path_buf(), "GIF contains no frames".to_string()))??;

    Ok(DynamicImage::ImageRgba8(frame.into_buffer()))
}
