//! Path utilities for safe and robust file path handling.
//!
//! Group keys come straight from user filenames and end up as output filenames,
//! so they are turned into a single path component here. Document titles get
//! the stricter [`sanitize_filename`]. The module also offers lossy name
//! extraction for non-UTF-8 paths and an up-front validation of source
//! directories.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// Gets the file name from a path with fallback to lossy conversion.
///
/// # Arguments
///
/// * `path` - The path to extract the file name from
///
/// # Returns
///
/// * `String` - The file name, using lossy conversion if necessary
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the file name without its extension, with lossy conversion.
pub fn get_file_stem_lossy(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Checks a path for characters that make it unusable as a source or target.
///
/// A NUL byte is rejected everywhere. The reserved characters `<>"|?*` are only
/// rejected on Windows; they are legal in Unix path components.
///
/// # Returns
///
/// * `Result<()>` - Ok if the path is valid, or an error describing the issue
pub fn validate_path(path: &Path) -> Result<()> {
    let path_str = path_to_string_lossy(path);

    if path_str.chars().any(|c| c == '\0') {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains a NUL character".to_string(),
        ));
    }

    if cfg!(windows)
        && path_str
            .chars()
            .any(|c| matches!(c, '<' | '>' | '"' | '|' | '?' | '*'))
    {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Sanitizes a filename by replacing invalid characters with safe alternatives.
///
/// An input that sanitizes to nothing usable becomes `"_"`.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '|' | '?' | '*' => '-',
            ':' => '-',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match sanitized.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

/// Turns a group key into a single path component, changing as little as possible.
///
/// Only the path separators and NUL are replaced (by `_`); every other
/// character the key holds is kept. Two keys can therefore still map to the
/// same component (`a/b` and `a_b`), which callers must detect.
pub fn key_to_file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\0' => '_',
            '\\' if cfg!(windows) => '_',
            c => c,
        })
        .collect()
}

/// Output path for a group's composite: `<dir>/<key>.jpg`.
pub fn composite_output_path(output_dir: &Path, key: &str) -> PathBuf {
    output_dir.join(format!("{}.jpg", key_to_file_stem(key)))
}
