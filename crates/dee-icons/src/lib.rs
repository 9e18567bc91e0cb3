use std::{
    fs::{self, File},
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;

/// Sizes the editor renders icon previews at.
pub const PREVIEW_SIZES: &[u32] = &[16, 24, 32, 48, 64, 128];

#[derive(Debug, Error)]
pub enum IconError {
    #[error("icon {0:?} not found in the icon theme")]
    NotFound(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// What an `Icon=` value refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Absolute path to an existing, readable file.
    File(PathBuf),
    /// Name to resolve through the icon theme.
    Named(String),
    Empty,
}

/// Icon theme lookup supplied by the caller's environment.
pub trait IconTheme {
    fn lookup(&self, name: &str, size: u32) -> Option<PathBuf>;
}

/// A theme that knows no icons, for callers without theme support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTheme;

impl IconTheme for NoTheme {
    fn lookup(&self, _name: &str, _size: u32) -> Option<PathBuf> {
        None
    }
}

pub fn classify(value: &str) -> IconSource {
    let value = value.trim();
    if value.is_empty() {
        return IconSource::Empty;
    }
    let path = Path::new(value);
    if path.is_absolute() && is_readable_file(path) {
        IconSource::File(path.to_path_buf())
    } else {
        IconSource::Named(value.to_string())
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

/// Loads `value` as an image at `size`x`size`, asking `theme` for symbolic names.
pub fn resolve(value: &str, size: u32, theme: &dyn IconTheme) -> Result<DynamicImage> {
    match classify(value) {
        IconSource::File(path) => load_icon(&path, size),
        IconSource::Named(name) => {
            let path = theme
                .lookup(&name, size)
                .ok_or_else(|| IconError::NotFound(name.clone()))?;
            load_icon(&path, size)
        }
        IconSource::Empty => Err(IconError::NotFound(String::new()).into()),
    }
}

pub fn load_icon(path: &Path, size: u32) -> Result<DynamicImage> {
    let data = fs::read(path).with_context(|| format!("read icon {path:?}"))?;
    let img = decode_icon(&data).with_context(|| format!("decode icon {path:?}"))?;
    Ok(img.resize_exact(size, size, FilterType::Lanczos3))
}

fn decode_icon(data: &[u8]) -> Result<DynamicImage> {
    if let Ok(dir) = ico::IconDir::read(Cursor::new(data)) {
        if let Some(entry) = dir.entries().iter().max_by_key(|e| e.width()) {
            let decoded = entry
                .decode()
                .map_err(|err| IconError::Decode(err.to_string()))?;
            let width = decoded.width();
            let height = decoded.height();
            let rgba_data = decoded.rgba_data().to_vec();
            let rgba_image = image::RgbaImage::from_raw(width, height, rgba_data)
                .context("create rgba image from ico")?;
            return Ok(DynamicImage::ImageRgba8(rgba_image));
        }
    }
    let reader = image::ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    reader
        .decode()
        .map_err(|err| IconError::Decode(err.to_string()).into())
}
