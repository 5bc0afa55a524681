//! Output writer for annotated images and their companions.
//!
//! All artifacts of one image share a base name derived from the source name. Existing files
//! are overwritten.
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use common::Analysis;
use image::{ImageOutputFormat, RgbImage};

use crate::error::Result;

pub const IMAGE_SUFFIX: &str = "_detections.png";
pub const JSON_SUFFIX: &str = "_detections.json";
pub const HTML_SUFFIX: &str = "_report.html";

/// Turn an arbitrary image name into a file name stem.
///
/// Keeps alphanumerics, spaces, `-` and `_`, trims trailing whitespace and replaces spaces with
/// underscores.
pub fn clean_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = kept.trim_end().replace(' ', "_");

    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned
    }
}

/// Encode an image as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageOutputFormat::Png)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    Ok(buf.into_inner())
}

pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact with `suffix` for the image called `name`.
    pub fn path_for(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", clean_filename(name), suffix))
    }

    /// Write the PNG encoded annotated image.
    pub fn write_image(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        self.write(self.path_for(name, IMAGE_SUFFIX), png)
    }

    /// Write the detections as pretty printed JSON.
    pub fn write_json(&self, name: &str, analysis: &Analysis) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(analysis).map_err(std::io::Error::from)?;
        self.write(self.path_for(name, JSON_SUFFIX), &json)
    }

    pub fn write_html(&self, name: &str, html: &str) -> Result<PathBuf> {
        self.write(self.path_for(name, HTML_SUFFIX), html.as_bytes())
    }

    fn write(&self, path: PathBuf, content: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, content)?;
        log::debug!("Wrote {} bytes to {}", content.len(), path.display());

        Ok(path)
    }
}
