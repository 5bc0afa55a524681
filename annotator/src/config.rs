//! Runtime configuration of the annotation pipeline.
//!
use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_OUTPUT_DIR: &str = "rekognition_output";
pub const DEFAULT_MAX_LABELS: i32 = 10;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 70.0;

/// How the HTML report references the annotated image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageEmbedding {
    /// Base64 data URI inside the document.
    Inline,
    /// Relative path to the PNG next to the report.
    Linked,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Region of the detection and storage services.
    pub region: String,
    pub output_dir: PathBuf,
    /// Write an HTML report next to each annotated image.
    pub html_report: Option<ImageEmbedding>,
    /// TrueType font used for annotations. Falls back to fonts found on the system.
    pub font: Option<PathBuf>,
    pub max_labels: i32,
    pub min_confidence: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_owned(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            html_report: None,
            font: None,
            max_labels: DEFAULT_MAX_LABELS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}
