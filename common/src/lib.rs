//! Data model shared between the detection client, the renderer and the reports.
pub mod detection;
pub mod summary;

pub use detection::{
    AgeRange, Analysis, BoundingBox, Detection, DetectionKind, FaceAttributes, LabelAttributes,
    Prediction,
};
pub use summary::Summary;
