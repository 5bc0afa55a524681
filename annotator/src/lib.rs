//! Annotate images with faces and labels found by a cloud vision service.
//!
//! The pipeline loads an image from a URL, a file or an S3 bucket, sends it to the detection
//! service, draws the results onto a copy and writes the annotated image with its reports.
pub mod config;
pub mod detect;
pub mod error;
pub mod font;
pub mod menu;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod source;

pub use error::{AnnotateError, Result};
