use thiserror::Error;

/// Failure while processing a single image.
///
/// Every variant aborts the current image only; batch runs report it and continue with the next
/// one.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Bad path, URL or bucket key, or bytes that are not a supported image.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The remote detection or storage service failed.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// Detection data that cannot be drawn.
    #[error("failed to render detections: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
