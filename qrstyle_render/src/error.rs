use thiserror::Error;

/// Failure while writing a drawing out.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Core(#[from] qrstyle_core::Error),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
