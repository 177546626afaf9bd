/// Errors produced while laying out or styling a symbol.
///
/// Every input to the engine is fully resolved before a call starts, so none of these are
/// retryable: the caller gets either a complete result or one of these values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("unsupported version {0}, valid versions are 1..=40")]
    UnsupportedVersion(u8),
    #[error("cannot convert color '{0}' to RGBA components")]
    ColorConversionFailure(String),
    #[error("no integer magnification of {modules} modules satisfies the target size {target}")]
    NoFeasibleMagnification { modules: usize, target: f64 },
}

impl Error {
    /// Shorthand for [Error::InvalidGeometry].
    pub fn geometry<S: Into<String>>(message: S) -> Self {
        Self::InvalidGeometry(message.into())
    }
}
