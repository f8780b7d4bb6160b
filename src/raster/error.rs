use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    #[error("{0} carries no ModelTiepoint/ModelPixelScale georeferencing")]
    MissingGeoreferencing(String),

    #[error("Invalid georeferencing tags: {0}")]
    InvalidGeoreferencing(String),

    #[error(transparent)]
    Crs(#[from] crate::crs::CrsError),

    #[error("Unsupported color type: {0}")]
    UnsupportedColorType(String),

    #[error("Pixel data is truncated: expected {expected} samples, got {actual}")]
    TruncatedData { expected: usize, actual: usize },
}
