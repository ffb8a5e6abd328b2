use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("invalid XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    #[error("file contains no valid GPX data")]
    NoGpxData,
}
