//! Error types shared by the ICESat-2 access crates.

use thiserror::Error;

/// Result type alias using Is2Error.
pub type Is2Result<T> = Result<T, Is2Error>;

/// Errors raised while validating user-supplied query inputs.
#[derive(Debug, Error)]
pub enum Is2Error {
    // === Product Errors ===
    #[error("Invalid product: {0}. Please select an ICESat-2 data product (e.g. ATL06)")]
    InvalidProduct(String),

    #[error("Invalid product version: {0}")]
    InvalidVersion(String),

    #[error("Invalid ground track: {0}")]
    InvalidGroundTrack(String),

    // === Extent Errors ===
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Invalid temporal range: {0}")]
    InvalidTemporal(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl Is2Error {
    /// Whether the error was caused by user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Is2Error::InternalError(_))
    }
}

impl From<serde_json::Error> for Is2Error {
    fn from(err: serde_json::Error) -> Self {
        Is2Error::InternalError(format!("JSON error: {}", err))
    }
}
