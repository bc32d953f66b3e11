//! Error types for Earthdata operations.

use is2_common::Is2Error;
use is2_variables::VariablesError;
use thiserror::Error;

/// Result type for Earthdata operations.
pub type EarthdataResult<T> = Result<T, EarthdataError>;

/// Errors from searching, ordering, downloading and local discovery.
#[derive(Error, Debug)]
pub enum EarthdataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// CMR rejected the search and explained why.
    #[error("CMR query rejected: {}", .0.join("; "))]
    Query(Vec<String>),

    #[error("Your search returned no results; try different search parameters")]
    NoGranules,

    #[error("Search failure: CMR reported {expected} granules but {found} were returned")]
    SearchMismatch { expected: usize, found: usize },

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required element was absent from a service response.
    #[error("Missing element in response: {0}")]
    MissingElement(String),

    #[error("No order ids; confirm that an order was submitted and completed")]
    NoOrders,

    #[error("Invalid data source: {0}")]
    InvalidSource(String),

    #[error("Earthdata login failed: {0}")]
    Auth(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error(transparent)]
    Common(#[from] Is2Error),

    #[error(transparent)]
    Variables(#[from] VariablesError),
}

impl From<quick_xml::Error> for EarthdataError {
    fn from(e: quick_xml::Error) -> Self {
        EarthdataError::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for EarthdataError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        EarthdataError::Xml(e.to_string())
    }
}

impl From<walkdir::Error> for EarthdataError {
    fn from(e: walkdir::Error) -> Self {
        EarthdataError::Io(e.into())
    }
}

impl From<tokio::task::JoinError> for EarthdataError {
    fn from(e: tokio::task::JoinError) -> Self {
        EarthdataError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

impl EarthdataError {
    /// Whether the error was caused by the caller's input rather than the services.
    pub fn is_user_error(&self) -> bool {
        match self {
            EarthdataError::Query(_)
            | EarthdataError::NoGranules
            | EarthdataError::NoOrders
            | EarthdataError::InvalidSource(_)
            | EarthdataError::Auth(_)
            | EarthdataError::Credentials(_) => true,
            EarthdataError::Common(e) => e.is_user_error(),
            EarthdataError::Variables(VariablesError::InvalidFilter(_)) => true,
            _ => false,
        }
    }
}
