//! Clients for the NASA Earthdata services behind ICESat-2 data access.
//!
//! Provides:
//! - CMR granule and collection search
//! - EGI capabilities, order placement and status polling
//! - ESIR order download and extraction
//! - Discovery of granules already on disk

pub mod capabilities;
pub mod cmr;
pub mod download;
pub mod endpoints;
pub mod error;
pub mod granules;
pub mod local;
pub mod order;
pub mod params;
pub mod session;

pub use capabilities::{fetch_custom_options, parse_capabilities, CapabilitiesCatalog, CustomOptions};
pub use cmr::{latest_version, search_granules, Granule};
pub use download::{download_orders, DownloadOptions, DownloadReport};
pub use endpoints::Endpoints;
pub use error::{EarthdataError, EarthdataResult};
pub use granules::{GranuleIds, GranuleInfo};
pub use local::{pattern_to_regex, LocalSource, DEFAULT_FILENAME_PATTERN};
pub use order::{place_order, OrderOptions, OrderOutcome, OrderRestart, OrderStatus, PlacedOrders};
pub use params::{combine_params, Params, Query, SubsetOptions};
pub use session::{Credentials, EarthdataSession};
