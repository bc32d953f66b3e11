//! Variable path selection for ICESat-2 products.
//!
//! ICESat-2 granules are deeply nested HDF5 files. Every variable is
//! addressed by a slash-delimited path such as
//! `gt1l/land_ice_segments/h_li`: the final segment is the variable name,
//! the preceding segments are keywords, and some keywords name a beam
//! (`gt1l` ... `gt3r`) or an atmospheric profile (`profile_1` ...).
//!
//! [`Variables`] holds the immutable catalog of available paths for one
//! product together with a mutable "wanted" subset that is grown and
//! shrunk with [`Filter`]s. The wanted paths are what gets requested from
//! the ordering service (see [`Variables::coverage`]) or read from a
//! local file.

pub mod error;
pub mod filter;
pub mod path;
pub mod selector;
pub mod source;

pub use error::{Result, VariablesError};
pub use filter::{Filter, FilterBuilder};
pub use path::{is_beam, keywords, parse, parse_tiered, split_path, variable_name};
pub use selector::{AvailOptions, MandatoryPolicy, Variables};
pub use source::{parse_h5ls_listing, CatalogSource, H5lsCatalog, StaticCatalog};
