//! Common types and utilities shared across the ICESat-2 access crates.

pub mod bbox;
pub mod error;
pub mod product;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{Is2Error, Is2Result};
pub use product::{CatalogMode, Product, ScOrient};
pub use time::TemporalRange;
