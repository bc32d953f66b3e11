//! Tests for query extents and product validation.

use is2_common::bbox::BoundingBox;
use is2_common::error::Is2Error;
use is2_common::product::Product;
use is2_common::time::TemporalRange;

// ============================================================================
// Bounding box validation
// ============================================================================

#[test]
fn test_bbox_from_slice() {
    let bbox = BoundingBox::from_slice(&[-55.0, 68.0, -48.0, 71.0]).unwrap();
    assert_eq!(bbox.width(), 7.0);
    assert_eq!(bbox.height(), 3.0);
}

#[test]
fn test_bbox_wrong_length() {
    let result = BoundingBox::from_slice(&[-55.0, 68.0, -48.0]);
    assert!(matches!(result, Err(Is2Error::InvalidBbox(_))));
}

#[test]
fn test_bbox_longitude_out_of_range() {
    let result = BoundingBox::new(-190.0, 68.0, -48.0, 71.0);
    assert!(matches!(result, Err(Is2Error::InvalidBbox(_))));
}

#[test]
fn test_bbox_latitude_out_of_range() {
    let result = BoundingBox::new(-55.0, 68.0, -48.0, 91.0);
    assert!(matches!(result, Err(Is2Error::InvalidBbox(_))));
}

#[test]
fn test_bbox_latitudes_reversed() {
    let result = BoundingBox::new(-55.0, 71.0, -48.0, 68.0);
    assert!(matches!(result, Err(Is2Error::InvalidBbox(_))));
}

#[test]
fn test_bbox_parse_garbage() {
    assert!(BoundingBox::parse("a,b,c,d").is_err());
    assert!(BoundingBox::parse("").is_err());
}

// ============================================================================
// Temporal ranges
// ============================================================================

#[test]
fn test_temporal_invalid_date() {
    let result = TemporalRange::from_dates("2019-02-30", "2019-03-01", None, None);
    assert!(matches!(result, Err(Is2Error::InvalidTemporal(_))));
}

#[test]
fn test_temporal_invalid_time() {
    let result = TemporalRange::from_dates("2019-02-22", "2019-02-28", Some("25:00:00"), None);
    assert!(matches!(result, Err(Is2Error::InvalidTemporal(_))));
}

// ============================================================================
// Products
// ============================================================================

#[test]
fn test_product_deserialize() {
    let product: Product = serde_json::from_str("\"atl03\"").unwrap();
    assert_eq!(product.as_str(), "ATL03");

    let invalid: Result<Product, _> = serde_json::from_str("\"MOD09\"");
    assert!(invalid.is_err());
}

#[test]
fn test_product_from_str() {
    let product: Product = "ATL09".parse().unwrap();
    assert_eq!(product.to_string(), "ATL09");
    assert!(!product.is_gridded());
    assert!("ATL20".parse::<Product>().unwrap().is_gridded());
}
