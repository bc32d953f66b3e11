//! Request parameters for CMR search and EGI ordering.

use std::collections::BTreeMap;

use is2_common::product::format_version;
use is2_common::{BoundingBox, Is2Error, Is2Result, Product, TemporalRange};
use serde::{Deserialize, Serialize};

use crate::endpoints::Endpoints;

/// A flat set of query-string parameters.
pub type Params = BTreeMap<String, String>;

/// Granules per order request; also the CMR page size.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// Merge parameter sets left to right; later sets win on shared keys.
pub fn combine_params(sets: &[&Params]) -> Params {
    let mut combined = Params::new();
    for set in sets {
        combined.extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    combined
}

/// Optional reformatting and reprojection for an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetOptions {
    /// One of the capabilities document's formats (e.g. "NetCDF4-CF").
    pub format: Option<String>,
    /// One of the capabilities document's projections.
    pub projection: Option<String>,
}

/// A granule query: product, extents and paging.
#[derive(Debug, Clone)]
pub struct Query {
    product: Product,
    version: String,
    extent: BoundingBox,
    temporal: TemporalRange,
    page_size: usize,
    page_num: usize,
    email: Option<String>,
    subset: SubsetOptions,
}

impl Query {
    /// `version` is zero-padded ("6" becomes "006").
    pub fn new(
        product: Product,
        version: &str,
        extent: BoundingBox,
        temporal: TemporalRange,
    ) -> Is2Result<Self> {
        Ok(Self {
            product,
            version: format_version(version)?,
            extent,
            temporal,
            page_size: DEFAULT_PAGE_SIZE,
            page_num: 0,
            email: None,
            subset: SubsetOptions::default(),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Is2Result<Self> {
        if page_size == 0 {
            return Err(Is2Error::InvalidParameter {
                param: "page_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Order only this page of results (1-based); 0 orders every page.
    pub fn with_page_num(mut self, page_num: usize) -> Self {
        self.page_num = page_num;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_subset(mut self, subset: SubsetOptions) -> Self {
        self.subset = subset;
        self
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.extent
    }

    pub fn temporal(&self) -> &TemporalRange {
        &self.temporal
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_num(&self) -> usize {
        self.page_num
    }

    pub fn capabilities_url(&self, endpoints: &Endpoints) -> String {
        endpoints.capabilities_url(&self.product, &self.version)
    }

    /// CMR search parameters.
    pub fn cmr_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("short_name".to_string(), self.product.to_string());
        params.insert("version".to_string(), self.version.clone());
        params.insert("temporal".to_string(), self.temporal.to_cmr_string());
        params.insert("bounding_box".to_string(), self.extent.to_param_string());
        params
    }

    /// CMR parameters plus the page size, as sent to the granule search.
    pub fn search_params(&self) -> Params {
        let mut paging = Params::new();
        paging.insert("page_size".to_string(), self.page_size.to_string());
        combine_params(&[&self.cmr_params(), &paging])
    }

    /// Parameters every EGI order request carries.
    pub fn request_params(&self, endpoints: &Endpoints) -> Params {
        let mut params = Params::new();
        params.insert("page_size".to_string(), self.page_size.to_string());
        params.insert("page_num".to_string(), self.page_num.to_string());
        params.insert("request_mode".to_string(), "async".to_string());
        params.insert("include_meta".to_string(), "Y".to_string());
        params.insert("client_string".to_string(), endpoints.client_id.clone());
        if let Some(email) = &self.email {
            params.insert("email".to_string(), email.clone());
        }
        params
    }

    /// Subsetting parameters; `coverage` comes from the variable selector.
    pub fn subset_params(&self, coverage: Option<&str>) -> Params {
        let mut params = Params::new();
        params.insert("time".to_string(), self.temporal.to_subset_string());
        params.insert("bbox".to_string(), self.extent.to_param_string());
        if let Some(coverage) = coverage {
            params.insert("Coverage".to_string(), coverage.to_string());
        }
        if let Some(format) = &self.subset.format {
            params.insert("format".to_string(), format.clone());
        }
        if let Some(projection) = &self.subset.projection {
            params.insert("projection".to_string(), projection.clone());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Query {
        Query::new(
            Product::parse("ATL06").unwrap(),
            "6",
            BoundingBox::new(-55.0, 68.0, -48.0, 71.0).unwrap(),
            TemporalRange::from_dates("2019-02-22", "2019-02-28", None, None).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_cmr_params() {
        let params = query().cmr_params();
        assert_eq!(params["short_name"], "ATL06");
        assert_eq!(params["version"], "006");
        assert_eq!(params["bounding_box"], "-55,68,-48,71");
        assert_eq!(
            params["temporal"],
            "2019-02-22T00:00:00Z,2019-02-28T23:59:59Z"
        );
    }

    #[test]
    fn test_request_params() {
        let params = query()
            .with_email("me@example.org")
            .request_params(&Endpoints::default());
        assert_eq!(params["page_size"], "2000");
        assert_eq!(params["page_num"], "0");
        assert_eq!(params["request_mode"], "async");
        assert_eq!(params["include_meta"], "Y");
        assert_eq!(params["client_string"], "icepyx");
        assert_eq!(params["email"], "me@example.org");
    }

    #[test]
    fn test_subset_params() {
        let subset = SubsetOptions {
            format: Some("NetCDF4-CF".to_string()),
            projection: None,
        };
        let params = query()
            .with_subset(subset)
            .subset_params(Some("/gt1l/land_ice_segments/h_li"));
        assert_eq!(params["time"], "2019-02-22T00:00:00,2019-02-28T23:59:59");
        assert_eq!(params["bbox"], "-55,68,-48,71");
        assert_eq!(params["Coverage"], "/gt1l/land_ice_segments/h_li");
        assert_eq!(params["format"], "NetCDF4-CF");
        assert!(!params.contains_key("projection"));

        assert!(!query().subset_params(None).contains_key("Coverage"));
    }

    #[test]
    fn test_combine_params_later_wins() {
        let mut a = Params::new();
        a.insert("page_num".to_string(), "0".to_string());
        a.insert("short_name".to_string(), "ATL06".to_string());
        let mut b = Params::new();
        b.insert("page_num".to_string(), "3".to_string());

        let combined = combine_params(&[&a, &b]);
        assert_eq!(combined["page_num"], "3");
        assert_eq!(combined["short_name"], "ATL06");
        assert_eq!(combine_params(&[]).len(), 0);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(query().with_page_size(0).is_err());
        assert_eq!(query().with_page_size(10).unwrap().page_size(), 10);
    }
}
