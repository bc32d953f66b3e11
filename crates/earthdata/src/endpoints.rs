//! Service base URLs.

use is2_common::Product;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CMR_BASE: &str = "https://cmr.earthdata.nasa.gov/search";
pub const DEFAULT_EGI_BASE: &str = "https://n5eil02u.ecs.nsidc.org/egi";
pub const DEFAULT_ESIR_BASE: &str = "https://n5eil02u.ecs.nsidc.org/esir";
pub const DEFAULT_CLIENT_ID: &str = "icepyx";

/// Where the search, ordering and download services live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// CMR search API (granules and collections).
    pub cmr_base: String,
    /// NSIDC EGI ordering API (capabilities, requests, status).
    pub egi_base: String,
    /// NSIDC ESIR download API (order archives).
    pub esir_base: String,
    /// Sent as `Client-Id` to CMR and as `client_string` to EGI.
    pub client_id: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cmr_base: DEFAULT_CMR_BASE.to_string(),
            egi_base: DEFAULT_EGI_BASE.to_string(),
            esir_base: DEFAULT_ESIR_BASE.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

fn trimmed(base: &str) -> &str {
    base.trim_end_matches('/')
}

impl Endpoints {
    pub fn granules_url(&self) -> String {
        format!("{}/granules", trimmed(&self.cmr_base))
    }

    pub fn collections_url(&self) -> String {
        format!("{}/collections.json", trimmed(&self.cmr_base))
    }

    /// `{egi}/capabilities/ATL06.006.xml`
    pub fn capabilities_url(&self, product: &Product, version: &str) -> String {
        format!(
            "{}/capabilities/{}.{}.xml",
            trimmed(&self.egi_base),
            product,
            version
        )
    }

    pub fn request_url(&self) -> String {
        format!("{}/request", trimmed(&self.egi_base))
    }

    pub fn status_url(&self, order_id: &str) -> String {
        format!("{}/request/{}", trimmed(&self.egi_base), order_id)
    }

    pub fn download_url(&self, order_id: &str) -> String {
        format!("{}/{}.zip", trimmed(&self.esir_base), order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let endpoints = Endpoints::default();
        let product = Product::parse("ATL06").unwrap();
        assert_eq!(
            endpoints.granules_url(),
            "https://cmr.earthdata.nasa.gov/search/granules"
        );
        assert_eq!(
            endpoints.capabilities_url(&product, "006"),
            "https://n5eil02u.ecs.nsidc.org/egi/capabilities/ATL06.006.xml"
        );
        assert_eq!(
            endpoints.status_url("5000001234567"),
            "https://n5eil02u.ecs.nsidc.org/egi/request/5000001234567"
        );
        assert_eq!(
            endpoints.download_url("5000001234567"),
            "https://n5eil02u.ecs.nsidc.org/esir/5000001234567.zip"
        );
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let endpoints = Endpoints {
            cmr_base: "http://localhost:8080/search/".to_string(),
            ..Endpoints::default()
        };
        assert_eq!(
            endpoints.collections_url(),
            "http://localhost:8080/search/collections.json"
        );
    }

    #[test]
    fn test_partial_override_deserializes() {
        let endpoints: Endpoints =
            serde_json::from_str(r#"{"esir_base": "http://localhost/esir"}"#).unwrap();
        assert_eq!(endpoints.esir_base, "http://localhost/esir");
        assert_eq!(endpoints.cmr_base, DEFAULT_CMR_BASE);
    }
}
