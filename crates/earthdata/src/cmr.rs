//! CMR granule and collection search.

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use is2_common::product::format_version;
use is2_common::Product;

use crate::endpoints::Endpoints;
use crate::error::{EarthdataError, EarthdataResult};
use crate::params::Params;

const SEARCH_AFTER: &str = "cmr-search-after";
const HITS: &str = "cmr-hits";

/// A link attached to a granule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    pub href: String,
}

/// One granule entry from a CMR search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    /// The granule file name, e.g. `ATL06_20190222031203_08500210_006_02.h5`.
    pub producer_granule_id: String,
    /// Size in MB, as CMR reports it (a decimal string).
    #[serde(default)]
    pub granule_size: Option<String>,
    #[serde(default)]
    pub time_start: Option<String>,
    #[serde(default)]
    pub time_end: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Granule {
    pub fn size_mb(&self) -> Option<f64> {
        self.granule_size.as_deref()?.trim().parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct Feed<T> {
    #[serde(default = "Vec::new")]
    entry: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse<T> {
    feed: Feed<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Collection {
    version_id: String,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn check_hits(headers: &HeaderMap, found: usize) -> EarthdataResult<()> {
    if let Some(expected) = header_value(headers, HITS).and_then(|h| h.parse::<usize>().ok()) {
        if expected != found {
            return Err(EarthdataError::SearchMismatch { expected, found });
        }
    }
    Ok(())
}

/// Collect every granule matching `params`.
///
/// Pages are chained with the `CMR-Search-After` token until CMR returns
/// an empty page; the total is then checked against `CMR-Hits`.
#[instrument(skip(http, endpoints, params))]
pub async fn search_granules(
    http: &Client,
    endpoints: &Endpoints,
    params: &Params,
) -> EarthdataResult<Vec<Granule>> {
    let url = endpoints.granules_url();
    let mut granules: Vec<Granule> = Vec::new();
    let mut search_after: Option<String> = None;

    loop {
        let mut request = http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header("Client-Id", &endpoints.client_id)
            .query(params);
        if let Some(token) = &search_after {
            request = request.header("CMR-Search-After", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            // CMR explains rejected queries in an `errors` list.
            if let Ok(rejected) = serde_json::from_slice::<ErrorResponse>(&body) {
                return Err(EarthdataError::Query(rejected.errors));
            }
            return Err(EarthdataError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let page: FeedResponse<Granule> = serde_json::from_slice(&body)?;
        if page.feed.entry.is_empty() {
            check_hits(&headers, granules.len())?;
            break;
        }

        debug!(page = page.feed.entry.len(), total = granules.len(), "Received granule page");
        granules.extend(page.feed.entry);

        search_after = header_value(&headers, SEARCH_AFTER);
        if search_after.is_none() {
            check_hits(&headers, granules.len())?;
            break;
        }
    }

    if granules.is_empty() {
        return Err(EarthdataError::NoGranules);
    }

    info!(granules = granules.len(), "Granule search complete");
    Ok(granules)
}

/// The most recent version of a product's collection, zero-padded.
pub async fn latest_version(
    http: &Client,
    endpoints: &Endpoints,
    product: &Product,
) -> EarthdataResult<String> {
    let response = http
        .get(endpoints.collections_url())
        .header(ACCEPT, "application/json")
        .header("Client-Id", &endpoints.client_id)
        .query(&[("short_name", product.as_str())])
        .send()
        .await?;
    let response = crate::session::check_status(response)?;
    let body: FeedResponse<Collection> = response.json().await?;

    let latest = body
        .feed
        .entry
        .iter()
        .filter_map(|c| format_version(&c.version_id).ok())
        .max()
        .ok_or_else(|| {
            EarthdataError::MissingElement(format!("no collection versions for {}", product))
        })?;

    debug!(product = %product, version = %latest, "Latest collection version");
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granule_size() {
        let granule: Granule = serde_json::from_value(serde_json::json!({
            "producer_granule_id": "ATL06_20190222031203_08500210_006_02.h5",
            "granule_size": "12.5",
        }))
        .unwrap();
        assert_eq!(granule.size_mb(), Some(12.5));
        assert!(granule.links.is_empty());
    }

    #[test]
    fn test_empty_feed_deserializes() {
        let page: FeedResponse<Granule> =
            serde_json::from_str(r#"{"feed": {"updated": "now"}}"#).unwrap();
        assert!(page.feed.entry.is_empty());
    }

    #[test]
    fn test_check_hits() {
        let mut headers = HeaderMap::new();
        assert!(check_hits(&headers, 3).is_ok());
        headers.insert(HITS, "4".parse().unwrap());
        assert!(matches!(
            check_hits(&headers, 3),
            Err(EarthdataError::SearchMismatch { expected: 4, found: 3 })
        ));
        assert!(check_hits(&headers, 4).is_ok());
    }
}
