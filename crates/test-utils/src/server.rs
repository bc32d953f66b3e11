//! In-process fake of the NASA archive services.
//!
//! One axum server answers the CMR search, EGI ordering and ESIR download
//! routes so the client can be exercised end to end without network
//! access. Every request is recorded for later assertions.

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{fixtures, generators};

// ============================================================================
// Configuration
// ============================================================================

/// Behaviour of the fake archive.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub username: String,
    pub password: String,
    /// Granule entries served by the CMR search.
    pub granules: Vec<Value>,
    /// Reported `CMR-Hits` instead of the real count.
    pub hits_override: Option<usize>,
    /// Answer every granule search with a 400 carrying this message.
    pub search_error: Option<String>,
    /// Collection versions served by `collections.json`.
    pub versions: Vec<String>,
    pub capabilities_xml: String,
    /// Status polls answered with `processing` before the final status.
    pub processing_polls: usize,
    /// Orders (1-based submission number) that end `failed`.
    pub failed_orders: BTreeSet<usize>,
    /// Orders (1-based submission number) that end `complete_with_errors`.
    pub orders_with_errors: BTreeSet<usize>,
    /// Order ids whose archive download answers 404.
    pub missing_downloads: BTreeSet<String>,
    /// Order ids whose archive download is not a zip file.
    pub corrupt_downloads: BTreeSet<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            username: "icesat".to_string(),
            password: "secret".to_string(),
            granules: generators::atl06_entries(3),
            hits_override: None,
            search_error: None,
            versions: vec!["005".to_string(), "006".to_string()],
            capabilities_xml: fixtures::ATL06_CAPABILITIES.to_string(),
            processing_polls: 1,
            failed_orders: BTreeSet::new(),
            orders_with_errors: BTreeSet::new(),
            missing_downloads: BTreeSet::new(),
            corrupt_downloads: BTreeSet::new(),
        }
    }
}

/// Requests the fake archive has seen.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    /// Query parameters of each granule search request.
    pub searches: Vec<HashMap<String, String>>,
    /// `CMR-Search-After` header of each granule search request.
    pub search_after: Vec<Option<String>>,
    /// `Client-Id` header of each granule search request.
    pub client_ids: Vec<Option<String>>,
    /// Query parameters of each order submission.
    pub orders: Vec<HashMap<String, String>>,
    /// Status polls per order id.
    pub status_polls: HashMap<String, usize>,
    /// Order ids whose archive was requested.
    pub downloads: Vec<String>,
    /// Capabilities requests that carried valid credentials.
    pub authorized_capabilities: usize,
}

struct Shared {
    config: ArchiveConfig,
    recorded: Mutex<Recorded>,
}

impl Shared {
    fn record<F: FnOnce(&mut Recorded)>(&self, f: F) {
        if let Ok(mut recorded) = self.recorded.lock() {
            f(&mut recorded);
        }
    }
}

// ============================================================================
// Server handle
// ============================================================================

/// A running fake archive; stopped when dropped.
pub struct FakeArchive {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl FakeArchive {
    /// Start a server on an ephemeral local port.
    pub async fn start(config: ArchiveConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            recorded: Mutex::new(Recorded::default()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake archive");
        let addr = listener.local_addr().expect("Fake archive has no address");
        let app = create_router(shared.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            shared,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn cmr_base(&self) -> String {
        format!("{}/search", self.base_url())
    }

    pub fn egi_base(&self) -> String {
        format!("{}/egi", self.base_url())
    }

    pub fn esir_base(&self) -> String {
        format!("{}/esir", self.base_url())
    }

    /// Capabilities URL for a product and zero-padded version.
    pub fn capabilities_url(&self, product: &str, version: &str) -> String {
        format!("{}/capabilities/{}.{}.xml", self.egi_base(), product, version)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.shared.config
    }

    /// Snapshot of the recorded requests.
    pub fn recorded(&self) -> Recorded {
        self.shared
            .recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// The id assigned to the `n`-th (1-based) order submission.
    pub fn order_id(n: usize) -> String {
        format!("50000{:08}", n)
    }

    /// Base name of the granule file inside an order's archive.
    pub fn archive_member(order_id: &str) -> String {
        format!("processed_ATL06_{}.h5", order_id)
    }
}

impl Drop for FakeArchive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// Router
// ============================================================================

fn create_router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/search/granules", get(granules_handler))
        .route("/search/collections.json", get(collections_handler))
        .route("/egi/capabilities/:file", get(capabilities_handler))
        .route("/egi/request", get(order_handler))
        .route("/egi/request/:id", get(status_handler))
        .route("/esir/:file", get(download_handler))
        .layer(Extension(shared))
}

// ============================================================================
// Handlers
// ============================================================================

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// GET /search/granules - paged with the search-after token (an offset here)
async fn granules_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let after = header_string(&headers, "cmr-search-after");
    let client_id = header_string(&headers, "client-id");
    shared.record(|r| {
        r.searches.push(params.clone());
        r.search_after.push(after.clone());
        r.client_ids.push(client_id);
    });

    if let Some(message) = &shared.config.search_error {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/json")],
            fixtures::cmr_error(message),
        )
            .into_response();
    }

    let page_size: usize = params
        .get("page_size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(2000);
    let offset: usize = after.and_then(|s| s.parse().ok()).unwrap_or(0);

    let granules = &shared.config.granules;
    let start = offset.min(granules.len());
    let end = (offset + page_size).min(granules.len());
    let page = &granules[start..end];

    let mut response_headers = HeaderMap::new();
    let hits = shared.config.hits_override.unwrap_or(granules.len());
    response_headers.insert("cmr-hits", HeaderValue::from(hits));
    if !page.is_empty() {
        response_headers.insert("cmr-search-after", HeaderValue::from(end));
    }

    (response_headers, Json(generators::cmr_page(page))).into_response()
}

/// GET /search/collections.json
async fn collections_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let short_name = params.get("short_name").cloned().unwrap_or_default();
    let versions: Vec<&str> = shared.config.versions.iter().map(String::as_str).collect();
    Json(generators::collections_body(&short_name, &versions)).into_response()
}

/// GET /egi/capabilities/{product}.{version}.xml - requires basic auth
async fn capabilities_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Path(_file): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(auth) = header_string(&headers, "authorization") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let expected = basic_auth(&shared.config.username, &shared.config.password);
    if auth != expected {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    shared.record(|r| r.authorized_capabilities += 1);
    xml(shared.config.capabilities_xml.clone())
}

/// GET /egi/request - submit one order page
async fn order_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut number = 0;
    shared.record(|r| {
        r.orders.push(params);
        number = r.orders.len();
    });
    xml(fixtures::order_response(&FakeArchive::order_id(number)))
}

/// GET /egi/request/{id} - order status
async fn status_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Path(id): Path<String>,
) -> Response {
    let mut polls = 0;
    shared.record(|r| {
        let count = r.status_polls.entry(id.clone()).or_insert(0);
        *count += 1;
        polls = *count;
    });

    let config = &shared.config;
    let number = (1..)
        .take(10_000)
        .find(|n| FakeArchive::order_id(*n) == id);
    let Some(number) = number else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if polls <= config.processing_polls {
        return xml(fixtures::status_response("processing", &[]));
    }

    if config.failed_orders.contains(&number) {
        xml(fixtures::status_response("failed", &["subsetting failed"]))
    } else if config.orders_with_errors.contains(&number) {
        xml(fixtures::status_response(
            "complete_with_errors",
            &["1 granule could not be subset"],
        ))
    } else {
        xml(fixtures::status_response("complete", &["order processed"]))
    }
}

/// GET /esir/{id}.zip
async fn download_handler(
    Extension(shared): Extension<Arc<Shared>>,
    Path(file): Path<String>,
) -> Response {
    let id = file.trim_end_matches(".zip").to_string();
    shared.record(|r| r.downloads.push(id.clone()));

    if shared.config.missing_downloads.contains(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    if shared.config.corrupt_downloads.contains(&id) {
        return ([(header::CONTENT_TYPE, "application/zip")], "not a zip").into_response();
    }

    let member = format!("{}/{}", id, FakeArchive::archive_member(&id));
    let bytes = generators::zip_archive(&[(member.as_str(), id.as_bytes())]);
    ([(header::CONTENT_TYPE, "application/zip")], bytes).into_response()
}

/// `Authorization` header value for HTTP basic auth.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username, password))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_encoding() {
        // RFC 7617 example
        assert_eq!(
            basic_auth("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn test_order_ids_are_distinct() {
        assert_ne!(FakeArchive::order_id(1), FakeArchive::order_id(2));
        assert_eq!(FakeArchive::order_id(1).len(), 13);
    }

    #[tokio::test]
    async fn test_search_pages() {
        let archive = FakeArchive::start(ArchiveConfig::default()).await;
        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/granules", archive.cmr_base()))
            .query(&[("page_size", "2")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()["cmr-hits"], "3");
        assert_eq!(response.headers()["cmr-search-after"], "2");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["feed"]["entry"].as_array().unwrap().len(), 2);
    }
}
