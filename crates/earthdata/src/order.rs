//! Order placement with the EGI ordering service.
//!
//! Granules are ordered in pages of `page_size`. Each page becomes one
//! asynchronous order that is polled until it completes. Ids of the
//! successful orders are saved to a restart file after every page so an
//! interrupted session can go straight to downloading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::cmr::search_granules;
use crate::error::{EarthdataError, EarthdataResult};
use crate::params::{combine_params, Params, Query};
use crate::session::{check_status, EarthdataSession};

/// Name of the file holding the ids of completed orders.
pub const ORDER_RESTART_FILE: &str = ".order_restart";

/// Status of an EGI order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Complete,
    CompleteWithErrors,
    Failed,
    Other(String),
}

impl OrderStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "pending" => OrderStatus::Pending,
            "processing" => OrderStatus::Processing,
            "complete" => OrderStatus::Complete,
            "complete_with_errors" => OrderStatus::CompleteWithErrors,
            "failed" => OrderStatus::Failed,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    /// Still being worked on; keep polling.
    pub fn is_running(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Has data to download.
    pub fn is_success(&self) -> bool {
        matches!(self, OrderStatus::Complete | OrderStatus::CompleteWithErrors)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Complete => write!(f, "complete"),
            OrderStatus::CompleteWithErrors => write!(f, "complete_with_errors"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// How orders are placed.
#[derive(Debug, Clone)]
pub struct OrderOptions {
    /// Send subsetting parameters; otherwise request whole granules (`agent=NO`).
    pub subset: bool,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Directory holding the restart file.
    pub state_dir: PathBuf,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            subset: true,
            poll_interval: Duration::from_secs(10),
            state_dir: PathBuf::from("."),
        }
    }
}

/// Final state of one submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub page_num: usize,
    pub order_id: String,
    pub status: OrderStatus,
    /// Messages from the service's `processInfo`.
    pub messages: Vec<String>,
}

/// Result of [`place_order`].
#[derive(Debug, Clone, Default)]
pub struct PlacedOrders {
    pub granules: usize,
    pub outcomes: Vec<OrderOutcome>,
    /// Orders with data to download, in submission order.
    pub order_ids: Vec<String>,
}

/// Contents of the restart file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRestart {
    #[serde(rename = "orderIDs")]
    pub order_ids: Vec<String>,
}

impl OrderRestart {
    pub fn path(state_dir: &Path) -> PathBuf {
        state_dir.join(ORDER_RESTART_FILE)
    }

    /// Read the restart file, if there is one.
    pub async fn load(state_dir: &Path) -> EarthdataResult<Option<Self>> {
        let path = Self::path(state_dir);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub async fn save(&self, state_dir: &Path) -> EarthdataResult<()> {
        fs::create_dir_all(state_dir).await?;
        fs::write(Self::path(state_dir), serde_json::to_string(self)?).await?;
        Ok(())
    }

    pub async fn remove(state_dir: &Path) -> EarthdataResult<()> {
        let path = Self::path(state_dir);
        if fs::try_exists(&path).await? {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

/// Texts of the children of `<parent>`, a direct child of the root element.
///
/// `child_texts(xml, b"requestStatus")` on
/// `<r><requestStatus><status>complete</status></requestStatus></r>`
/// gives `[("status", "complete")]`.
pub(crate) fn child_texts(xml: &str, parent: &[u8]) -> EarthdataResult<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut in_parent = false;
    let mut current: Option<(String, String)> = None;
    let mut children = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                if depth == 2 && name.as_ref() == parent {
                    in_parent = true;
                } else if in_parent && depth == 3 {
                    let name = String::from_utf8_lossy(name.as_ref()).into_owned();
                    current = Some((name, String::new()));
                }
            }
            Event::Empty(e) => {
                if in_parent && depth == 2 {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    children.push((name, String::new()));
                }
            }
            Event::Text(t) => {
                if depth == 3 {
                    if let Some((_, text)) = current.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                if in_parent && depth == 3 {
                    if let Some(child) = current.take() {
                        children.push(child);
                    }
                } else if in_parent && depth == 2 {
                    in_parent = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(children)
}

fn parse_order_id(xml: &str) -> EarthdataResult<String> {
    child_texts(xml, b"order")?
        .into_iter()
        .map(|(_, text)| text)
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| EarthdataError::MissingElement("order/orderId".to_string()))
}

fn parse_status(xml: &str) -> EarthdataResult<OrderStatus> {
    child_texts(xml, b"requestStatus")?
        .into_iter()
        .map(|(_, text)| OrderStatus::parse(&text))
        .next()
        .ok_or_else(|| EarthdataError::MissingElement("requestStatus/status".to_string()))
}

/// Messages worth showing for a final status: every `processInfo` entry
/// for failures, only the `info` entries otherwise.
fn parse_messages(xml: &str, status: &OrderStatus) -> EarthdataResult<Vec<String>> {
    let entries = child_texts(xml, b"processInfo")?;
    let all = matches!(status, OrderStatus::Failed | OrderStatus::CompleteWithErrors);
    Ok(entries
        .into_iter()
        .filter(|(name, text)| !text.is_empty() && (all || name == "info"))
        .map(|(_, text)| text)
        .collect())
}

/// Order every granule matching `query`.
///
/// `subset_params` come from [`Query::subset_params`] and are ignored when
/// `options.subset` is false.
#[instrument(skip_all, fields(product = %query.product(), version = %query.version()))]
pub async fn place_order(
    session: &EarthdataSession,
    query: &Query,
    subset_params: &Params,
    options: &OrderOptions,
) -> EarthdataResult<PlacedOrders> {
    let endpoints = session.endpoints();
    let granules = search_granules(session.client(), endpoints, &query.search_params()).await?;

    let total_pages = granules.len().div_ceil(query.page_size());
    let pages: Vec<usize> = if query.page_num() > 0 {
        vec![query.page_num()]
    } else {
        (1..=total_pages).collect()
    };
    info!(
        granules = granules.len(),
        requests = total_pages,
        "Submitting data order requests"
    );

    let mut agent = Params::new();
    agent.insert("agent".to_string(), "NO".to_string());
    let subsetting = if options.subset { subset_params } else { &agent };
    let base = combine_params(&[
        &query.cmr_params(),
        &query.request_params(endpoints),
        subsetting,
    ]);

    let mut placed = PlacedOrders {
        granules: granules.len(),
        ..PlacedOrders::default()
    };

    for page_num in pages {
        let mut page = Params::new();
        page.insert("page_num".to_string(), page_num.to_string());
        let params = combine_params(&[&base, &page]);

        info!(page = page_num, of = total_pages, "Submitting order request");
        let response = session
            .get(&endpoints.request_url())
            .query(&params)
            .send()
            .await?;
        let body = check_status(response)?.text().await?;
        let order_id = parse_order_id(&body)?;
        info!(order_id = %order_id, "Order submitted");

        let outcome = poll_order(session, page_num, &order_id, options.poll_interval).await?;
        if outcome.status.is_success() {
            placed.order_ids.push(order_id);
        }
        placed.outcomes.push(outcome);

        OrderRestart {
            order_ids: placed.order_ids.clone(),
        }
        .save(&options.state_dir)
        .await?;
    }

    Ok(placed)
}

/// Poll an order until it leaves the pending/processing states.
async fn poll_order(
    session: &EarthdataSession,
    page_num: usize,
    order_id: &str,
    interval: Duration,
) -> EarthdataResult<OrderOutcome> {
    let url = session.endpoints().status_url(order_id);

    let mut body = session.get_text(&url).await?;
    let mut status = parse_status(&body)?;
    info!(order_id = %order_id, status = %status, "Initial order status");

    while status.is_running() {
        debug!(order_id = %order_id, status = %status, "Order still running, waiting");
        tokio::time::sleep(interval).await;
        body = session.get_text(&url).await?;
        status = parse_status(&body)?;
    }

    let messages = parse_messages(&body, &status)?;
    if status.is_success() {
        info!(order_id = %order_id, status = %status, messages = ?messages, "Order finished");
    } else {
        warn!(order_id = %order_id, status = %status, messages = ?messages, "Order request failed");
    }

    Ok(OrderOutcome {
        page_num,
        order_id: order_id.to_string(),
        status,
        messages,
    })
}
