//! Summaries of granule search results.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::cmr::Granule;
use crate::error::{EarthdataError, EarthdataResult};

/// Products above this number (gridded and beyond) use a different
/// file-name scheme and contribute only their ids.
const LAST_ALONG_TRACK_PRODUCT: u32 = 13;

const S3_BUCKET: &str = "s3://nsidc-cumulus-prod-protected/ATLAS";

fn granule_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(ATL\d{2})(-\d{2})?_(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})_(\d{4})(\d{2})(\d{2})_(\d{3})_(\d{2})(.*?)\.(.*?)$",
        )
        .expect("granule pattern is a valid regex")
    })
}

/// Count and size of a set of granules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GranuleInfo {
    pub count: usize,
    pub mean_size_mb: f64,
    pub total_size_mb: f64,
}

impl GranuleInfo {
    /// Summarize granules; entries without a size count as 0 MB.
    pub fn summarize(granules: &[Granule]) -> EarthdataResult<Self> {
        if granules.is_empty() {
            return Err(EarthdataError::NoGranules);
        }
        let total: f64 = granules.iter().map(|g| g.size_mb().unwrap_or(0.0)).sum();
        Ok(Self {
            count: granules.len(),
            mean_size_mb: total / granules.len() as f64,
            total_size_mb: total,
        })
    }
}

impl std::fmt::Display for GranuleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Number of available granules: {}", self.count)?;
        writeln!(f, "Average size of granules (MB): {:.3}", self.mean_size_mb)?;
        write!(f, "Total size of all granules (MB): {:.3}", self.total_size_mb)
    }
}

/// Fields decoded from granule file names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GranuleIds {
    pub ids: Vec<String>,
    /// Orbital cycles, e.g. "02".
    pub cycles: Vec<String>,
    /// Reference ground tracks, e.g. "0850".
    pub tracks: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// Cloud locations; not every granule is guaranteed to be staged there.
    pub s3_urls: Vec<String>,
}

impl GranuleIds {
    pub fn from_granules(granules: &[Granule]) -> EarthdataResult<Self> {
        if granules.is_empty() {
            return Err(EarthdataError::NoGranules);
        }
        let mut out = Self::default();
        for granule in granules {
            out.push(&granule.producer_granule_id);
        }
        Ok(out)
    }

    fn push(&mut self, id: &str) {
        self.ids.push(id.to_string());

        let number: Option<u32> = id.get(3..5).and_then(|n| n.parse().ok());
        if number.map_or(true, |n| n > LAST_ALONG_TRACK_PRODUCT) {
            return;
        }

        let Some(caps) = granule_pattern().captures(id) else {
            warn!(granule = %id, "Granule id does not follow the ICESat-2 naming scheme");
            return;
        };
        let field = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        let (product, year, month, day) = (field(1), field(3), field(4), field(5));
        self.tracks.push(field(9).to_string());
        self.cycles.push(field(10).to_string());

        let date = NaiveDate::from_ymd_opt(
            year.parse().unwrap_or(0),
            month.parse().unwrap_or(0),
            day.parse().unwrap_or(0),
        );
        match date {
            Some(date) => self.dates.push(date),
            None => warn!(granule = %id, "Granule id carries an invalid date"),
        }

        self.s3_urls.push(format!(
            "{}/{}/{}/{}/{}/{}/{}",
            S3_BUCKET,
            product,
            field(12),
            year,
            month,
            day,
            id
        ));
    }
}
