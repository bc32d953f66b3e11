//! Temporal extents for granule queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Is2Error, Is2Result};

/// Inclusive start/end of a temporal query, in UTC.
///
/// Built from a date range plus optional times of day; the start time
/// defaults to 00:00:00 and the end time to 23:59:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Is2Result<Self> {
        if start > end {
            return Err(Is2Error::InvalidTemporal(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Build from `["YYYY-MM-DD", "YYYY-MM-DD"]` style dates and optional `HH:MM:SS` times.
    pub fn from_dates(
        start_date: &str,
        end_date: &str,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Is2Result<Self> {
        let start_date = parse_date(start_date)?;
        let end_date = parse_date(end_date)?;
        let start_time = parse_time(start_time.unwrap_or("00:00:00"))?;
        let end_time = parse_time(end_time.unwrap_or("23:59:59"))?;

        Self::new(
            Utc.from_utc_datetime(&NaiveDateTime::new(start_date, start_time)),
            Utc.from_utc_datetime(&NaiveDateTime::new(end_date, end_time)),
        )
    }

    /// CMR `temporal` parameter: "2019-02-22T00:00:00Z,2019-02-28T23:59:59Z"
    pub fn to_cmr_string(&self) -> String {
        format!(
            "{},{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }

    /// EGI subsetting `time` parameter: "2019-02-22T00:00:00,2019-02-28T23:59:59"
    pub fn to_subset_string(&self) -> String {
        format!(
            "{},{}",
            self.start.format("%Y-%m-%dT%H:%M:%S"),
            self.end.format("%Y-%m-%dT%H:%M:%S")
        )
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

fn parse_date(s: &str) -> Is2Result<NaiveDate> {
    // Day-of-year dates ("2019-053") are accepted alongside calendar dates.
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%Y-%j"))
        .map_err(|_| Is2Error::InvalidTemporal(format!("invalid date '{}'", s)))
}

fn parse_time(s: &str) -> Is2Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
        .map_err(|_| Is2Error::InvalidTemporal(format!("invalid time of day '{}'", s)))
}
