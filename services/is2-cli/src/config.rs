//! Query files.
//!
//! A query can be written once as YAML and reused across commands:
//!
//! ```yaml
//! product: ATL06
//! version: "006"
//! bbox: [-55, 68, -48, 71]
//! dates: ["2019-02-22", "2019-02-28"]
//! page_size: 100
//! variables:
//!   - vars: [latitude, longitude]
//!     beams: [gt1l, gt1r]
//!   - defaults: true
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use earthdata::{Query, SubsetOptions};
use is2_common::{BoundingBox, Product, TemporalRange};
use is2_variables::Filter;
use serde::Deserialize;
use tracing::debug;

/// One variable filter entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub vars: Option<Vec<String>>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub beams: Option<Vec<String>>,
    #[serde(default)]
    pub defaults: bool,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.vars.is_none() && self.keywords.is_none() && self.beams.is_none() && !self.defaults
    }

    pub fn to_filter(&self) -> Result<Filter> {
        let mut builder = Filter::builder().defaults(self.defaults);
        if let Some(vars) = &self.vars {
            builder = builder.vars(vars.iter().cloned());
        }
        if let Some(keywords) = &self.keywords {
            builder = builder.keywords(keywords.iter().cloned());
        }
        if let Some(beams) = &self.beams {
            builder = builder.beams(beams.iter().cloned());
        }
        Ok(builder.build()?)
    }
}

/// A granule query as read from YAML or assembled from flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// `[lon_min, lat_min, lon_max, lat_max]`
    #[serde(default)]
    pub bbox: Vec<f64>,
    /// `[start, end]` as `YYYY-MM-DD`.
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Order subsetted granules rather than whole files.
    #[serde(default = "default_subset")]
    pub subset: bool,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub projection: Option<String>,
    #[serde(default)]
    pub variables: Vec<FilterConfig>,
}

fn default_subset() -> bool {
    true
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            product: None,
            version: None,
            bbox: Vec::new(),
            dates: Vec::new(),
            start_time: None,
            end_time: None,
            page_size: None,
            subset: default_subset(),
            format: None,
            projection: None,
            variables: Vec::new(),
        }
    }
}

impl QueryConfig {
    /// Load a query from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file: {}", path.display()))?;

        let config: QueryConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse query file: {}", path.display()))?;

        debug!(product = ?config.product, path = %path.display(), "Loaded query file");
        Ok(config)
    }

    pub fn product(&self) -> Result<Product> {
        let Some(name) = &self.product else {
            bail!("No product given; pass --product or set `product` in the query file");
        };
        Ok(Product::parse(name)?)
    }

    pub fn extent(&self) -> Result<BoundingBox> {
        if self.bbox.is_empty() {
            bail!("No spatial extent given; pass --bbox or set `bbox` in the query file");
        }
        Ok(BoundingBox::from_slice(&self.bbox)?)
    }

    pub fn temporal(&self) -> Result<TemporalRange> {
        let [start, end] = self.dates.as_slice() else {
            bail!("Dates must be a [start, end] pair, got {} value(s)", self.dates.len());
        };
        Ok(TemporalRange::from_dates(
            start,
            end,
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )?)
    }

    /// Build the query for a resolved product version.
    pub fn query(&self, version: &str) -> Result<Query> {
        let mut query = Query::new(self.product()?, version, self.extent()?, self.temporal()?)?
            .with_subset(SubsetOptions {
                format: self.format.clone(),
                projection: self.projection.clone(),
            });
        if let Some(page_size) = self.page_size {
            query = query.with_page_size(page_size)?;
        }
        Ok(query)
    }

    /// Variable filters, in file order.
    pub fn filters(&self) -> Result<Vec<Filter>> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .to_filter()
                    .with_context(|| format!("Invalid variables entry {}", i + 1))
            })
            .collect()
    }
}
