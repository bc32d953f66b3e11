//! The variable selector: an immutable catalog plus a mutable wanted set.

use std::collections::{BTreeMap, BTreeSet};

use is2_common::{CatalogMode, Product};
use tracing::{debug, info, warn};

use crate::error::{Result, VariablesError};
use crate::filter::Filter;
use crate::path::{self, DELIMITER};
use crate::source::CatalogSource;

/// What [`Variables::remove_all`] does with the mandatory paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MandatoryPolicy {
    /// Reset the wanted set to the mandatory paths only.
    #[default]
    Retain,
    /// Reset the wanted set to empty.
    Clear,
}

/// The catalog decomposed into its distinct segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailOptions {
    /// Every variable name (final segment).
    pub variables: BTreeSet<String>,
    /// Every keyword segment that is not a beam or profile identifier.
    pub keywords: BTreeSet<String>,
    /// Every beam or profile identifier segment.
    pub beams: BTreeSet<String>,
}

impl AvailOptions {
    /// Keywords and beams together, in sorted order.
    pub fn segments(&self) -> BTreeSet<&str> {
        self.keywords
            .iter()
            .chain(self.beams.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Variable catalog and wanted-path selection for one product.
#[derive(Debug, Clone)]
pub struct Variables {
    product: Product,
    mode: CatalogMode,
    catalog: Option<Vec<String>>,
    mandatory: BTreeSet<String>,
    wanted: BTreeSet<String>,
    policy: MandatoryPolicy,
}

/// Resolved form of a filter against a specific catalog.
struct Selection<'f> {
    filter: &'f Filter,
    vars: Option<BTreeSet<String>>,
}

impl Selection<'_> {
    fn matches(&self, path: &str) -> bool {
        self.filter.matches_with_vars(path, self.vars.as_ref())
    }
}

impl Variables {
    /// Create a selector whose catalog will be populated later.
    pub fn new(product: Product, mode: CatalogMode) -> Self {
        Self {
            product,
            mode,
            catalog: None,
            mandatory: BTreeSet::new(),
            wanted: BTreeSet::new(),
            policy: MandatoryPolicy::default(),
        }
    }

    /// Create a selector from an already known listing.
    pub fn with_catalog<I, S>(product: Product, mode: CatalogMode, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut variables = Self::new(product, mode);
        variables.set_catalog(paths)?;
        Ok(variables)
    }

    pub fn with_policy(mut self, policy: MandatoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn policy(&self) -> MandatoryPolicy {
        self.policy
    }

    pub fn is_populated(&self) -> bool {
        self.catalog.is_some()
    }

    /// Populate the catalog from a source. The catalog can be set only once.
    pub async fn populate(&mut self, source: &dyn CatalogSource) -> Result<&[String]> {
        if self.catalog.is_some() {
            return Err(VariablesError::CatalogAlreadyPopulated(self.product.to_string()));
        }
        let paths = source.list_paths().await?;
        self.set_catalog(paths)?;
        self.avail()
    }

    /// Install the catalog and seed the wanted set with the mandatory paths.
    ///
    /// Leading delimiters are stripped and duplicates dropped; listing order
    /// is otherwise preserved.
    pub fn set_catalog<I, S>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.catalog.is_some() {
            return Err(VariablesError::CatalogAlreadyPopulated(self.product.to_string()));
        }

        let mut seen = BTreeSet::new();
        let catalog: Vec<String> = paths
            .into_iter()
            .map(|p| {
                let p: String = p.into();
                p.trim_start_matches(DELIMITER).to_string()
            })
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();

        if catalog.is_empty() {
            return Err(VariablesError::EmptyCatalog(self.product.to_string()));
        }

        self.mandatory = mandatory_paths(&self.product, self.mode, &catalog);
        self.wanted = self.mandatory.clone();

        info!(
            product = %self.product,
            mode = %self.mode,
            paths = catalog.len(),
            mandatory = self.mandatory.len(),
            "Variable catalog populated"
        );
        self.catalog = Some(catalog);
        Ok(())
    }

    fn catalog(&self) -> Result<&[String]> {
        self.catalog
            .as_deref()
            .ok_or_else(|| VariablesError::EmptyCatalog(self.product.to_string()))
    }

    /// Every available path, in listing order.
    pub fn avail(&self) -> Result<&[String]> {
        self.catalog()
    }

    /// The distinct variable names, keywords and beams of the catalog.
    pub fn avail_options(&self) -> Result<AvailOptions> {
        let mut options = AvailOptions::default();
        for p in self.catalog()? {
            options.variables.insert(path::variable_name(p).to_string());
            for kw in path::keywords(p) {
                if path::is_beam(kw) {
                    options.beams.insert(kw.to_string());
                } else {
                    options.keywords.insert(kw.to_string());
                }
            }
        }
        Ok(options)
    }

    /// Group paths by variable name. See [`path::parse`].
    pub fn parse<S: AsRef<str>>(paths: &[S]) -> BTreeMap<String, Vec<String>> {
        path::parse(paths)
    }

    /// Add every catalog path matching `filter` to the wanted set.
    ///
    /// Returns the full wanted set after the update.
    pub fn append(&mut self, filter: &Filter) -> Result<&BTreeSet<String>> {
        if filter.is_empty() {
            return Err(VariablesError::InvalidFilter(
                "no criteria supplied; give variables, keywords, beams, or defaults".to_string(),
            ));
        }

        let Some(selection) = self.resolve(filter)? else {
            return Ok(&self.wanted);
        };

        let matched: Vec<String> = self
            .catalog()?
            .iter()
            .filter(|p| selection.matches(p))
            .cloned()
            .collect();

        let before = self.wanted.len();
        self.wanted.extend(matched);
        debug!(
            added = self.wanted.len() - before,
            wanted = self.wanted.len(),
            "Appended variables"
        );
        Ok(&self.wanted)
    }

    /// Remove every wanted path matching `filter`.
    ///
    /// Mandatory paths are never removed by a filter; use
    /// [`Variables::remove_all`] for that. An empty filter is a no-op.
    /// Returns the full wanted set after the update.
    pub fn remove(&mut self, filter: &Filter) -> Result<&BTreeSet<String>> {
        self.catalog()?;
        if filter.is_empty() {
            return Ok(&self.wanted);
        }

        let Some(selection) = self.resolve(filter)? else {
            return Ok(&self.wanted);
        };

        let before = self.wanted.len();
        let mandatory = &self.mandatory;
        self.wanted
            .retain(|p| mandatory.contains(p) || !selection.matches(p));
        debug!(
            removed = before - self.wanted.len(),
            wanted = self.wanted.len(),
            "Removed variables"
        );
        Ok(&self.wanted)
    }

    /// Reset the wanted set according to the [`MandatoryPolicy`].
    pub fn remove_all(&mut self) -> &BTreeSet<String> {
        match self.policy {
            MandatoryPolicy::Retain => self.wanted = self.mandatory.clone(),
            MandatoryPolicy::Clear => self.wanted.clear(),
        }
        &self.wanted
    }

    /// The wanted paths, sorted.
    pub fn wanted(&self) -> &BTreeSet<String> {
        &self.wanted
    }

    /// The wanted paths grouped by variable name.
    pub fn wanted_grouped(&self) -> BTreeMap<String, Vec<String>> {
        let wanted: Vec<&String> = self.wanted.iter().collect();
        path::parse(&wanted)
    }

    pub fn mandatory(&self) -> &BTreeSet<String> {
        &self.mandatory
    }

    /// The `Coverage` subsetting parameter for the wanted paths:
    /// `"/gt1l/land_ice_segments/h_li,/orbit_info/sc_orient"`.
    ///
    /// `None` when nothing is wanted, meaning no variable subsetting.
    pub fn coverage(&self) -> Option<String> {
        if self.wanted.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .wanted
            .iter()
            .map(|p| format!("{}{}", DELIMITER, p))
            .collect();
        Some(parts.join(","))
    }

    /// Validate a filter against the catalog and resolve the defaults flag.
    ///
    /// `Ok(None)` means the filter reduces to nothing (defaults requested
    /// for a product without a default list, and no other criteria).
    fn resolve<'f>(&self, filter: &'f Filter) -> Result<Option<Selection<'f>>> {
        let options = self.avail_options()?;

        if filter.is_keyword_probe() {
            return Err(VariablesError::InvalidFilter(format!(
                "empty keyword. Please select from this list: {}",
                join(options.segments())
            )));
        }
        self.validate(filter, &options)?;

        let mut vars = filter.var_list().cloned();
        if filter.use_defaults() {
            match self.product.default_variables() {
                Some(defaults) => {
                    let set = vars.get_or_insert_with(BTreeSet::new);
                    for name in defaults {
                        if options.variables.contains(name) {
                            set.insert(name.to_string());
                        } else {
                            debug!(variable = name, "Default variable not in catalog");
                        }
                    }
                }
                None => {
                    warn!(
                        product = %self.product,
                        "No default variable list is defined for this product"
                    );
                    if vars.is_none() && !filter.has_segment_criteria() {
                        return Ok(None);
                    }
                }
            }
        }

        Ok(Some(Selection { filter, vars }))
    }

    fn validate(&self, filter: &Filter, options: &AvailOptions) -> Result<()> {
        if let Some(vars) = filter.var_list() {
            if let Some(bad) = vars.iter().find(|v| !options.variables.contains(*v)) {
                return Err(VariablesError::InvalidFilter(format!(
                    "invalid variable name: {}. Please select from this list: {}",
                    bad,
                    join(options.variables.iter().map(String::as_str))
                )));
            }
        }

        if let Some(beams) = filter.beam_list() {
            if let Some(bad) = beams.iter().find(|b| !options.beams.contains(*b)) {
                return Err(VariablesError::InvalidFilter(format!(
                    "invalid beam: {}. Please select from this list: {}",
                    bad,
                    join(options.beams.iter().map(String::as_str))
                )));
            }
        }

        // Keywords may name beams too.
        if let Some(keywords) = filter.keyword_list() {
            let segments = options.segments();
            if let Some(bad) = keywords.iter().find(|k| !segments.contains(k.as_str())) {
                return Err(VariablesError::InvalidFilter(format!(
                    "invalid keyword: {}. Please select from this list: {}",
                    bad,
                    join(segments)
                )));
            }
        }
        Ok(())
    }
}

fn join<'a, I: IntoIterator<Item = &'a str>>(items: I) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}

/// Catalog paths holding the product's mandatory variables.
///
/// Empty when any mandatory variable is missing from the catalog, which is
/// the case for the gridded products.
fn mandatory_paths(product: &Product, mode: CatalogMode, catalog: &[String]) -> BTreeSet<String> {
    let names = product.mandatory_variables(mode);
    let available: BTreeSet<&str> = catalog.iter().map(|p| path::variable_name(p)).collect();

    if let Some(missing) = names.iter().find(|n| !available.contains(*n)) {
        debug!(
            product = %product,
            variable = missing,
            "Mandatory variable missing from catalog; no mandatory paths"
        );
        return BTreeSet::new();
    }

    catalog
        .iter()
        .filter(|p| names.contains(&path::variable_name(p)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Variables {
        Variables::with_catalog(
            Product::parse("ATL06").unwrap(),
            CatalogMode::Order,
            [
                "gt1l/land_ice_segments/latitude",
                "gt1l/land_ice_segments/longitude",
                "gt2l/land_ice_segments/latitude",
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_var_and_beam() {
        let mut vars = small();
        let filter = Filter::builder()
            .vars(["latitude"])
            .beams(["gt1l"])
            .build()
            .unwrap();
        let wanted = vars.append(&filter).unwrap();
        assert_eq!(wanted.len(), 1);
        assert!(wanted.contains("gt1l/land_ice_segments/latitude"));
    }

    #[test]
    fn test_no_mandatory_when_missing() {
        let vars = small();
        assert!(vars.mandatory().is_empty());
        assert!(vars.wanted().is_empty());
        assert_eq!(vars.coverage(), None);
    }

    #[test]
    fn test_set_catalog_normalizes() {
        let vars = Variables::with_catalog(
            Product::parse("ATL06").unwrap(),
            CatalogMode::File,
            ["/gt1l/h_li", "gt1l/h_li", "", "gt2l/h_li"],
        )
        .unwrap();
        assert_eq!(vars.avail().unwrap(), &["gt1l/h_li", "gt2l/h_li"]);
    }

    #[test]
    fn test_empty_listing_rejected() {
        let result = Variables::with_catalog(
            Product::parse("ATL06").unwrap(),
            CatalogMode::File,
            Vec::<String>::new(),
        );
        assert!(matches!(result, Err(VariablesError::EmptyCatalog(_))));
    }

    #[test]
    fn test_catalog_set_once() {
        let mut vars = small();
        let result = vars.set_catalog(["gt3l/land_ice_segments/latitude"]);
        assert!(matches!(result, Err(VariablesError::CatalogAlreadyPopulated(_))));
        assert_eq!(vars.avail().unwrap().len(), 3);
    }

    #[test]
    fn test_unpopulated() {
        let mut vars = Variables::new(Product::parse("ATL06").unwrap(), CatalogMode::Order);
        assert!(!vars.is_populated());
        assert!(matches!(vars.avail(), Err(VariablesError::EmptyCatalog(_))));
        assert!(matches!(vars.avail_options(), Err(VariablesError::EmptyCatalog(_))));
        let filter = Filter::vars(["latitude"]).unwrap();
        assert!(matches!(vars.append(&filter), Err(VariablesError::EmptyCatalog(_))));
        assert!(matches!(vars.remove(&filter), Err(VariablesError::EmptyCatalog(_))));
    }
}
