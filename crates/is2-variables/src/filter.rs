//! Filter criteria for selecting variable paths.

use std::collections::BTreeSet;

use crate::error::{Result, VariablesError};
use crate::path::{self, DELIMITER};

/// Criteria for adding paths to (or removing them from) the wanted set.
///
/// A path matches when it satisfies every category that was supplied:
/// its variable name is listed, AND one of its segments is a listed
/// keyword, AND one of its segments is a listed beam. Within a category
/// any listed value is enough. To OR across categories, apply two filters.
///
/// ```
/// use is2_variables::Filter;
///
/// let filter = Filter::builder()
///     .vars(["latitude", "longitude"])
///     .beams(["gt1l"])
///     .build()
///     .unwrap();
/// assert!(filter.matches("gt1l/land_ice_segments/latitude"));
/// assert!(!filter.matches("gt2l/land_ice_segments/latitude"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    vars: Option<BTreeSet<String>>,
    keywords: Option<BTreeSet<String>>,
    beams: Option<BTreeSet<String>>,
    defaults: bool,
}

impl Filter {
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// Filter on variable names only.
    pub fn vars<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().vars(names).build()
    }

    /// Filter on keyword segments only.
    pub fn keywords<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().keywords(keywords).build()
    }

    /// Select the product's canned default variables.
    pub fn defaults() -> Self {
        Self {
            defaults: true,
            ..Self::default()
        }
    }

    pub fn var_list(&self) -> Option<&BTreeSet<String>> {
        self.vars.as_ref()
    }

    pub fn keyword_list(&self) -> Option<&BTreeSet<String>> {
        self.keywords.as_ref()
    }

    pub fn beam_list(&self) -> Option<&BTreeSet<String>> {
        self.beams.as_ref()
    }

    pub fn use_defaults(&self) -> bool {
        self.defaults
    }

    /// No criteria supplied at all.
    pub fn is_empty(&self) -> bool {
        !self.defaults && self.vars.is_none() && self.keywords.is_none() && self.beams.is_none()
    }

    /// Whether this is the keyword help probe (`keywords([""])`).
    pub fn is_keyword_probe(&self) -> bool {
        self.keywords
            .as_ref()
            .is_some_and(|kws| kws.len() == 1 && kws.contains(""))
    }

    /// Whether this filter restricts by keyword or beam segments.
    pub fn has_segment_criteria(&self) -> bool {
        self.keywords.is_some() || self.beams.is_some()
    }

    /// Match a path against the explicit criteria of this filter.
    ///
    /// The `defaults` flag is product specific and is resolved by the
    /// selector; it plays no part here.
    pub fn matches(&self, path: &str) -> bool {
        self.matches_with_vars(path, self.vars.as_ref())
    }

    /// Match a path using `vars` as the variable-name criterion.
    pub(crate) fn matches_with_vars(&self, path: &str, vars: Option<&BTreeSet<String>>) -> bool {
        if let Some(vars) = vars {
            if !vars.contains(path::variable_name(path)) {
                return false;
            }
        }

        let segment_in = |set: &BTreeSet<String>| path::keywords(path).any(|kw| set.contains(kw));

        if let Some(keywords) = &self.keywords {
            if !segment_in(keywords) {
                return false;
            }
        }
        if let Some(beams) = &self.beams {
            if !segment_in(beams) {
                return false;
            }
        }
        true
    }
}

/// Builder for [`Filter`]; validated by [`FilterBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    vars: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    beams: Option<Vec<String>>,
    defaults: bool,
}

impl FilterBuilder {
    pub fn vars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars
            .get_or_insert_with(Vec::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .get_or_insert_with(Vec::new)
            .extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn beams<I, S>(mut self, beams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.beams
            .get_or_insert_with(Vec::new)
            .extend(beams.into_iter().map(Into::into));
        self
    }

    pub fn defaults(mut self, defaults: bool) -> Self {
        self.defaults = defaults;
        self
    }

    /// Validate the criteria shape.
    ///
    /// Variable names must be non-empty single segments and beams must be
    /// single segments. An explicitly empty list is rejected; leave the
    /// category out instead. Names are checked against a catalog only when
    /// the filter is applied.
    pub fn build(self) -> Result<Filter> {
        let vars = self
            .vars
            .map(|names| into_set("var_list", names, false))
            .transpose()?;
        let beams = self
            .beams
            .map(|names| into_set("beam_list", names, false))
            .transpose()?;
        // An empty keyword is legal here: it is the help probe.
        let keywords = self
            .keywords
            .map(|names| into_set("keyword_list", names, true))
            .transpose()?;

        Ok(Filter {
            vars,
            keywords,
            beams,
            defaults: self.defaults,
        })
    }
}

fn into_set(category: &str, names: Vec<String>, allow_empty_name: bool) -> Result<BTreeSet<String>> {
    if names.is_empty() {
        return Err(VariablesError::InvalidFilter(format!(
            "{} was supplied but is empty",
            category
        )));
    }
    for name in &names {
        if name.contains(DELIMITER) {
            return Err(VariablesError::InvalidFilter(format!(
                "{} entries are single path segments, got '{}'",
                category, name
            )));
        }
        if name.is_empty() && !allow_empty_name {
            return Err(VariablesError::InvalidFilter(format!(
                "{} contains an empty name",
                category
            )));
        }
    }
    Ok(names.into_iter().collect())
}
