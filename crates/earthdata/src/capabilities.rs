//! EGI capabilities documents.
//!
//! The capabilities document lists the subsetting agents, the variable
//! paths that can be requested, and the output formats and projections
//! available for a product version.

use async_trait::async_trait;
use is2_variables::{CatalogSource, VariablesError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::debug;

use crate::error::{EarthdataError, EarthdataResult};
use crate::session::EarthdataSession;

/// Customization options published for a product version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomOptions {
    /// `id` of every `SubsetAgent`.
    pub subset_agents: Vec<String>,
    /// Variable paths, without a leading delimiter.
    pub variables: Vec<String>,
    /// Reformatting targets.
    pub file_formats: Vec<String>,
    /// Reprojection targets.
    pub reprojections: Vec<String>,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> EarthdataResult<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Normalize a `SubsetVariable` value into a catalog path.
///
/// One leading `/` is stripped, then `:` delimiters become `/`.
fn variable_path(value: &str) -> String {
    value.strip_prefix('/').unwrap_or(value).replace(':', "/")
}

fn mark_nested(open: &mut [(Option<String>, bool)]) {
    if let Some(parent) = open.last_mut() {
        parent.1 = true;
    }
}

fn push_variable(options: &mut CustomOptions, value: Option<String>) {
    if let Some(path) = value.as_deref().map(variable_path).filter(|p| !p.is_empty()) {
        options.variables.push(path);
    }
}

/// Agents, formats and projections.
fn read_option(options: &mut CustomOptions, e: &BytesStart<'_>) -> EarthdataResult<()> {
    match e.local_name().as_ref() {
        b"SubsetAgent" => {
            if let Some(id) = attribute(e, "id")? {
                options.subset_agents.push(id);
            }
        }
        b"Format" => {
            if let Some(value) = attribute(e, "value")?.filter(|v| !v.is_empty()) {
                options.file_formats.push(value);
            }
        }
        b"Projection" => {
            if let Some(value) =
                attribute(e, "value")?.filter(|v| !v.is_empty() && v != "NO_CHANGE")
            {
                options.reprojections.push(value);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Parse a capabilities document.
///
/// Only leaf `SubsetVariable` elements (those without nested variables)
/// are listed. The empty format and the `NO_CHANGE` projection mean "no
/// change" and are skipped.
pub fn parse_capabilities(xml: &str) -> EarthdataResult<CustomOptions> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut options = CustomOptions::default();
    // Open SubsetVariable elements: (value, has nested variables)
    let mut open: Vec<(Option<String>, bool)> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            EarthdataError::Xml(format!(
                "capabilities parsing error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"SubsetVariable" {
                    mark_nested(&mut open);
                    open.push((attribute(&e, "value")?, false));
                } else {
                    read_option(&mut options, &e)?;
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"SubsetVariable" {
                    mark_nested(&mut open);
                    push_variable(&mut options, attribute(&e, "value")?);
                } else {
                    read_option(&mut options, &e)?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"SubsetVariable" => {
                if let Some((value, nested)) = open.pop() {
                    if !nested {
                        push_variable(&mut options, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!(
        variables = options.variables.len(),
        formats = options.file_formats.len(),
        projections = options.reprojections.len(),
        "Parsed capabilities"
    );
    Ok(options)
}

/// Download and parse the capabilities document at `url`.
pub async fn fetch_custom_options(
    session: &EarthdataSession,
    url: &str,
) -> EarthdataResult<CustomOptions> {
    let xml = session.get_text(url).await?;
    parse_capabilities(&xml)
}

/// Variable catalog published in a capabilities document.
pub struct CapabilitiesCatalog<'s> {
    session: &'s EarthdataSession,
    url: String,
}

impl<'s> CapabilitiesCatalog<'s> {
    pub fn new(session: &'s EarthdataSession, url: impl Into<String>) -> Self {
        Self {
            session,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for CapabilitiesCatalog<'_> {
    async fn list_paths(&self) -> is2_variables::Result<Vec<String>> {
        let options = fetch_custom_options(self.session, &self.url)
            .await
            .map_err(|e| VariablesError::Source(e.to_string()))?;
        Ok(options.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{ATL06_CAPABILITIES, ATL06_CAPABILITIES_LEAVES};

    #[test]
    fn test_variable_path() {
        assert_eq!(variable_path("/gt1l/land_ice_segments/h_li"), "gt1l/land_ice_segments/h_li");
        assert_eq!(variable_path("orbit_info:sc_orient_time"), "orbit_info/sc_orient_time");
        assert_eq!(variable_path("/gt1l:h_li"), "gt1l/h_li");
    }

    #[test]
    fn test_parse_fixture() {
        let options = parse_capabilities(ATL06_CAPABILITIES).unwrap();
        assert_eq!(options.variables.len(), ATL06_CAPABILITIES_LEAVES);
        assert!(options
            .variables
            .contains(&"gt1l/land_ice_segments/fit_statistics/h_mean".to_string()));
        assert!(options
            .variables
            .contains(&"orbit_info/sc_orient_time".to_string()));
        assert!(!options.variables.iter().any(|v| v == "gt1l" || v.is_empty()));

        assert_eq!(options.subset_agents, vec!["ICESAT2", "NO"]);
        assert_eq!(options.file_formats, vec!["TABULAR_ASCII", "NetCDF4-CF"]);
        assert_eq!(options.reprojections, vec!["GEOGRAPHIC", "POLAR_STEREOGRAPHIC"]);
    }

    #[test]
    fn test_namespaced_elements() {
        let xml = r#"<c:Capabilities xmlns:c="urn:x"><c:SubsetVariable value="/a"><c:SubsetVariable value="/a/b"/></c:SubsetVariable></c:Capabilities>"#;
        let options = parse_capabilities(xml).unwrap();
        assert_eq!(options.variables, vec!["a/b"]);
    }

    #[test]
    fn test_malformed_document() {
        let result = parse_capabilities("<Capabilities><SubsetVariable value='/a'></Capabilities>");
        assert!(matches!(result, Err(EarthdataError::Xml(_))));
    }
}
