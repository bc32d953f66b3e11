//! Sources that produce the catalog of available variable paths.
//!
//! The ordering service publishes the listing in its capabilities document
//! (see the `earthdata` crate); local granules are listed with the HDF5
//! `h5ls` tool.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VariablesError};

/// Anything that can list the variable paths available for a product.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List every variable path, without a leading delimiter.
    async fn list_paths(&self) -> Result<Vec<String>>;
}

/// An in-memory listing, e.g. one cached from an earlier session.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    paths: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn list_paths(&self) -> Result<Vec<String>> {
        Ok(self.paths.clone())
    }
}

/// Lists the datasets of a local HDF5 granule by running `h5ls -r`.
#[derive(Debug, Clone)]
pub struct H5lsCatalog {
    file: PathBuf,
    program: String,
}

impl H5lsCatalog {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            program: "h5ls".to_string(),
        }
    }

    /// Use a different `h5ls` executable (e.g. an absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

#[async_trait]
impl CatalogSource for H5lsCatalog {
    async fn list_paths(&self) -> Result<Vec<String>> {
        if !self.file.is_file() {
            return Err(VariablesError::Source(format!(
                "{} is not a file",
                self.file.display()
            )));
        }

        let output = Command::new(&self.program)
            .arg("-r")
            .arg(&self.file)
            .output()
            .await
            .map_err(|e| VariablesError::Source(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(VariablesError::Source(format!(
                "{} failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let paths = parse_h5ls_listing(&listing);
        debug!(file = %self.file.display(), datasets = paths.len(), "Listed granule datasets");
        Ok(paths)
    }
}

fn dataset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+Dataset(\s|$)").expect("dataset pattern is a valid regex"))
}

/// Extract dataset paths from recursive `h5ls` output.
///
/// ```text
/// /                        Group
/// /gt1l/land_ice_segments  Group
/// /gt1l/land_ice_segments/h_li Dataset {22768/Inf}
/// ```
///
/// Groups and links are skipped, escaped spaces are restored and the
/// leading `/` is removed.
pub fn parse_h5ls_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let found = dataset_pattern().find(line)?;
            let name = line[..found.start()].trim_start();
            let name = name.replace("\\ ", " ");
            let name = name.trim_start_matches('/');
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
