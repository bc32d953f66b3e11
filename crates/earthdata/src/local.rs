//! Discovery of granules already on the local file system.
//!
//! A data source is either one granule file or a directory tree of them.
//! File names are matched against a format-style pattern such as
//! [`DEFAULT_FILENAME_PATTERN`], where `{name:N}` is an N-digit field,
//! `{name:%Y%m%d}` a timestamp and `{name}` anything.

use std::path::{Path, PathBuf};

use is2_common::{Is2Error, Product};
use is2_variables::H5lsCatalog;
use regex::Regex;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{EarthdataError, EarthdataResult};

/// Name scheme of granules delivered by the archive.
pub const DEFAULT_FILENAME_PATTERN: &str =
    "ATL{product:2}_{datetime:%Y%m%d%H%M%S}_{rgt:4}{cycle:2}{orbitsegment:2}_{version:3}_{revision:2}.h5";

fn invalid_pattern(message: impl Into<String>) -> EarthdataError {
    Is2Error::InvalidParameter {
        param: "filename_pattern".to_string(),
        message: message.into(),
    }
    .into()
}

fn strftime_regex(format: &str) -> EarthdataResult<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push_str(&regex::escape(&c.to_string()));
            continue;
        }
        let digits = match chars.next() {
            Some('Y') => 4,
            Some('m' | 'd' | 'H' | 'M' | 'S' | 'y') => 2,
            Some('j') => 3,
            other => {
                return Err(invalid_pattern(format!(
                    "unsupported time directive %{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        };
        out.push_str(&format!(r"\d{{{}}}", digits));
    }
    Ok(out)
}

fn field_regex(field: &str) -> EarthdataResult<String> {
    let (name, format) = match field.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (field, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid_pattern(format!("invalid field name '{}'", name)));
    }

    let body = match format {
        None | Some("") => ".+?".to_string(),
        Some(format) if format.contains('%') => strftime_regex(format)?,
        Some(format) => {
            let width: usize = format
                .parse()
                .map_err(|_| invalid_pattern(format!("invalid field width '{}'", format)))?;
            format!(r"\d{{{}}}", width)
        }
    };
    Ok(format!("(?P<{}>{})", name, body))
}

/// Convert a file-name pattern into an anchored regex.
pub fn pattern_to_regex(pattern: &str) -> EarthdataResult<Regex> {
    let mut out = String::from("^");
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&regex::escape(&rest[..open]));
        let close = rest[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| invalid_pattern("unclosed '{'"))?;
        out.push_str(&field_regex(&rest[open + 1..close])?);
        rest = &rest[close + 1..];
    }
    if rest.contains('}') {
        return Err(invalid_pattern("unmatched '}'"));
    }
    out.push_str(&regex::escape(rest));
    out.push('$');

    Regex::new(&out).map_err(|e| invalid_pattern(e.to_string()))
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with("__") || name.starts_with('.')
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Granule files found under a local data source.
#[derive(Debug, Clone)]
pub struct LocalSource {
    source: PathBuf,
    product: Product,
    pattern: String,
    files: Vec<PathBuf>,
}

impl LocalSource {
    /// Find the granules of `product` under `source`.
    ///
    /// A directory is scanned recursively, skipping entries whose name
    /// starts with `__` or `.`. Files whose names do not mention the
    /// product are dropped, unless none of them do.
    pub fn discover(
        source: impl AsRef<Path>,
        product: &Product,
        pattern: &str,
    ) -> EarthdataResult<Self> {
        let source = source.as_ref();
        let regex = pattern_to_regex(pattern)?;

        let matched = if source.is_dir() {
            let mut files = Vec::new();
            let walker = WalkDir::new(source)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_skipped(e));
            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_file()
                    && regex.is_match(&entry.file_name().to_string_lossy())
                {
                    files.push(entry.into_path());
                }
            }
            if files.is_empty() {
                return Err(EarthdataError::InvalidSource(
                    "None of your filenames match the specified pattern.".to_string(),
                ));
            }
            info!(
                files = files.len(),
                "Files matching the filename pattern to be read in"
            );
            files
        } else if source.is_file() {
            if !regex.is_match(&file_name(source)) {
                return Err(EarthdataError::InvalidSource(
                    "Your input filename does not match the filename pattern.".to_string(),
                ));
            }
            vec![source.to_path_buf()]
        } else {
            return Err(EarthdataError::InvalidSource(format!(
                "{} is not a file or directory",
                source.display()
            )));
        };

        let files = filter_product(matched, product);
        Ok(Self {
            source: source.to_path_buf(),
            product: product.clone(),
            pattern: pattern.to_string(),
            files,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn first_file(&self) -> Option<&Path> {
        self.files.first().map(PathBuf::as_path)
    }

    /// Dataset listing of the first granule, for `file` mode selection.
    pub fn catalog(&self) -> EarthdataResult<H5lsCatalog> {
        self.first_file()
            .map(H5lsCatalog::new)
            .ok_or_else(|| EarthdataError::InvalidSource("no granule files found".to_string()))
    }
}

fn filter_product(files: Vec<PathBuf>, product: &Product) -> Vec<PathBuf> {
    let total = files.len();
    let named: Vec<PathBuf> = files
        .iter()
        .filter(|f| file_name(f).contains(product.as_str()))
        .cloned()
        .collect();

    if named.is_empty() {
        warn!(
            product = %product,
            "Your filenames do not contain a product identifier (e.g. ATL06); \
             files of different products may be mixed"
        );
        files
    } else {
        if named.len() < total {
            warn!(
                product = %product,
                removed = total - named.len(),
                "Some files matching your filename pattern were removed as they were not the specified product."
            );
        }
        named
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::granule_name;

    fn atl06() -> Product {
        Product::parse("ATL06").unwrap()
    }

    #[test]
    fn test_default_pattern_regex() {
        let regex = pattern_to_regex(DEFAULT_FILENAME_PATTERN).unwrap();
        let caps = regex
            .captures("ATL06_20190222031203_08500210_006_02.h5")
            .unwrap();
        assert_eq!(&caps["product"], "06");
        assert_eq!(&caps["datetime"], "20190222031203");
        assert_eq!(&caps["rgt"], "0850");
        assert_eq!(&caps["cycle"], "02");
        assert_eq!(&caps["orbitsegment"], "10");
        assert_eq!(&caps["version"], "006");

        assert!(!regex.is_match("processed_ATL06_20190222031203_08500210_006_02.h5"));
        assert!(!regex.is_match("ATL06_20190222031203_08500210_006_02xh5"));
    }

    #[test]
    fn test_free_fields() {
        let regex = pattern_to_regex("{prefix}ATL{product:2}_{rest}.h5").unwrap();
        assert!(regex.is_match("processed_ATL06_anything.h5"));
        assert!(!regex.is_match("ATL06_anything.h5"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(pattern_to_regex("ATL{product:2").is_err());
        assert!(pattern_to_regex("ATL}").is_err());
        assert!(pattern_to_regex("ATL{product:x}").is_err());
        assert!(pattern_to_regex("{when:%Q}").is_err());
    }

    #[test]
    fn test_discover_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cycle02");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();

        let a = granule_name("ATL06", "20190222031203", 850, 2, "006");
        let b = granule_name("ATL06", "20190223031203", 864, 2, "006");
        fs::write(dir.path().join(&a), b"").unwrap();
        fs::write(nested.join(&b), b"").unwrap();
        fs::write(dir.path().join("__pycache__").join(&a), b"").unwrap();
        fs::write(dir.path().join(format!(".{}", a)), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let local = LocalSource::discover(dir.path(), &atl06(), DEFAULT_FILENAME_PATTERN).unwrap();
        assert_eq!(local.files().len(), 2);
        assert_eq!(local.first_file(), Some(dir.path().join(&a).as_path()));
    }

    #[test]
    fn test_discover_drops_other_products() {
        let dir = tempfile::tempdir().unwrap();
        let a = granule_name("ATL06", "20190222031203", 850, 2, "006");
        let b = granule_name("ATL08", "20190222031203", 850, 2, "006");
        fs::write(dir.path().join(&a), b"").unwrap();
        fs::write(dir.path().join(&b), b"").unwrap();

        let local = LocalSource::discover(dir.path(), &atl06(), DEFAULT_FILENAME_PATTERN).unwrap();
        assert_eq!(local.files(), &[dir.path().join(&a)]);
    }

    #[test]
    fn test_discover_keeps_all_without_product_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("granule_1.h5"), b"").unwrap();
        fs::write(dir.path().join("granule_2.h5"), b"").unwrap();

        let local = LocalSource::discover(dir.path(), &atl06(), "granule_{n:1}.h5").unwrap();
        assert_eq!(local.files().len(), 2);
    }

    #[test]
    fn test_discover_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalSource::discover(dir.path(), &atl06(), DEFAULT_FILENAME_PATTERN).unwrap_err();
        assert!(err.to_string().contains("None of your filenames match"));

        let file = dir.path().join("ATL06.h5");
        fs::write(&file, b"").unwrap();
        let err = LocalSource::discover(&file, &atl06(), DEFAULT_FILENAME_PATTERN).unwrap_err();
        assert!(err.to_string().contains("Your input filename does not match"));

        let missing = dir.path().join("missing");
        let err = LocalSource::discover(&missing, &atl06(), DEFAULT_FILENAME_PATTERN).unwrap_err();
        assert!(matches!(err, EarthdataError::InvalidSource(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_single_file_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir
            .path()
            .join(granule_name("ATL06", "20190222031203", 850, 2, "006"));
        fs::write(&file, b"").unwrap();

        let local = LocalSource::discover(&file, &atl06(), DEFAULT_FILENAME_PATTERN).unwrap();
        assert_eq!(local.catalog().unwrap().file(), file.as_path());
    }
}
