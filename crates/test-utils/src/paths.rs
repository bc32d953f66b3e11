//! Locating real granules and external tools.

use std::path::PathBuf;

/// Environment variable naming an extra granule directory.
pub const GRANULE_DIR_ENV: &str = "IS2_GRANULE_DIR";

fn workspace_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    // crates/test-utils -> workspace
    manifest
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest)
}

/// Directories searched for granules, in priority order.
pub fn granule_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = std::env::var_os(GRANULE_DIR_ENV) {
        dirs.push(PathBuf::from(dir));
    }
    let root = workspace_root();
    dirs.push(root.join("crates/is2-variables/testdata"));
    dirs.push(root.join("crates/earthdata/testdata"));
    dirs.push(root.join("testdata"));
    dirs
}

/// First granule named `name` in [`granule_dirs`].
pub fn find_granule(name: &str) -> Option<PathBuf> {
    granule_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Whether `name` resolves to a file on `PATH`.
pub fn program_available(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root() {
        assert!(workspace_root().join("crates").join("test-utils").is_dir());
    }

    #[test]
    fn test_granule_dirs_order() {
        let dirs = granule_dirs();
        let last = dirs.last().unwrap();
        assert!(last.ends_with("testdata"));
        assert!(dirs.iter().any(|d| d.ends_with("crates/is2-variables/testdata")));
    }

    #[test]
    fn test_missing_granule() {
        assert!(find_granule("ATL99_00000000000000_00000000_000_00.h5").is_none());
    }

    #[test]
    fn test_missing_program() {
        assert!(!program_available("no-such-h5-tool"));
    }
}
