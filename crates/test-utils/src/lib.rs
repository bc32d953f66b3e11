//! Test support for the ICESat-2 access crates.
//!
//! - [`fixtures`]: canned capabilities, order and status documents
//! - [`generators`]: variable catalogs, granule names, CMR pages, zip archives
//! - [`paths`]: locating real granules and external programs
//! - [`server`]: [`FakeArchive`], an in-process stand-in for CMR, EGI and ESIR

pub mod fixtures;
pub mod generators;
pub mod paths;
pub mod server;

pub use generators::*;
pub use paths::{find_granule, granule_dirs, program_available};
pub use server::{ArchiveConfig, FakeArchive};

/// Return early from a test when a real granule is not available.
///
/// Granules are hundreds of MB and are not committed; point
/// `IS2_GRANULE_DIR` at a directory holding them to run these tests.
///
/// ```ignore
/// let path = require_granule!("ATL06_20190222031203_08500210_006_02.h5");
/// ```
#[macro_export]
macro_rules! require_granule {
    ($name:expr) => {{
        match $crate::find_granule($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: granule '{}' not found (set IS2_GRANULE_DIR)", $name);
                return;
            }
        }
    }};
}

/// Return early from a test when an executable is not on `PATH`.
#[macro_export]
macro_rules! require_program {
    ($name:expr) => {{
        if !$crate::program_available($name) {
            eprintln!("SKIPPED: '{}' is not installed", $name);
            return;
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_require_program_skips() {
        fn probe() {
            require_program!("no-such-h5-tool");
            panic!("should have returned early");
        }
        probe();
    }

    #[test]
    fn test_require_granule_skips() {
        fn probe() {
            let _path = require_granule!("ATL99_00000000000000_00000000_000_00.h5");
            panic!("should have returned early");
        }
        probe();
    }
}
