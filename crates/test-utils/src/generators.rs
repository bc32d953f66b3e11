//! Generators for synthetic test data.
//!
//! These functions create variable catalogs, CMR granule entries and
//! order archives shaped like the real ICESat-2 data.

use std::io::{Cursor, Write};

use serde_json::{json, Value};

/// Ground-track beams of the along-track products.
pub const BEAMS: [&str; 6] = ["gt1l", "gt1r", "gt2l", "gt2r", "gt3l", "gt3r"];

/// The ATL06 `ancillary_data` variables that are mandatory in order mode.
pub const ANCILLARY: [&str; 7] = [
    "atlas_sdp_gps_epoch",
    "data_end_utc",
    "data_start_utc",
    "end_delta_time",
    "granule_end_utc",
    "granule_start_utc",
    "start_delta_time",
];

/// A realistic ATL06 variable catalog (no leading delimiters).
///
/// 7 ancillary paths, 4 orbit_info paths and 15 paths per beam.
pub fn atl06_catalog() -> Vec<String> {
    let mut paths: Vec<String> = ANCILLARY
        .iter()
        .map(|v| format!("ancillary_data/{}", v))
        .collect();

    for v in ["sc_orient", "sc_orient_time", "rgt", "cycle_number"] {
        paths.push(format!("orbit_info/{}", v));
    }

    for beam in BEAMS {
        for v in [
            "atl06_quality_summary",
            "delta_time",
            "h_li",
            "h_li_sigma",
            "latitude",
            "longitude",
            "segment_id",
            "sigma_geo_h",
        ] {
            paths.push(format!("{}/land_ice_segments/{}", beam, v));
        }
        for v in ["x_atc", "y_atc"] {
            paths.push(format!("{}/land_ice_segments/ground_track/{}", beam, v));
        }
        for v in ["dh_fit_dx", "h_mean"] {
            paths.push(format!("{}/land_ice_segments/fit_statistics/{}", beam, v));
        }
        for v in ["delta_time", "lat_mean", "lon_mean"] {
            paths.push(format!("{}/residual_histogram/{}", beam, v));
        }
    }
    paths
}

/// A small ATL09 catalog with atmospheric profiles instead of beams.
pub fn atl09_catalog() -> Vec<String> {
    let mut paths: Vec<String> = ANCILLARY
        .iter()
        .map(|v| format!("ancillary_data/{}", v))
        .collect();
    paths.push("orbit_info/sc_orient".to_string());
    paths.push("orbit_info/sc_orient_time".to_string());

    for profile in ["profile_1", "profile_2", "profile_3"] {
        for v in ["delta_time", "latitude", "longitude", "cloud_flag_asr"] {
            paths.push(format!("{}/high_rate/{}", profile, v));
        }
        for v in ["bsnow_h", "apparent_surf_reflec"] {
            paths.push(format!("{}/low_rate/{}", profile, v));
        }
    }
    paths
}

/// Render the recursive `h5ls` listing of a catalog, groups included.
pub fn h5ls_listing(paths: &[String]) -> String {
    let mut out = String::from("/                        Group\n");
    let mut groups = std::collections::BTreeSet::new();
    for path in paths {
        let segments: Vec<&str> = path.split('/').collect();
        for depth in 1..segments.len() {
            let group = segments[..depth].join("/");
            if groups.insert(group.clone()) {
                out.push_str(&format!("/{:<24} Group\n", group));
            }
        }
        out.push_str(&format!("/{} Dataset {{22768/Inf}}\n", path));
    }
    out
}

/// An ICESat-2 granule file name.
///
/// `ATL06_20190222031203_08500210_006_02.h5`
pub fn granule_name(product: &str, timestamp: &str, rgt: u32, cycle: u32, version: &str) -> String {
    format!(
        "{}_{}_{:04}{:02}10_{}_02.h5",
        product, timestamp, rgt, cycle, version
    )
}

/// One CMR granule entry as returned in `feed.entry`.
pub fn cmr_entry(producer_granule_id: &str, size_mb: f64) -> Value {
    json!({
        "producer_granule_id": producer_granule_id,
        "granule_size": format!("{}", size_mb),
        "time_start": "2019-02-22T03:12:03.000Z",
        "time_end": "2019-02-22T03:15:10.000Z",
        "links": [
            {
                "rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                "href": format!("https://n5eil01u.ecs.nsidc.org/DP7/ATLAS/{}", producer_granule_id),
            }
        ],
    })
}

/// `count` ATL06 granule entries for consecutive reference ground tracks.
pub fn atl06_entries(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let name = granule_name(
                "ATL06",
                &format!("201902220{}1203", i % 10),
                850 + i as u32,
                2,
                "006",
            );
            cmr_entry(&name, 10.0 + i as f64)
        })
        .collect()
}

/// A `feed.entry` page body.
pub fn cmr_page(entries: &[Value]) -> Value {
    json!({ "feed": { "entry": entries } })
}

/// A `collections.json` body listing the given collection versions.
pub fn collections_body(short_name: &str, versions: &[&str]) -> Value {
    let entries: Vec<Value> = versions
        .iter()
        .map(|v| json!({ "short_name": short_name, "version_id": v }))
        .collect();
    json!({ "feed": { "entry": entries } })
}

/// Build an in-memory zip archive from `(member name, contents)` pairs.
///
/// Member names may include directories, which is how the order service
/// nests granules by order.
pub fn zip_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in members {
        writer
            .start_file(*name, options)
            .expect("Failed to start zip member");
        writer
            .write_all(contents)
            .expect("Failed to write zip member");
    }
    writer
        .finish()
        .expect("Failed to finish zip archive")
        .into_inner()
}
