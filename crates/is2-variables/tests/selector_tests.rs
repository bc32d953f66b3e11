//! Integration tests for variable selection against realistic catalogs.

use is2_common::{CatalogMode, Product};
use is2_variables::{
    keywords, parse, parse_h5ls_listing, parse_tiered, variable_name, CatalogSource, Filter,
    H5lsCatalog, MandatoryPolicy, StaticCatalog, Variables, VariablesError,
};
use test_utils::{atl06_catalog, atl09_catalog, h5ls_listing, require_granule, require_program};

fn populated(product: &str, mode: CatalogMode, catalog: Vec<String>) -> Variables {
    let mut vars = Variables::new(Product::parse(product).unwrap(), mode);
    let source = StaticCatalog::new(catalog);
    tokio_test::block_on(vars.populate(&source)).unwrap();
    vars
}

fn atl06() -> Variables {
    populated("ATL06", CatalogMode::Order, atl06_catalog())
}

// ============================================================================
// Catalog population
// ============================================================================

#[test]
fn test_populate_seeds_mandatory() {
    let vars = atl06();
    assert_eq!(vars.avail().unwrap().len(), atl06_catalog().len());
    assert_eq!(vars.mandatory().len(), 9);
    assert_eq!(vars.wanted(), vars.mandatory());
    assert!(vars.wanted().contains("orbit_info/sc_orient"));
    assert!(vars.wanted().contains("ancillary_data/atlas_sdp_gps_epoch"));
}

#[test]
fn test_file_mode_mandatory() {
    let vars = populated("ATL06", CatalogMode::File, atl06_catalog());
    assert_eq!(vars.mandatory().len(), 6);
    assert!(vars.mandatory().contains("orbit_info/rgt"));
    assert!(vars.mandatory().contains("orbit_info/cycle_number"));
}

#[test]
fn test_populate_twice_rejected() {
    let mut vars = atl06();
    let source = StaticCatalog::new(["gt1l/land_ice_segments/h_li"]);
    let result = tokio_test::block_on(vars.populate(&source));
    assert!(matches!(result, Err(VariablesError::CatalogAlreadyPopulated(_))));
}

#[test]
fn test_avail_options_decomposition() {
    let options = atl06().avail_options().unwrap();
    assert_eq!(options.beams.len(), 6);
    assert_eq!(
        options.keywords.iter().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "ancillary_data",
            "fit_statistics",
            "ground_track",
            "land_ice_segments",
            "orbit_info",
            "residual_histogram",
        ]
    );
    assert_eq!(options.variables.len(), 25);
    assert!(options.variables.contains("h_li"));
    assert!(!options.variables.contains("gt1l"));
}

#[test]
fn test_avail_options_rebuild_every_path() {
    for (product, catalog) in [("ATL06", atl06_catalog()), ("ATL09", atl09_catalog())] {
        let vars = populated(product, CatalogMode::Order, catalog);
        let options = vars.avail_options().unwrap();
        assert!(options.keywords.is_disjoint(&options.beams), "{}", product);

        for p in vars.avail().unwrap() {
            let name = variable_name(p);
            assert!(options.variables.contains(name), "{}: {}", product, p);

            let segments: Vec<&str> = keywords(p).collect();
            for segment in &segments {
                let in_keywords = options.keywords.contains(*segment);
                let in_beams = options.beams.contains(*segment);
                assert!(in_keywords != in_beams, "{}: {} in {}", product, segment, p);
            }

            let rebuilt = segments
                .into_iter()
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join("/");
            assert_eq!(&rebuilt, p);
        }
    }
}

#[test]
fn test_parse_reconstructs_catalog() {
    let vars = atl06();
    let avail = vars.avail().unwrap();
    let grouped = parse(avail);

    let total: usize = grouped.values().map(Vec::len).sum();
    assert_eq!(total, avail.len());
    for (name, paths) in &grouped {
        assert!(paths.iter().all(|p| p == name || p.ends_with(&format!("/{}", name))));
    }
    assert_eq!(grouped["delta_time"].len(), 12);
}

#[test]
fn test_parse_tiered_catalog() {
    let vars = atl06();
    let avail = vars.avail().unwrap();
    let tiers = parse_tiered(avail, true);

    // Deepest paths: gtxx/land_ice_segments/ground_track/x_atc
    assert_eq!(tiers.len(), 4);
    assert!(tiers.iter().all(|t| t.len() == avail.len()));
    assert!(tiers[2].contains(&"none".to_string()));
    assert!(tiers[2].contains(&"ground_track".to_string()));
}

// ============================================================================
// Append / remove
// ============================================================================

#[test]
fn test_append_vars_and_beam() {
    let mut vars = atl06();
    let filter = Filter::builder()
        .vars(["latitude", "longitude"])
        .beams(["gt1l"])
        .build()
        .unwrap();

    let wanted = vars.append(&filter).unwrap();
    assert_eq!(wanted.len(), 11);
    assert!(wanted.contains("gt1l/land_ice_segments/latitude"));
    assert!(wanted.contains("gt1l/land_ice_segments/longitude"));
    assert!(!wanted.contains("gt2l/land_ice_segments/latitude"));
}

#[test]
fn test_append_is_idempotent() {
    let mut vars = atl06();
    let filter = Filter::vars(["h_li"]).unwrap();
    let once = vars.append(&filter).unwrap().clone();
    let twice = vars.append(&filter).unwrap().clone();
    assert_eq!(once, twice);
    assert_eq!(once.len(), 9 + 6);
}

#[test]
fn test_append_then_remove_restores() {
    let mut vars = atl06();
    let before = vars.wanted().clone();
    let filter = Filter::builder()
        .vars(["h_mean"])
        .keywords(["fit_statistics"])
        .build()
        .unwrap();

    vars.append(&filter).unwrap();
    assert_eq!(vars.wanted().len(), before.len() + 6);
    vars.remove(&filter).unwrap();
    assert_eq!(vars.wanted(), &before);
}

#[test]
fn test_remove_keeps_mandatory() {
    let mut vars = atl06();
    let wanted = vars
        .remove(&Filter::keywords(["ancillary_data"]).unwrap())
        .unwrap();
    assert_eq!(wanted.len(), 9);
}

#[test]
fn test_remove_empty_filter_is_noop() {
    let mut vars = atl06();
    vars.append(&Filter::vars(["h_li"]).unwrap()).unwrap();
    let wanted = vars.remove(&Filter::default()).unwrap();
    assert_eq!(wanted.len(), 15);
}

#[test]
fn test_append_empty_filter_rejected() {
    let mut vars = atl06();
    let result = vars.append(&Filter::default());
    assert!(matches!(result, Err(VariablesError::InvalidFilter(_))));
}

#[test]
fn test_keyword_only() {
    let mut vars = atl06();
    let wanted = vars
        .append(&Filter::keywords(["fit_statistics"]).unwrap())
        .unwrap();
    assert_eq!(wanted.len(), 9 + 12);
}

#[test]
fn test_keyword_and_beam() {
    let mut vars = atl06();
    let filter = Filter::builder()
        .keywords(["residual_histogram"])
        .beams(["gt2r", "gt3l"])
        .build()
        .unwrap();
    let wanted = vars.append(&filter).unwrap();
    assert_eq!(wanted.len(), 9 + 6);
    assert!(wanted.contains("gt3l/residual_histogram/lat_mean"));
}

#[test]
fn test_keyword_may_name_beam() {
    let mut vars = atl06();
    let wanted = vars.append(&Filter::keywords(["gt1r"]).unwrap()).unwrap();
    assert_eq!(wanted.len(), 9 + 15);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_keyword_probe_lists_segments() {
    let mut vars = atl06();
    let err = vars
        .append(&Filter::keywords([""]).unwrap())
        .unwrap_err();
    match err {
        VariablesError::InvalidFilter(message) => {
            assert!(message.contains("land_ice_segments"));
            assert!(message.contains("gt3r"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(vars.wanted(), vars.mandatory());
}

#[test]
fn test_unknown_variable_rejected() {
    let mut vars = atl06();
    let err = vars.append(&Filter::vars(["h_ph"]).unwrap()).unwrap_err();
    match err {
        VariablesError::InvalidFilter(message) => {
            assert!(message.contains("h_ph"));
            assert!(message.contains("Please select from this list"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(vars.wanted().len(), 9);
}

#[test]
fn test_unknown_beam_rejected() {
    let mut vars = atl06();
    let filter = Filter::builder().beams(["profile_1"]).build().unwrap();
    assert!(matches!(
        vars.append(&filter),
        Err(VariablesError::InvalidFilter(_))
    ));
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_defaults_atl06() {
    let mut vars = atl06();
    let wanted = vars.append(&Filter::defaults()).unwrap();
    assert_eq!(wanted.len(), 9 + 78);
    assert!(wanted.contains("gt2l/land_ice_segments/ground_track/x_atc"));
    assert!(!wanted.contains("gt2l/residual_histogram/lat_mean"));
}

#[test]
fn test_defaults_with_beam() {
    let mut vars = atl06();
    let filter = Filter::builder()
        .defaults(true)
        .beams(["gt1l"])
        .build()
        .unwrap();
    let wanted = vars.append(&filter).unwrap();
    assert_eq!(wanted.len(), 9 + 13);
}

#[test]
fn test_defaults_without_list_is_noop() {
    let mut vars = populated("ATL08", CatalogMode::Order, atl06_catalog());
    let wanted = vars.append(&Filter::defaults()).unwrap();
    assert_eq!(wanted.len(), 9);
}

// ============================================================================
// Reset and coverage
// ============================================================================

#[test]
fn test_remove_all_retain() {
    let mut vars = atl06();
    vars.append(&Filter::keywords(["gt1l"]).unwrap()).unwrap();
    let wanted = vars.remove_all().clone();
    assert_eq!(&wanted, vars.mandatory());
}

#[test]
fn test_remove_all_clear_and_coverage() {
    let mut vars = atl06().with_policy(MandatoryPolicy::Clear);
    vars.append(&Filter::vars(["h_li"]).unwrap()).unwrap();
    assert!(vars.remove_all().is_empty());
    assert_eq!(vars.coverage(), None);

    let filter = Filter::builder()
        .vars(["h_li"])
        .beams(["gt1l"])
        .build()
        .unwrap();
    vars.append(&filter).unwrap();
    assert_eq!(
        vars.coverage().as_deref(),
        Some("/gt1l/land_ice_segments/h_li")
    );
}

#[test]
fn test_coverage_lists_every_wanted_path() {
    let vars = atl06();
    let coverage = vars.coverage().unwrap();
    assert_eq!(coverage.split(',').count(), 9);
    assert!(coverage.split(',').all(|p| p.starts_with('/')));
}

#[test]
fn test_wanted_grouped() {
    let mut vars = atl06();
    vars.append(&Filter::vars(["latitude"]).unwrap()).unwrap();
    let grouped = vars.wanted_grouped();
    assert_eq!(grouped["latitude"].len(), 6);
    assert_eq!(grouped["sc_orient"], vec!["orbit_info/sc_orient"]);
}

// ============================================================================
// Atmospheric profiles
// ============================================================================

#[test]
fn test_atl09_profiles() {
    let mut vars = populated("ATL09", CatalogMode::Order, atl09_catalog());
    let options = vars.avail_options().unwrap();
    assert_eq!(
        options.beams.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["profile_1", "profile_2", "profile_3"]
    );

    let mandatory = vars.mandatory().len();
    let filter = Filter::builder()
        .vars(["latitude"])
        .beams(["profile_2"])
        .build()
        .unwrap();
    let wanted = vars.append(&filter).unwrap();
    assert!(wanted.contains("profile_2/high_rate/latitude"));
    assert_eq!(wanted.len(), mandatory + 1);
}

// ============================================================================
// h5ls listings
// ============================================================================

#[test]
fn test_h5ls_listing_matches_catalog() {
    let catalog = atl06_catalog();
    let parsed = parse_h5ls_listing(&h5ls_listing(&catalog));
    assert_eq!(parsed, catalog);
}

#[test]
fn test_h5ls_real_granule() {
    require_program!("h5ls");
    let path = require_granule!("ATL06_20190222031203_08500210_006_02.h5");

    let source = H5lsCatalog::new(path);
    let paths = tokio_test::block_on(source.list_paths()).unwrap();
    assert!(paths.iter().any(|p| p.ends_with("land_ice_segments/h_li")));
}
