//! Slash-delimited variable paths.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Segment delimiter within a variable path.
pub const DELIMITER: char = '/';

/// Placeholder used by [`parse_tiered`] where a path is shallower than the deepest one.
pub const TIER_PLACEHOLDER: &str = "none";

fn beam_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(gt[1-3][lr]|profile_[1-3])$").expect("beam pattern is a valid regex")
    })
}

/// Whether a keyword segment names a beam (`gt1l`..`gt3r`) or an atmospheric
/// profile (`profile_1`..`profile_3`).
pub fn is_beam(segment: &str) -> bool {
    beam_pattern().is_match(segment)
}

/// Split a path into its group path and variable name.
///
/// `"gt1l/land_ice_segments/h_li"` -> `(Some("gt1l/land_ice_segments"), "h_li")`
pub fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once(DELIMITER) {
        Some((group, name)) => (Some(group), name),
        None => (None, path),
    }
}

/// The variable name (final segment) of a path.
pub fn variable_name(path: &str) -> &str {
    split_path(path).1
}

/// The keyword segments (all but the final segment) of a path.
pub fn keywords(path: &str) -> impl Iterator<Item = &str> {
    let group = split_path(path).0.unwrap_or("");
    group.split(DELIMITER).filter(|s| !s.is_empty())
}

/// Group paths by variable name.
///
/// Each variable name maps to the full paths that end in it, in input order.
pub fn parse<S: AsRef<str>>(paths: &[S]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths {
        let path = path.as_ref();
        grouped
            .entry(variable_name(path).to_string())
            .or_default()
            .push(path.to_string());
    }
    grouped
}

/// Split the group paths into tiers, one vector per depth.
///
/// Tier `i` holds the `i`-th group segment of every path that has a group;
/// shallower paths are padded with `"none"`. With `with_names`, the
/// variable names are appended as one more tier.
pub fn parse_tiered<S: AsRef<str>>(paths: &[S], with_names: bool) -> Vec<Vec<String>> {
    let depth = paths
        .iter()
        .map(|p| p.as_ref().matches(DELIMITER).count())
        .max()
        .unwrap_or(0);

    let mut tiers: Vec<Vec<String>> = vec![Vec::new(); depth];
    let mut names = Vec::new();

    for path in paths {
        let (group, name) = split_path(path.as_ref());
        let Some(group) = group else { continue };

        let segments: Vec<&str> = group.split(DELIMITER).collect();
        for (i, tier) in tiers.iter_mut().enumerate() {
            let segment = segments.get(i).copied().unwrap_or(TIER_PLACEHOLDER);
            tier.push(segment.to_string());
        }
        names.push(name.to_string());
    }

    if with_names {
        tiers.push(names);
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("gt1l/land_ice_segments/h_li"),
            (Some("gt1l/land_ice_segments"), "h_li")
        );
        assert_eq!(split_path("h_li"), (None, "h_li"));
    }

    #[test]
    fn test_keywords() {
        let kws: Vec<&str> = keywords("gt1l/land_ice_segments/fit_statistics/h_mean").collect();
        assert_eq!(kws, vec!["gt1l", "land_ice_segments", "fit_statistics"]);
        assert_eq!(keywords("h_li").count(), 0);
    }

    #[test]
    fn test_is_beam() {
        assert!(is_beam("gt1l"));
        assert!(is_beam("gt3r"));
        assert!(is_beam("profile_2"));
        assert!(!is_beam("gt4l"));
        assert!(!is_beam("land_ice_segments"));
        assert!(!is_beam("xgt1l"));
    }

    #[test]
    fn test_parse_groups_by_name() {
        let paths = [
            "gt1l/land_ice_segments/latitude",
            "orbit_info/sc_orient",
            "gt2l/land_ice_segments/latitude",
        ];
        let grouped = parse(&paths);
        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped["latitude"],
            vec![
                "gt1l/land_ice_segments/latitude",
                "gt2l/land_ice_segments/latitude"
            ]
        );
        assert_eq!(grouped["sc_orient"], vec!["orbit_info/sc_orient"]);
    }

    #[test]
    fn test_parse_tiered_pads_short_paths() {
        let paths = [
            "orbit_info/sc_orient",
            "gt1l/land_ice_segments/h_li",
            "ancillary_data/atlas_sdp_gps_epoch",
        ];
        let tiers = parse_tiered(&paths, false);
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0], vec!["orbit_info", "gt1l", "ancillary_data"]);
        assert_eq!(tiers[1], vec!["none", "land_ice_segments", "none"]);

        let with_names = parse_tiered(&paths, true);
        assert_eq!(with_names.len(), 3);
        assert_eq!(with_names[2], vec!["sc_orient", "h_li", "atlas_sdp_gps_epoch"]);
    }
}
