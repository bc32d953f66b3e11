//! ICESat-2 product registry.
//!
//! Product identifiers, version formatting, beam naming, and the canned
//! variable lists (default and mandatory) that each product carries.

use serde::{Deserialize, Serialize};

use crate::error::{Is2Error, Is2Result};

/// All ICESat-2 data products that can be searched and ordered.
const PRODUCTS: &[&str] = &[
    "ATL01", "ATL02", "ATL03", "ATL04", "ATL06", "ATL07", "ATL07QL", "ATL08", "ATL09",
    "ATL09QL", "ATL10", "ATL11", "ATL12", "ATL13", "ATL14", "ATL15", "ATL16", "ATL17",
    "ATL19", "ATL20", "ATL21", "ATL23",
];

/// Gridded (Level 3B) products; these have no beam groups.
const GRIDDED: &[&str] = &[
    "ATL14", "ATL15", "ATL16", "ATL17", "ATL18", "ATL19", "ATL20", "ATL21",
];

const COMMON_VARIABLES: &[&str] = &["delta_time", "latitude", "longitude"];

/// Where a variable catalog comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Listing published by the ordering service for subsetting.
    Order,
    /// Listing read from a local granule file.
    File,
}

impl std::fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogMode::Order => write!(f, "order"),
            CatalogMode::File => write!(f, "file"),
        }
    }
}

/// Spacecraft orientation flag (`orbit_info/sc_orient`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScOrient {
    Backward,
    Forward,
    Transition,
}

impl ScOrient {
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(ScOrient::Backward),
            1 => Some(ScOrient::Forward),
            2 => Some(ScOrient::Transition),
            _ => None,
        }
    }
}

/// A validated ICESat-2 product short name (e.g. "ATL06").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Product(String);

impl Product {
    /// Validate a product name, accepting any letter case.
    pub fn parse(name: &str) -> Is2Result<Self> {
        let upper = name.trim().to_uppercase();
        if PRODUCTS.contains(&upper.as_str()) {
            Ok(Self(upper))
        } else {
            Err(Is2Error::InvalidProduct(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_gridded(&self) -> bool {
        GRIDDED.contains(&self.0.as_str())
    }

    /// Beam (or atmospheric profile) group names used by this product.
    pub fn beams(&self) -> Vec<String> {
        if self.0.starts_with("ATL09") {
            (1..=3).map(|i| format!("profile_{}", i)).collect()
        } else if self.is_gridded() {
            Vec::new()
        } else {
            ["l", "r"]
                .iter()
                .flat_map(|side| (1..=3).map(move |i| format!("gt{}{}", i, side)))
                .collect()
        }
    }

    /// Canned list of commonly used variable names for this product.
    ///
    /// Returns `None` when no list has been curated for the product.
    pub fn default_variables(&self) -> Option<Vec<&'static str>> {
        let extra: &[&str] = match self.0.as_str() {
            "ATL03" => &["h_ph", "quality_ph", "signal_conf_ph"],
            "ATL06" => &[
                "h_li",
                "h_li_sigma",
                "atl06_quality_summary",
                "segment_id",
                "sigma_geo_h",
                "x_atc",
                "y_atc",
                "seg_azimuth",
                "sigma_geo_at",
                "sigma_geo_xt",
                "dh_fit_dx",
                "dh_fit_dx_sigma",
                "h_mean",
                "dh_fit_dy",
                "h_rms_misfit",
                "h_robust_sprd",
                "n_fit_photons",
                "signal_selection_source",
                "snr_significance",
                "w_surface_window_final",
                "bsnow_conf",
                "bsnow_h",
                "cloud_flg_asr",
                "cloud_flg_atm",
                "r_eff",
                "tide_ocean",
            ],
            "ATL07" => &[
                "seg_dist_x",
                "height_segment_height",
                "height_segment_length_seg",
                "height_segment_ssh_flag",
                "height_segment_type",
                "height_segment_quality",
                "height_segment_confidence",
            ],
            "ATL09" => &[
                "bsnow_h",
                "bsnow_dens",
                "bsnow_con",
                "bsnow_psc",
                "bsnow_od",
                "cloud_flag_asr",
                "cloud_fold_flag",
                "cloud_flag_atm",
                "column_od_asr",
                "column_od_asr_qf",
                "layer_attr",
                "layer_bot",
                "layer_top",
                "layer_flag",
                "msw_flag",
                "prof_dist_x",
                "prof_dist_y",
                "apparent_surf_reflec",
            ],
            "ATL10" => &[
                "seg_dist_x",
                "lead_height",
                "lead_length",
                "beam_fb_height",
                "beam_fb_length",
                "beam_fb_confidence",
                "beam_fb_quality_flag",
                "height_segment_height",
                "height_segment_length_seg",
                "height_segment_ssh_flag",
                "height_segment_type",
                "height_segment_confidence",
            ],
            "ATL11" => &[
                "h_corr",
                "h_corr_sigma",
                "h_corr_sigma_systematic",
                "quality_summary",
            ],
            "ATL12" => &["h", "h_uncrtn", "swh", "seg_dist_x"],
            "ATL13" => &["ht_water_surf", "stdev_water_surf", "water_depth"],
            _ => return None,
        };

        Some(COMMON_VARIABLES.iter().chain(extra).copied().collect())
    }

    /// Variable names that must accompany any request so the rest of the
    /// data can be interpreted (time reference and spacecraft orientation).
    pub fn mandatory_variables(&self, mode: CatalogMode) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = match mode {
            CatalogMode::Order => vec![
                "sc_orient",
                "sc_orient_time",
                "atlas_sdp_gps_epoch",
                "data_start_utc",
                "data_end_utc",
                "granule_start_utc",
                "granule_end_utc",
                "start_delta_time",
                "end_delta_time",
            ],
            CatalogMode::File => vec![
                "sc_orient",
                "atlas_sdp_gps_epoch",
                "cycle_number",
                "rgt",
                "data_start_utc",
                "data_end_utc",
            ],
        };
        // ATL11 is an along-track product with no orientation group.
        if self.0 == "ATL11" {
            names.retain(|n| *n != "sc_orient");
        }
        names
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Product {
    type Err = Is2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::parse(s)
    }
}

impl TryFrom<String> for Product {
    type Error = Is2Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Product::parse(&value)
    }
}

impl From<Product> for String {
    fn from(value: Product) -> Self {
        value.0
    }
}

/// Zero-pad a product version to the three digits the archive expects ("6" -> "006").
pub fn format_version(version: &str) -> Is2Result<String> {
    let trimmed = version.trim();
    let number: u32 = trimmed
        .parse()
        .map_err(|_| Is2Error::InvalidVersion(version.to_string()))?;
    if number == 0 || number > 999 {
        return Err(Is2Error::InvalidVersion(version.to_string()));
    }
    Ok(format!("{:03}", number))
}

/// Map a ground track (e.g. "gt1l") to its ATLAS spot number for the
/// given spacecraft orientation.
///
/// Returns `Ok(None)` during orientation transitions, when spots are undefined.
pub fn gt_to_spot(gt: &str, orient: ScOrient) -> Is2Result<Option<u8>> {
    let bytes = gt.as_bytes();
    let valid = bytes.len() == 4
        && gt.starts_with("gt")
        && (b'1'..=b'3').contains(&bytes[2])
        && (bytes[3] == b'l' || bytes[3] == b'r');
    if !valid {
        return Err(Is2Error::InvalidGroundTrack(gt.to_string()));
    }

    let pair = bytes[2] - b'0';
    let left = bytes[3] == b'l';

    let spot = match orient {
        ScOrient::Forward => {
            let base = 7 - 2 * pair;
            if left {
                base + 1
            } else {
                base
            }
        }
        ScOrient::Backward => {
            let base = 2 * pair - 1;
            if left {
                base
            } else {
                base + 1
            }
        }
        ScOrient::Transition => return Ok(None),
    };
    Ok(Some(spot))
}
