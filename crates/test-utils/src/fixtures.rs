//! Canned service responses for testing.
//!
//! These mirror the documents the NSIDC ordering service returns, trimmed
//! to what the client reads.

/// Capabilities document for ATL06 v006.
///
/// Variables are nested `SubsetVariable` groups; one leaf uses the
/// colon-delimited form older documents carry.
pub const ATL06_CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://eosdis.nasa.gov/esi/rsp/c" dataset="ATL06.006">
  <SubsetAgent id="ICESAT2" spatialSubsetting="true" temporalSubsetting="true" maxGransAsyncRequest="2000">
    <SubsetVariable id="/" value="/" label="ATL06">
      <SubsetVariable id="/ancillary_data" value="/ancillary_data">
        <SubsetVariable id="/ancillary_data/atlas_sdp_gps_epoch" value="/ancillary_data/atlas_sdp_gps_epoch"/>
        <SubsetVariable id="/ancillary_data/data_end_utc" value="/ancillary_data/data_end_utc"/>
        <SubsetVariable id="/ancillary_data/data_start_utc" value="/ancillary_data/data_start_utc"/>
        <SubsetVariable id="/ancillary_data/end_delta_time" value="/ancillary_data/end_delta_time"/>
        <SubsetVariable id="/ancillary_data/granule_end_utc" value="/ancillary_data/granule_end_utc"/>
        <SubsetVariable id="/ancillary_data/granule_start_utc" value="/ancillary_data/granule_start_utc"/>
        <SubsetVariable id="/ancillary_data/start_delta_time" value="/ancillary_data/start_delta_time"/>
      </SubsetVariable>
      <SubsetVariable id="/orbit_info" value="/orbit_info">
        <SubsetVariable id="/orbit_info/sc_orient" value="/orbit_info/sc_orient"/>
        <SubsetVariable id="/orbit_info/sc_orient_time" value="orbit_info:sc_orient_time"/>
      </SubsetVariable>
      <SubsetVariable id="/gt1l" value="/gt1l">
        <SubsetVariable id="/gt1l/land_ice_segments" value="/gt1l/land_ice_segments">
          <SubsetVariable id="/gt1l/land_ice_segments/h_li" value="/gt1l/land_ice_segments/h_li"/>
          <SubsetVariable id="/gt1l/land_ice_segments/latitude" value="/gt1l/land_ice_segments/latitude"/>
          <SubsetVariable id="/gt1l/land_ice_segments/longitude" value="/gt1l/land_ice_segments/longitude"/>
          <SubsetVariable id="/gt1l/land_ice_segments/fit_statistics" value="/gt1l/land_ice_segments/fit_statistics">
            <SubsetVariable id="/gt1l/land_ice_segments/fit_statistics/h_mean" value="/gt1l/land_ice_segments/fit_statistics/h_mean"></SubsetVariable>
          </SubsetVariable>
        </SubsetVariable>
      </SubsetVariable>
      <SubsetVariable id="/gt2r" value="/gt2r">
        <SubsetVariable id="/gt2r/land_ice_segments" value="/gt2r/land_ice_segments">
          <SubsetVariable id="/gt2r/land_ice_segments/h_li" value="/gt2r/land_ice_segments/h_li"/>
          <SubsetVariable id="/gt2r/land_ice_segments/latitude" value="/gt2r/land_ice_segments/latitude"/>
          <SubsetVariable id="/gt2r/land_ice_segments/longitude" value="/gt2r/land_ice_segments/longitude"/>
        </SubsetVariable>
      </SubsetVariable>
    </SubsetVariable>
    <Format value="" label="No reformatting"/>
    <Format value="TABULAR_ASCII" label="ASCII"/>
    <Format value="NetCDF4-CF" label="NetCDF4-CF"/>
    <Projection value="NO_CHANGE" label="No change"/>
    <Projection value="GEOGRAPHIC" label="Geographic"/>
    <Projection value="POLAR_STEREOGRAPHIC" label="Polar stereographic"/>
  </SubsetAgent>
  <SubsetAgent id="NO" label="No processing"/>
</Capabilities>
"#;

/// Number of leaf variables in [`ATL06_CAPABILITIES`].
pub const ATL06_CAPABILITIES_LEAVES: usize = 16;

/// Order submission response carrying `order_id`.
pub fn order_response(order_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eesi:agentResponse xmlns:eesi="http://eosdis.nasa.gov/esi/rsp/e">
  <order>
    <orderId>{}</orderId>
    <Instructions>You may use the status URL to check on the order.</Instructions>
  </order>
  <contactInformation>
    <contactName>NSIDC User Services</contactName>
  </contactInformation>
</eesi:agentResponse>
"#,
        order_id
    )
}

/// Order status response.
///
/// `info` messages land under `processInfo/info`, as the service reports
/// them for completed orders.
pub fn status_response(status: &str, info: &[&str]) -> String {
    let messages: String = info
        .iter()
        .map(|m| format!("    <info>{}</info>\n", m))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eesi:agentResponse xmlns:eesi="http://eosdis.nasa.gov/esi/rsp/e">
  <requestStatus>
    <status>{}</status>
    <numberProcessed>1</numberProcessed>
    <totalNumber>1</totalNumber>
  </requestStatus>
  <processInfo>
    <processCompletionTime>2024-03-01T12:00:00Z</processCompletionTime>
{}  </processInfo>
</eesi:agentResponse>
"#,
        status, messages
    )
}

/// CMR error body, as returned with a 400 status.
pub fn cmr_error(message: &str) -> String {
    serde_json::json!({ "errors": [message] }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_count_matches_document() {
        let leaves = ATL06_CAPABILITIES
            .lines()
            .filter(|l| {
                l.contains("<SubsetVariable") && (l.trim_end().ends_with("/>") || l.contains("</SubsetVariable>"))
            })
            .count();
        assert_eq!(leaves, ATL06_CAPABILITIES_LEAVES);
    }

    #[test]
    fn test_order_response_contains_id() {
        assert!(order_response("5000000000001").contains("<orderId>5000000000001</orderId>"));
    }

    #[test]
    fn test_status_response_messages() {
        let xml = status_response("complete", &["granule subset", "done"]);
        assert!(xml.contains("<status>complete</status>"));
        assert_eq!(xml.matches("<info>").count(), 2);
    }
}
