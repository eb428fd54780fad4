use gdal::spatial_ref::SpatialRef;
use log::{debug, warn};

/// One-line description of a projection WKT for reports.
pub fn describe_projection(projection_wkt: &str) -> String {
    if projection_wkt.is_empty() {
        return "none".to_string();
    }

    let spatial_ref = match SpatialRef::from_wkt(projection_wkt) {
        Ok(sr) => sr,
        Err(e) => {
            debug!("Failed to parse projection WKT: {}", e);
            return "unparseable WKT".to_string();
        }
    };

    let name = spatial_ref.name().unwrap_or_else(|_| "unnamed".to_string());
    let code = match (spatial_ref.auth_name(), spatial_ref.auth_code()) {
        (Ok(auth), Ok(code)) => format!(" [{}:{}]", auth, code),
        _ => String::new(),
    };

    if spatial_ref.is_geographic() {
        format!("{}{} (geographic)", name, code)
    } else if spatial_ref.is_projected() {
        format!(
            "{}{} (projected, linear units {:.4})",
            name,
            code,
            spatial_ref.linear_units()
        )
    } else {
        format!("{}{}", name, code)
    }
}

/// Whether points in `sites_srs` can be mapped onto a raster in
/// `raster_wkt` without reprojection. Unknown references are assumed to match.
pub fn same_crs(raster_wkt: &str, sites_srs: Option<&SpatialRef>) -> bool {
    let Some(sites_srs) = sites_srs else {
        debug!("Sites carry no spatial reference, assuming raster CRS");
        return true;
    };
    if raster_wkt.is_empty() {
        debug!("Raster has no projection, assuming sites match");
        return true;
    }

    match SpatialRef::from_wkt(raster_wkt) {
        Ok(raster_srs) => {
            let same = raster_srs == *sites_srs;
            if !same {
                warn!(
                    "Sites CRS ({}) differs from raster CRS ({}); offsets will be wrong without reprojection",
                    sites_srs.name().unwrap_or_default(),
                    raster_srs.name().unwrap_or_default()
                );
            }
            same
        }
        Err(e) => {
            warn!("Failed to parse raster projection WKT: {}", e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_empty_projection() {
        assert_eq!(describe_projection(""), "none");
    }

    #[test]
    fn test_describe_utm() {
        let utm = SpatialRef::from_epsg(32612).unwrap().to_wkt().unwrap();
        let description = describe_projection(&utm);
        assert!(description.contains("projected"), "{}", description);
        assert!(description.contains("32612"), "{}", description);
    }

    #[test]
    fn test_describe_geographic() {
        let wgs84 = SpatialRef::from_epsg(4326).unwrap().to_wkt().unwrap();
        assert!(describe_projection(&wgs84).contains("geographic"));
    }

    #[test]
    fn test_same_crs() {
        let utm = SpatialRef::from_epsg(32612).unwrap();
        let wgs84 = SpatialRef::from_epsg(4326).unwrap();
        let utm_wkt = utm.to_wkt().unwrap();

        assert!(same_crs(&utm_wkt, Some(&utm)));
        assert!(!same_crs(&utm_wkt, Some(&wgs84)));
        assert!(same_crs(&utm_wkt, None));
        assert!(same_crs("", Some(&wgs84)));
    }
}
