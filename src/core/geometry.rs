use crate::types::{BurstError, BurstFootprint, BurstResult, GroundControlTable};

/// Build the ground footprint of burst `index` from the raster GCP table
///
/// The top edge is the GCP row at line `index * lines_per_burst`, the bottom
/// edge the row at `(index + 1) * lines_per_burst`. The ring walks the top
/// edge in stored order and the bottom edge reversed.
pub fn build_footprint(
    table: &GroundControlTable,
    lines_per_burst: u32,
    index: usize,
) -> BurstResult<BurstFootprint> {
    let top_line = index as u64 * lines_per_burst as u64;
    let bottom_line = (index as u64 + 1) * lines_per_burst as u64;

    let top: Vec<(f64, f64)> = table
        .points_on_line(top_line)
        .map(|p| (p.longitude, p.latitude))
        .collect();
    if top.is_empty() {
        return Err(BurstError::InsufficientControlPoints { burst: index, line: top_line });
    }

    let bottom: Vec<(f64, f64)> = table
        .points_on_line(bottom_line)
        .map(|p| (p.longitude, p.latitude))
        .collect();
    if bottom.is_empty() {
        return Err(BurstError::InsufficientControlPoints { burst: index, line: bottom_line });
    }

    let mut ring = top;
    ring.extend(bottom.into_iter().rev());

    let centroid = polygon_centroid(&ring);
    log::debug!(
        "Burst {} footprint: {} vertices, centroid ({:.5}, {:.5})",
        index, ring.len(), centroid.0, centroid.1
    );

    Ok(BurstFootprint { ring, centroid })
}

/// Area-weighted centroid of a ring (closing vertex implicit)
///
/// A ring with zero area has no area centroid; the vertex mean is used. This
/// is not the length-weighted line centroid, so unevenly spaced collinear
/// points give a different point than a GIS library would.
pub fn polygon_centroid(ring: &[(f64, f64)]) -> (f64, f64) {
    if ring.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    // Shift to the first vertex to keep the cross products well conditioned
    let (x0, y0) = ring[0];
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for i in 0..ring.len() {
        let (xa, ya) = (ring[i].0 - x0, ring[i].1 - y0);
        let next = ring[(i + 1) % ring.len()];
        let (xb, yb) = (next.0 - x0, next.1 - y0);

        let cross = xa * yb - xb * ya;
        twice_area += cross;
        cx += (xa + xb) * cross;
        cy += (ya + yb) * cross;
    }

    if twice_area.abs() <= f64::EPSILON * ring_scale(ring) {
        let n = ring.len() as f64;
        let sx: f64 = ring.iter().map(|p| p.0).sum();
        let sy: f64 = ring.iter().map(|p| p.1).sum();
        return (sx / n, sy / n);
    }

    (x0 + cx / (3.0 * twice_area), y0 + cy / (3.0 * twice_area))
}

fn ring_scale(ring: &[(f64, f64)]) -> f64 {
    let (x0, y0) = ring[0];
    let extent = ring
        .iter()
        .map(|p| (p.0 - x0).abs().max((p.1 - y0).abs()))
        .fold(0.0, f64::max);
    (extent * extent).max(f64::MIN_POSITIVE)
}

/// Well-known-text rendering of a footprint, ring closed explicitly
pub fn to_wkt(footprint: &BurstFootprint) -> String {
    let mut coords: Vec<String> = footprint
        .ring
        .iter()
        .map(|(x, y)| format!("{} {}", x, y))
        .collect();
    if let Some(first) = coords.first().cloned() {
        coords.push(first);
    }
    format!("POLYGON (({}))", coords.join(", "))
}

/// Parse a WKT POLYGON back into a ring, dropping the closing vertex
///
/// Only the exterior ring is read; the centroid is recomputed.
pub fn from_wkt(wkt: &str) -> BurstResult<BurstFootprint> {
    let invalid = |reason: &str| BurstError::InvalidInput(format!("Invalid WKT polygon ({}): '{}'", reason, wkt));

    let body = wkt.trim();
    if !body.to_uppercase().starts_with("POLYGON") {
        return Err(invalid("expected POLYGON"));
    }
    let body = body["POLYGON".len()..].trim();
    let body = body
        .strip_prefix('(')
        .and_then(|b| b.strip_suffix(')'))
        .ok_or_else(|| invalid("missing outer parentheses"))?
        .trim();
    let exterior = body
        .strip_prefix('(')
        .and_then(|b| b.split(')').next())
        .ok_or_else(|| invalid("missing ring parentheses"))?;

    let mut ring = exterior
        .split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(invalid("expected 'lon lat' pairs"));
            }
            let lon: f64 = parts[0].parse().map_err(|_| invalid("bad coordinate"))?;
            let lat: f64 = parts[1].parse().map_err(|_| invalid("bad coordinate"))?;
            Ok((lon, lat))
        })
        .collect::<BurstResult<Vec<(f64, f64)>>>()?;

    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.is_empty() {
        return Err(invalid("empty ring"));
    }

    let centroid = polygon_centroid(&ring);
    Ok(BurstFootprint { ring, centroid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroundControlPoint;
    use approx::assert_relative_eq;

    fn gcp(line: u64, lon: f64, lat: f64) -> GroundControlPoint {
        GroundControlPoint { line, pixel: 0.0, longitude: lon, latitude: lat }
    }

    fn table(points: Vec<GroundControlPoint>) -> GroundControlTable {
        GroundControlTable { raster_path: "measurement/test.tiff".to_string(), points }
    }

    #[test]
    fn test_unit_square_footprint() {
        let gcps = table(vec![
            gcp(0, 0.0, 0.0),
            gcp(0, 1.0, 0.0),
            gcp(100, 0.0, 1.0),
            gcp(100, 1.0, 1.0),
        ]);

        let footprint = build_footprint(&gcps, 100, 0).unwrap();
        assert_eq!(footprint.ring, vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert_relative_eq!(footprint.centroid.0, 0.5, epsilon = 1e-12);
        assert_relative_eq!(footprint.centroid.1, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_second_burst_uses_shifted_edges() {
        let gcps = table(vec![
            gcp(0, 10.0, 40.0),
            gcp(0, 11.0, 40.1),
            gcp(100, 10.0, 40.5),
            gcp(100, 11.0, 40.6),
            gcp(100, 12.0, 40.7),
            gcp(200, 10.0, 41.0),
            gcp(200, 11.0, 41.1),
            gcp(200, 12.0, 41.2),
        ]);

        let footprint = build_footprint(&gcps, 100, 1).unwrap();
        assert_eq!(footprint.ring.len(), 6);
        assert_eq!(footprint.ring[0], (10.0, 40.5));
        assert_eq!(footprint.ring[2], (12.0, 40.7));
        assert_eq!(footprint.ring[3], (12.0, 41.2));
        assert_eq!(footprint.ring[5], (10.0, 41.0));
    }

    #[test]
    fn test_missing_edge_is_reported() {
        let gcps = table(vec![gcp(0, 0.0, 0.0), gcp(0, 1.0, 0.0)]);

        match build_footprint(&gcps, 100, 0) {
            Err(BurstError::InsufficientControlPoints { burst, line }) => {
                assert_eq!(burst, 0);
                assert_eq!(line, 100);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_ring_is_accepted() {
        let gcps = table(vec![gcp(0, 2.0, 2.0), gcp(100, 2.0, 2.0)]);

        let footprint = build_footprint(&gcps, 100, 0).unwrap();
        assert_eq!(footprint.ring.len(), 2);
        assert_relative_eq!(footprint.centroid.0, 2.0);
        assert_relative_eq!(footprint.centroid.1, 2.0);
    }

    #[test]
    fn test_wkt_closes_ring_and_parses_back() {
        let footprint = BurstFootprint {
            ring: vec![(0.0, 0.0), (1.5, 0.0), (1.5, 1.0), (0.0, 1.0)],
            centroid: (0.75, 0.5),
        };

        let wkt = to_wkt(&footprint);
        assert_eq!(wkt, "POLYGON ((0 0, 1.5 0, 1.5 1, 0 1, 0 0))");

        let parsed = from_wkt(&wkt).unwrap();
        assert_eq!(parsed.ring, footprint.ring);
        assert_relative_eq!(parsed.centroid.0, 0.75, epsilon = 1e-12);

        assert!(from_wkt("POINT (1 2)").is_err());
        assert!(from_wkt("POLYGON ((1 2, x 3))").is_err());
    }
}
