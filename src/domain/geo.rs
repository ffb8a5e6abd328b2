//! Coordinates and bounding boxes in degrees

use serde::{Deserialize, Serialize};

/// Mean earth radius used by the haversine formula (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Parses a `lat`/`lon` attribute pair.
    ///
    /// Returns `None` unless both values are present and parse as finite numbers.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Option<Self> {
        let lat = parse_finite(lat?)?;
        let lon = parse_finite(lon?)?;
        Some(Self { lat, lon })
    }

    /// Great-circle distance in meters
    pub fn haversine_m(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sum of haversine distances between consecutive points
pub fn path_length_m(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| w[0].haversine_m(&w[1])).sum()
}

/// Axis-aligned lat/lon box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coordinate>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = *iter.next()?;
        let mut bounds = Bounds {
            south_west: first,
            north_east: first,
        };
        for c in iter {
            bounds.extend(c);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, c: &Coordinate) {
        self.south_west.lat = self.south_west.lat.min(c.lat);
        self.south_west.lon = self.south_west.lon.min(c.lon);
        self.north_east.lat = self.north_east.lat.max(c.lat);
        self.north_east.lon = self.north_east.lon.max(c.lon);
    }

    /// Grows every side by `ratio` of the span on that axis.
    pub fn pad(&self, ratio: f64) -> Self {
        let lat_buf = (self.north_east.lat - self.south_west.lat).abs() * ratio;
        let lon_buf = (self.north_east.lon - self.south_west.lon).abs() * ratio;
        Bounds {
            south_west: Coordinate::new(self.south_west.lat - lat_buf, self.south_west.lon - lon_buf),
            north_east: Coordinate::new(self.north_east.lat + lat_buf, self.north_east.lon + lon_buf),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, c: &Coordinate) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&c.lat)
            && (self.south_west.lon..=self.north_east.lon).contains(&c.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{a} != {b} (eps {eps})");
    }

    #[test]
    fn test_parse_rejects_missing_and_non_finite() {
        assert_eq!(
            Coordinate::parse(Some("1.5"), Some(" -2 ")),
            Some(Coordinate::new(1.5, -2.0))
        );
        assert_eq!(Coordinate::parse(None, Some("1")), None);
        assert_eq!(Coordinate::parse(Some("abc"), Some("1")), None);
        assert_eq!(Coordinate::parse(Some("NaN"), Some("1")), None);
        assert_eq!(Coordinate::parse(Some("1"), Some("inf")), None);
    }

    #[test]
    fn test_bounds_include_all_points() {
        let pts = [
            Coordinate::new(1.0, 1.0),
            Coordinate::new(3.0, 2.0),
            Coordinate::new(2.0, 3.0),
        ];
        let b = Bounds::from_coords(&pts).unwrap();
        assert_eq!(b.south_west, Coordinate::new(1.0, 1.0));
        assert_eq!(b.north_east, Coordinate::new(3.0, 3.0));
        assert!(pts.iter().all(|p| b.contains(p)));
    }

    #[test]
    fn test_bounds_of_nothing() {
        assert!(Bounds::from_coords(&[] as &[Coordinate]).is_none());
    }

    #[test]
    fn test_pad_grows_by_ratio_of_span() {
        let b = Bounds::from_coords(&[Coordinate::new(0.0, 0.0), Coordinate::new(10.0, 20.0)])
            .unwrap()
            .pad(0.1);
        assert_close(b.south_west.lat, -1.0, 1e-9);
        assert_close(b.south_west.lon, -2.0, 1e-9);
        assert_close(b.north_east.lat, 11.0, 1e-9);
        assert_close(b.north_east.lon, 22.0, 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = Coordinate::new(0.0, 0.0).haversine_m(&Coordinate::new(1.0, 0.0));
        assert_close(d, 111_195.0, 5.0);
    }

    #[test]
    fn test_path_length_of_single_point_is_zero() {
        assert_eq!(path_length_m(&[Coordinate::new(1.0, 1.0)]), 0.0);
    }
}
