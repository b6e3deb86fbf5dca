use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const WIRE_PREFIX: &str = "SRID=4326;POINT(";
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate.
///
/// On the wire this is the extended well-known text form the backend stores,
/// `SRID=4326;POINT(lng lat)`. Note that the text form puts longitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Error)]
#[error("malformed geo point: {0}")]
pub struct InvalidGeoPoint(String);

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another point, in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat_a = self.lat.to_radians();
        let lat_b = other.lat.to_radians();
        let half_delta_lat = (other.lat - self.lat).to_radians() / 2.;
        let half_delta_lng = (other.lng - self.lng).to_radians() / 2.;

        let a = half_delta_lat.sin().powi(2)
            + lat_a.cos() * lat_b.cos() * half_delta_lng.sin().powi(2);

        2. * EARTH_RADIUS_KM * a.sqrt().atan2((1. - a).sqrt())
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {})", WIRE_PREFIX, self.lng, self.lat)
    }
}

impl FromStr for GeoPoint {
    type Err = InvalidGeoPoint;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let inner = value
            .strip_prefix(WIRE_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| InvalidGeoPoint(value.to_string()))?;

        let mut parts = inner.split_whitespace();
        let lng = parts.next().and_then(|p| p.parse().ok());
        let lat = parts.next().and_then(|p| p.parse().ok());

        match (lng, lat, parts.next()) {
            (Some(lng), Some(lat), None) => Ok(Self { lat, lng }),
            _ => Err(InvalidGeoPoint(value.to_string())),
        }
    }
}

impl Serialize for GeoPoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let point = GeoPoint::new(52.52, 13.405);
        let encoded = point.to_string();

        assert_eq!(encoded, "SRID=4326;POINT(13.405 52.52)");
        assert_eq!(encoded.parse::<GeoPoint>().unwrap(), point);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!("POINT(13.405 52.52)".parse::<GeoPoint>().is_err());
        assert!("SRID=4326;POINT(13.405)".parse::<GeoPoint>().is_err());
        assert!("SRID=4326;POINT(a b)".parse::<GeoPoint>().is_err());
        assert!("SRID=4326;POINT(1 2 3)".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn test_distance() {
        let berlin = GeoPoint::new(52.52, 13.405);
        let hamburg = GeoPoint::new(53.5511, 9.9937);

        let distance = berlin.distance_km(&hamburg);
        assert!(
            (distance - 255.).abs() < 5.,
            "Berlin to Hamburg should be roughly 255km, got {}",
            distance
        );

        assert!(berlin.distance_km(&berlin) < f64::EPSILON);
    }
}
