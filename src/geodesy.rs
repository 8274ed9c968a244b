//! Great-circle calculations on a spherical Earth.

use crate::domain::Coordinates;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

const EARTH_RADIUS_STATUTE_MILES: f64 = 3958.8;
const EARTH_RADIUS_NAUTICAL_MILES: f64 = 3440.065;
const EARTH_RADIUS_KILOMETERS: f64 = 6371.0;

/// Below this the points are a few micrometres apart and the bearing is rounding noise.
const COINCIDENT_HAVERSINE_TERM: f64 = 1e-24;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceUnit {
    #[default]
    Statute,
    Nautical,
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Statute => EARTH_RADIUS_STATUTE_MILES,
            DistanceUnit::Nautical => EARTH_RADIUS_NAUTICAL_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KILOMETERS,
        }
    }
}

impl Display for DistanceUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceUnit::Statute => write!(f, "statute"),
            DistanceUnit::Nautical => write!(f, "nautical"),
            DistanceUnit::Kilometers => write!(f, "kilometers"),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = UnknownDistanceUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "statute" | "mi" | "miles" => Ok(DistanceUnit::Statute),
            "nautical" | "nmi" => Ok(DistanceUnit::Nautical),
            "kilometers" | "km" => Ok(DistanceUnit::Kilometers),
            _ => Err(UnknownDistanceUnit(s.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("unknown distance unit '{0}', expected one of statute, nautical, kilometers")]
pub struct UnknownDistanceUnit(String);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceBearing {
    pub distance: f64,
    /// Initial bearing in degrees, always within `[0, 360)`.
    pub bearing: f64,
}

/// Returns the distance in statute miles and the initial bearing from `from` to `to`.
pub fn distance_and_bearing(from: &Coordinates, to: &Coordinates) -> DistanceBearing {
    distance_and_bearing_in(from, to, DistanceUnit::Statute)
}

pub fn distance_and_bearing_in(from: &Coordinates, to: &Coordinates, unit: DistanceUnit) -> DistanceBearing {
    // Also covers the same point written differently: across the antimeridian, wrapped by 360, or at a pole
    let a = haversine_term(from, to);
    if a <= COINCIDENT_HAVERSINE_TERM {
        return DistanceBearing { distance: 0.0, bearing: 0.0 };
    }

    DistanceBearing {
        distance: unit.earth_radius() * 2.0 * a.sqrt().atan2((1.0 - a).sqrt()),
        bearing: initial_bearing(from, to),
    }
}

fn haversine_term(from: &Coordinates, to: &Coordinates) -> f64 {
    let from_lat = from.latitude.to_radians();
    let to_lat = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2) + from_lat.cos() * to_lat.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just outside [0, 1] for near antipodal points
    a.clamp(0.0, 1.0)
}

fn initial_bearing(from: &Coordinates, to: &Coordinates) -> f64 {
    let from_lat = from.latitude.to_radians();
    let to_lat = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * to_lat.cos();
    let x = from_lat.cos() * to_lat.sin() - from_lat.sin() * to_lat.cos() * delta_lon.cos();

    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    if bearing.is_finite() && bearing < 360.0 { bearing } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPSILON: f64 = 1e-6;

    fn at(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates::new(latitude, longitude, 0.0)
    }

    #[test]
    fn coincident_points_have_zero_distance_and_bearing() {
        let camp = at(40.0, -105.0);

        let result = distance_and_bearing(&camp, &camp);

        assert_eq!(result, DistanceBearing { distance: 0.0, bearing: 0.0 });
    }

    #[test]
    fn elevation_does_not_influence_the_result() {
        let low = Coordinates::new(40.0, -105.0, 0.0);
        let high = Coordinates::new(40.0, -105.0, 4000.0);

        assert_eq!(distance_and_bearing(&low, &high), DistanceBearing { distance: 0.0, bearing: 0.0 });
    }

    #[rstest]
    #[case(at(10.0, -180.0), at(10.0, 180.0))]
    #[case(at(0.0, 0.0), at(0.0, 360.0))]
    #[case(at(90.0, 0.0), at(90.0, 50.0))]
    #[case(at(-90.0, 10.0), at(-90.0, -170.0))]
    fn same_point_written_differently_is_coincident(#[case] from: Coordinates, #[case] to: Coordinates) {
        assert_eq!(distance_and_bearing(&from, &to), DistanceBearing { distance: 0.0, bearing: 0.0 });
    }

    #[test]
    fn nearby_points_still_get_a_bearing() {
        let result = distance_and_bearing(&at(0.0, 0.0), &at(0.0, 0.0001));

        assert!(result.distance > 0.0);
        assert!((result.bearing - 90.0).abs() < EPSILON, "bearing was {}", result.bearing);
    }

    #[test]
    fn quarter_of_the_equator_heads_due_east() {
        let result = distance_and_bearing(&at(0.0, 0.0), &at(0.0, 90.0));

        let quarter = EARTH_RADIUS_STATUTE_MILES * std::f64::consts::FRAC_PI_2;
        assert!((result.distance - quarter).abs() < EPSILON, "distance was {}", result.distance);
        assert!((result.bearing - 90.0).abs() < EPSILON, "bearing was {}", result.bearing);
    }

    #[rstest]
    #[case(at(0.0, 0.0), at(10.0, 0.0), 0.0)]
    #[case(at(0.0, 0.0), at(0.0, 10.0), 90.0)]
    #[case(at(10.0, 0.0), at(0.0, 0.0), 180.0)]
    #[case(at(0.0, 10.0), at(0.0, 0.0), 270.0)]
    fn bearing_follows_the_compass(#[case] from: Coordinates, #[case] to: Coordinates, #[case] expected: f64) {
        let result = distance_and_bearing(&from, &to);

        assert!((result.bearing - expected).abs() < EPSILON, "bearing was {}", result.bearing);
    }

    #[test]
    fn distance_is_symmetric_and_bearings_differ() {
        let denver = at(39.7392, -104.9903);
        let london = at(51.5074, -0.1278);

        let there = distance_and_bearing(&denver, &london);
        let back = distance_and_bearing(&london, &denver);

        assert!((there.distance - back.distance).abs() < EPSILON);
        assert_ne!(there.bearing, back.bearing);
        for bearing in [there.bearing, back.bearing] {
            assert!((0.0..360.0).contains(&bearing), "bearing {} out of range", bearing);
        }
    }

    #[test]
    fn antipodal_points_are_half_a_circumference_apart() {
        let result = distance_and_bearing(&at(0.0, 0.0), &at(0.0, 180.0));

        let half = EARTH_RADIUS_STATUTE_MILES * std::f64::consts::PI;
        assert!((result.distance - half).abs() < EPSILON);
        assert!((0.0..360.0).contains(&result.bearing));
    }

    #[rstest]
    #[case(DistanceUnit::Statute, 6218.5)]
    #[case(DistanceUnit::Nautical, 5403.6)]
    #[case(DistanceUnit::Kilometers, 10007.5)]
    fn converts_distance_to_the_requested_unit(#[case] unit: DistanceUnit, #[case] expected: f64) {
        let result = distance_and_bearing_in(&at(0.0, 0.0), &at(0.0, 90.0), unit);

        assert!((result.distance - expected).abs() < 0.1, "distance was {}", result.distance);
    }

    #[rstest]
    #[case("statute", DistanceUnit::Statute)]
    #[case("MILES", DistanceUnit::Statute)]
    #[case("nmi", DistanceUnit::Nautical)]
    #[case("km", DistanceUnit::Kilometers)]
    fn parses_distance_units(#[case] input: &str, #[case] expected: DistanceUnit) {
        assert_eq!(input.parse::<DistanceUnit>(), Ok(expected));
    }

    #[test]
    fn parse_fails_for_an_unknown_unit() {
        let result = "furlongs".parse::<DistanceUnit>();

        assert_eq!(result, Err(UnknownDistanceUnit("furlongs".to_string())));
    }
}
