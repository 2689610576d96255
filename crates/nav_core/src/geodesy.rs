//! Spherical geometry: haversine distance, great-circle bearings and compass labels.
//!
//! All angles at the API are degrees; latitudes are positive north, longitudes
//! positive east of Greenwich.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Mean of the polar and equatorial earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_365_000.0;

/// Below this unit-sphere distance two points are treated as identical.
const DEGENERATE_ARC_RAD: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl Point {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

/// Hemisphere notation, e.g. `50.90838N 11.56821E`.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat_deg < 0.0 { 'S' } else { 'N' };
        let ew = if self.lon_deg < 0.0 { 'W' } else { 'E' };
        write!(
            f,
            "{}{} {}{}",
            self.lat_deg.abs(),
            ns,
            self.lon_deg.abs(),
            ew
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePointError(String);

impl fmt::Display for ParsePointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot read '{}' as a position like 50.9N 11.5E", self.0)
    }
}

impl std::error::Error for ParsePointError {}

impl FromStr for Point {
    type Err = ParsePointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePointError(s.to_string());
        let mut parts = s.split_whitespace();
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(err());
        };
        let lat_deg = parse_hemisphere(lat, 'N', 'S').ok_or_else(err)?;
        let lon_deg = parse_hemisphere(lon, 'E', 'W').ok_or_else(err)?;
        Ok(Point::new(lat_deg, lon_deg))
    }
}

fn parse_hemisphere(token: &str, positive: char, negative: char) -> Option<f64> {
    let (split, suffix) = token.char_indices().last()?;
    let suffix = suffix.to_ascii_uppercase();
    let value: f64 = token[..split].parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    match suffix {
        c if c == positive => Some(value),
        c if c == negative => Some(-value),
        _ => None,
    }
}

/// Distance and mutual bearings of the direct air line between two points.
///
/// Azimuths are `None` when the two points coincide (or are antipodal) and no
/// single direction exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirlineProperties {
    pub distance_m: f64,
    pub azimuth_1_to_2_deg: Option<f64>,
    pub azimuth_2_to_1_deg: Option<f64>,
}

fn hav(theta_rad: f64) -> f64 {
    let s = (0.5 * theta_rad).sin();
    s * s
}

/// Great-circle distance on a sphere of radius [`EARTH_RADIUS_M`].
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    haversine_distance_with_radius(p1, p2, EARTH_RADIUS_M)
}

/// Great-circle distance in the unit of `radius`.
pub fn haversine_distance_with_radius(p1: Point, p2: Point, radius: f64) -> f64 {
    let lat1 = p1.lat_deg.to_radians();
    let lat2 = p2.lat_deg.to_radians();
    let dlon = (p2.lon_deg - p1.lon_deg).to_radians();
    let h = hav(lat2 - lat1) + lat1.cos() * lat2.cos() * hav(dlon);
    2.0 * radius * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Longitude difference `to - from` wrapped into (-180, 180].
fn wrapped_lon_delta(from_deg: f64, to_deg: f64) -> f64 {
    let d = (to_deg - from_deg).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Angle at the pole-adjacent vertex of the triangle {p, q, north pole}.
///
/// `a` is the arc p–q, `b` the colatitude of p, `c` the colatitude of q.
fn azimuth_at(a: f64, b: f64, c: f64, from: Point, to: Point) -> f64 {
    let sin_b = b.sin();
    if sin_b.abs() < DEGENERATE_ARC_RAD {
        // standing on a pole, every direction is south (or north)
        return if from.lat_deg > 0.0 { 180.0 } else { 0.0 };
    }
    let cos_angle = ((c.cos() - a.cos() * b.cos()) / (a.sin() * sin_b)).clamp(-1.0, 1.0);
    let mut angle = cos_angle.acos();
    if wrapped_lon_delta(from.lon_deg, to.lon_deg) < 0.0 {
        angle = 2.0 * PI - angle;
    }
    let deg = angle.to_degrees();
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Distance plus both azimuths via the spherical law of cosines.
pub fn airline_properties(p1: Point, p2: Point) -> AirlineProperties {
    let a = haversine_distance_with_radius(p1, p2, 1.0);
    if a < DEGENERATE_ARC_RAD {
        return AirlineProperties {
            distance_m: 0.0,
            azimuth_1_to_2_deg: None,
            azimuth_2_to_1_deg: None,
        };
    }
    if a.sin() < DEGENERATE_ARC_RAD {
        return AirlineProperties {
            distance_m: a * EARTH_RADIUS_M,
            azimuth_1_to_2_deg: None,
            azimuth_2_to_1_deg: None,
        };
    }
    let b = (90.0 - p1.lat_deg).to_radians();
    let c = (90.0 - p2.lat_deg).to_radians();

    AirlineProperties {
        distance_m: a * EARTH_RADIUS_M,
        azimuth_1_to_2_deg: Some(azimuth_at(a, b, c, p1, p2)),
        azimuth_2_to_1_deg: Some(azimuth_at(a, c, b, p2, p1)),
    }
}

/// Initial great-circle bearing from `p1` towards `p2` in [0, 360).
///
/// Closed atan2 form; agrees with [`airline_properties`] away from degenerate inputs.
pub fn initial_bearing_deg(p1: Point, p2: Point) -> f64 {
    let lat1 = p1.lat_deg.to_radians();
    let lat2 = p2.lat_deg.to_radians();
    let dlon = wrapped_lon_delta(p1.lon_deg, p2.lon_deg).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassLabel {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassLabel {
    const CLOCKWISE: [CompassLabel; 8] = [
        CompassLabel::N,
        CompassLabel::NE,
        CompassLabel::E,
        CompassLabel::SE,
        CompassLabel::S,
        CompassLabel::SW,
        CompassLabel::W,
        CompassLabel::NW,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompassLabel::N => "N",
            CompassLabel::NE => "NE",
            CompassLabel::E => "E",
            CompassLabel::SE => "SE",
            CompassLabel::S => "S",
            CompassLabel::SW => "SW",
            CompassLabel::W => "W",
            CompassLabel::NW => "NW",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            CompassLabel::N => "North",
            CompassLabel::NE => "North-East",
            CompassLabel::E => "East",
            CompassLabel::SE => "South-East",
            CompassLabel::S => "South",
            CompassLabel::SW => "South-West",
            CompassLabel::W => "West",
            CompassLabel::NW => "North-West",
        }
    }
}

impl fmt::Display for CompassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sector label for a bearing; sectors are 45° wide and centered on the principal directions.
///
/// Any finite bearing is accepted, negative values and values past 360 wrap around.
pub fn azimuth_to_compass_label(bearing_deg: f64) -> CompassLabel {
    let shifted = (bearing_deg + 22.5).rem_euclid(360.0);
    let sector = (shifted / 45.0).floor() as usize % 8;
    CompassLabel::CLOCKWISE[sector]
}

/// Distance in km rounded for display: coarser steps the further away.
pub fn display_distance_km(distance_m: f64) -> f64 {
    let km = distance_m / 1000.0;
    if distance_m < 10_000.0 {
        return (km * 10.0).round() / 10.0;
    }
    let step = if distance_m < 100_000.0 {
        1.0
    } else if distance_m < 1_000_000.0 {
        10.0
    } else {
        100.0
    };
    (km / step).round() * step
}
