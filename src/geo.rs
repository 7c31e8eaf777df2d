use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::CoordError;

/// Mean earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hemisphere {
    N,
    S,
    E,
    W,
}

impl Hemisphere {
    pub fn sign(self) -> f64 {
        match self {
            Hemisphere::N | Hemisphere::E => 1.0,
            Hemisphere::S | Hemisphere::W => -1.0,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Hemisphere::N | Hemisphere::S => Axis::Latitude,
            Hemisphere::E | Hemisphere::W => Axis::Longitude,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Hemisphere::N => "N",
            Hemisphere::S => "S",
            Hemisphere::E => "E",
            Hemisphere::W => "W",
        }
    }
}

impl FromStr for Hemisphere {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "N" => Ok(Hemisphere::N),
            "S" => Ok(Hemisphere::S),
            "E" => Ok(Hemisphere::E),
            "W" => Ok(Hemisphere::W),
            other => Err(CoordError::InvalidCoordinateIndicator {
                indicator: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn check(self, value: f64) -> Result<f64, CoordError> {
        if value.is_finite() && value.abs() <= self.limit() {
            Ok(value)
        } else {
            Err(CoordError::InvalidCoordinateRange {
                axis: self.name(),
                value,
            })
        }
    }
}

/// Converts a degree/minute/second triple to signed decimal degrees.
///
/// `degrees` and `minutes` are taken as floats so that spreadsheet cells can be
/// passed straight through; both must hold whole numbers.
pub fn dms_to_decimal(
    degrees: f64,
    minutes: f64,
    seconds: f64,
    indicator: &str,
) -> Result<f64, CoordError> {
    let hemisphere: Hemisphere = indicator.parse()?;
    Ok(unsigned_decimal(degrees, minutes, seconds)? * hemisphere.sign())
}

fn unsigned_decimal(d: f64, m: f64, s: f64) -> Result<f64, CoordError> {
    fn component(component: &'static str, value: f64) -> CoordError {
        CoordError::InvalidCoordinateComponent { component, value }
    }

    if !d.is_finite() || d < 0.0 || d.fract() != 0.0 {
        return Err(component("degree", d));
    }
    if !m.is_finite() || m < 0.0 || m >= 60.0 || m.fract() != 0.0 {
        return Err(component("minute", m));
    }
    if !s.is_finite() || s < 0.0 || s >= 60.0 {
        return Err(component("second", s));
    }
    Ok(d + m / 60.0 + s / 3600.0)
}

/// One angle in degree/minute/second notation, as stored in the link sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl Dms {
    pub fn new(degrees: f64, minutes: f64, seconds: f64, hemisphere: Hemisphere) -> Self {
        Dms {
            degrees,
            minutes,
            seconds,
            hemisphere,
        }
    }

    pub fn to_decimal(self) -> Result<f64, CoordError> {
        dms_to_decimal(
            self.degrees,
            self.minutes,
            self.seconds,
            self.hemisphere.as_str(),
        )
    }

    fn on_axis(self, axis: Axis) -> Result<f64, CoordError> {
        if self.hemisphere.axis() != axis {
            return Err(CoordError::InvalidCoordinateIndicator {
                indicator: self.hemisphere.to_string(),
            });
        }
        axis.check(self.to_decimal()?)
    }

    pub fn latitude(self) -> Result<f64, CoordError> {
        self.on_axis(Axis::Latitude)
    }

    pub fn longitude(self) -> Result<f64, CoordError> {
        self.on_axis(Axis::Longitude)
    }

    /// Splits decimal degrees for display, rounded to the millisecond of arc.
    pub fn from_decimal(dd: f64, axis: Axis) -> Self {
        let hemisphere = match (axis, dd.is_sign_negative()) {
            (Axis::Latitude, false) => Hemisphere::N,
            (Axis::Latitude, true) => Hemisphere::S,
            (Axis::Longitude, false) => Hemisphere::E,
            (Axis::Longitude, true) => Hemisphere::W,
        };
        let millis = (dd.abs() * 3_600_000.0).round() as u64;
        Dms::new(
            (millis / 3_600_000) as f64,
            (millis / 60_000 % 60) as f64,
            (millis % 60_000) as f64 / 1000.0,
            hemisphere,
        )
    }
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}-{:02}-{:06.3}{}",
            self.degrees as u32, self.minutes as u32, self.seconds, self.hemisphere
        )
    }
}

/// A validated point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLon(f64, f64);

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        Ok(LatLon(Axis::Latitude.check(lat)?, Axis::Longitude.check(lon)?))
    }

    pub fn lat(self) -> f64 {
        self.0
    }

    pub fn lon(self) -> f64 {
        self.1
    }

    //Ex: 31-53-00.510N
    pub fn from_dms_text(lat: &str, lon: &str) -> Result<Self, CoordError> {
        fn parse(text: &str, axis: Axis) -> Result<f64, CoordError> {
            lazy_static! {
                static ref DMS_REGEX: Regex =
                    Regex::new(r"^\s*(\d+)-(\d+)-(\d+(?:\.\d+)?)\s*(\w)\s*$").unwrap();
            }

            let cap = DMS_REGEX
                .captures(text)
                .ok_or_else(|| CoordError::InvalidCoordinateComponent {
                    component: axis.name(),
                    value: f64::NAN,
                })?;
            // The regex guarantees digits, so these parses only fail on overflow.
            let num = |i: usize| cap[i].parse::<f64>().unwrap_or(f64::NAN);
            let hemisphere: Hemisphere = cap[4].parse()?;
            Dms::new(num(1), num(2), num(3), hemisphere).on_axis(axis)
        }

        LatLon::new(parse(lat, Axis::Latitude)?, parse(lon, Axis::Longitude)?)
    }

    pub fn to_dms_string(self) -> String {
        format!(
            "{} {}",
            Dms::from_decimal(self.0, Axis::Latitude),
            Dms::from_decimal(self.1, Axis::Longitude)
        )
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Great-circle distance in kilometres, rounded to the metre.
///
/// Uses the atan2 form of the spherical distance, which stays well conditioned
/// for both very short links and near-antipodal points.
pub fn great_circle_distance(a: LatLon, b: LatLon) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_lat2, cos_lat2) = lat2.sin_cos();
    let (sin_dlon, cos_dlon) = (lon2 - lon1).sin_cos();

    let y = f64::hypot(
        cos_lat2 * sin_dlon,
        cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon,
    );
    let x = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;

    round_to(EARTH_RADIUS_KM * y.atan2(x), 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hemisphere_flips_sign() {
        let cases = [(6.0, 21.0, 14.5), (100.0, 0.0, 0.0), (0.0, 59.0, 59.999)];
        for &(d, m, s) in cases.iter() {
            let pairs = [(Hemisphere::N, Hemisphere::S), (Hemisphere::E, Hemisphere::W)];
            for &(h, opposite) in pairs.iter() {
                let pos = Dms::new(d, m, s, h).to_decimal().unwrap();
                let neg = Dms::new(d, m, s, opposite).to_decimal().unwrap();
                assert_eq!(pos, -neg);
                assert_eq!(pos, dms_to_decimal(d, m, s, h.as_str()).unwrap());
            }
        }
    }

    #[test]
    fn zero_is_zero_in_any_hemisphere() {
        assert_eq!(dms_to_decimal(0.0, 0.0, 0.0, "N").unwrap(), 0.0);
        assert_eq!(dms_to_decimal(0.0, 0.0, 0.0, "S").unwrap(), 0.0);
    }

    #[test]
    fn converts_components() {
        assert_abs_diff_eq!(
            dms_to_decimal(0.0, 17.0, 30.0, "S").unwrap(),
            -0.291_666_666,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            dms_to_decimal(100.0, 21.0, 36.0, "E").unwrap(),
            100.36,
            epsilon = 1e-12
        );
    }

    #[test]
    fn unknown_indicator_is_rejected() {
        assert_eq!(
            dms_to_decimal(1.0, 2.0, 3.0, "X"),
            Err(CoordError::InvalidCoordinateIndicator {
                indicator: "X".to_string()
            })
        );
        assert!(dms_to_decimal(1.0, 2.0, 3.0, "").is_err());
    }

    #[test]
    fn out_of_bounds_components_are_rejected() {
        let bad = [
            (-1.0, 0.0, 0.0),
            (1.5, 0.0, 0.0),
            (1.0, 60.0, 0.0),
            (1.0, 2.5, 0.0),
            (1.0, 0.0, 60.0),
            (1.0, 0.0, -0.1),
            (1.0, 0.0, f64::NAN),
        ];
        for &(d, m, s) in bad.iter() {
            match dms_to_decimal(d, m, s, "N") {
                Err(CoordError::InvalidCoordinateComponent { .. }) => (),
                other => panic!("{:?} accepted as {:?}", (d, m, s), other),
            }
        }
    }

    #[test]
    fn axis_checks_indicator_and_range() {
        let lat = Dms::new(5.0, 0.0, 0.0, Hemisphere::E);
        assert!(matches!(
            lat.latitude(),
            Err(CoordError::InvalidCoordinateIndicator { .. })
        ));
        let lat = Dms::new(91.0, 0.0, 0.0, Hemisphere::N);
        assert!(matches!(
            lat.latitude(),
            Err(CoordError::InvalidCoordinateRange { axis: "latitude", .. })
        ));
        let lon = Dms::new(180.0, 0.0, 0.0, Hemisphere::W);
        assert_eq!(lon.longitude(), Ok(-180.0));
    }

    #[test]
    fn latlon_rejects_out_of_range() {
        assert!(LatLon::new(90.0, 180.0).is_ok());
        assert!(matches!(
            LatLon::new(90.5, 0.0),
            Err(CoordError::InvalidCoordinateRange { .. })
        ));
        assert!(matches!(
            LatLon::new(0.0, -180.1),
            Err(CoordError::InvalidCoordinateRange { .. })
        ));
    }

    #[test]
    fn self_distance_is_zero() {
        let p = LatLon::new(-0.9471, 100.4172).unwrap();
        assert_eq!(great_circle_distance(p, p), 0.0);
        let origin = LatLon::new(0.0, 0.0).unwrap();
        assert_eq!(great_circle_distance(origin, origin), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLon::new(-0.305, 100.369).unwrap();
        let b = LatLon::new(-0.95, 100.354).unwrap();
        assert_eq!(great_circle_distance(a, b), great_circle_distance(b, a));
    }

    #[test]
    fn one_arcsecond_of_latitude() {
        let origin = LatLon::new(
            dms_to_decimal(0.0, 0.0, 0.0, "N").unwrap(),
            dms_to_decimal(100.0, 0.0, 0.0, "E").unwrap(),
        )
        .unwrap();
        let dest = LatLon::new(
            dms_to_decimal(0.0, 0.0, 1.0, "N").unwrap(),
            dms_to_decimal(100.0, 0.0, 0.0, "E").unwrap(),
        )
        .unwrap();
        assert_abs_diff_eq!(dest.lat(), 0.000278, epsilon = 1e-6);
        assert_eq!(great_circle_distance(origin, dest), 0.031);
    }

    #[test]
    fn quarter_meridian() {
        let equator = LatLon::new(0.0, 0.0).unwrap();
        let pole = LatLon::new(90.0, 0.0).unwrap();
        assert_abs_diff_eq!(
            great_circle_distance(equator, pole),
            10007.557,
            epsilon = 0.001
        );
    }

    #[test]
    fn parses_dms_text() {
        let p = LatLon::from_dms_text("31-53-00.510N", "095-20-10.000W").unwrap();
        assert_abs_diff_eq!(p.lat(), 31.883_475, epsilon = 1e-6);
        assert_abs_diff_eq!(p.lon(), -95.336_111, epsilon = 1e-6);
        assert!(LatLon::from_dms_text("31-53-00.510E", "095-20-10W").is_err());
        assert!(LatLon::from_dms_text("garbage", "095-20-10W").is_err());
    }

    #[test]
    fn formats_back_to_dms() {
        let p = LatLon::new(-0.5, 100.25).unwrap();
        assert_eq!(p.to_dms_string(), "00-30-00.000S 100-15-00.000E");
    }

    #[test]
    fn formatting_carries_rounded_seconds() {
        let p = LatLon::new(0.9999999, -12.9999999).unwrap();
        let text = p.to_dms_string();
        assert_eq!(text, "01-00-00.000N 13-00-00.000W");

        let mut parts = text.split(' ');
        let back = LatLon::from_dms_text(parts.next().unwrap(), parts.next().unwrap()).unwrap();
        assert_abs_diff_eq!(back.lat(), p.lat(), epsilon = 1e-6);
        assert_abs_diff_eq!(back.lon(), p.lon(), epsilon = 1e-6);

        let d = Dms::from_decimal(6.354_027_7, Axis::Latitude);
        assert_eq!(d.to_string(), "06-21-14.500N");
    }
}
