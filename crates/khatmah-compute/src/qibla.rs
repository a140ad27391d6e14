use thiserror::Error;

/// Latitude of the Kaaba in decimal degrees.
pub const KAABA_LATITUDE: f64 = 21.4225;
/// Longitude of the Kaaba in decimal degrees.
pub const KAABA_LONGITUDE: f64 = 39.8262;

/// Points closer than this (in degrees, per axis) count as the Kaaba itself.
const SAME_POINT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QiblaError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn name(self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }

    fn check(self, value: f64) -> Result<f64, QiblaError> {
        if !value.is_finite() || value.abs() > self.limit() {
            return Err(QiblaError::InvalidArgument(format!(
                "{} must be within [-{limit}, {limit}], got {}",
                self.name(),
                value,
                limit = self.limit(),
            )));
        }
        Ok(value)
    }

    fn parse(self, raw: &str) -> Result<f64, QiblaError> {
        let value: f64 = raw.trim().parse().map_err(|_| {
            QiblaError::InvalidArgument(format!("{} '{}' is not a number", self.name(), raw))
        })?;
        self.check(value)
    }
}

/// Initial bearing, clockwise from true north in `[0, 360)`, of the great-circle
/// path from (`latitude`, `longitude`) to the Kaaba.
///
/// Coordinates outside the valid latitude/longitude ranges are rejected.
/// The Kaaba itself has no defined course; it is reported as 0.
pub fn qibla_direction(latitude: f64, longitude: f64) -> Result<f64, QiblaError> {
    let latitude = Axis::Latitude.check(latitude)?;
    let longitude = Axis::Longitude.check(longitude)?;

    if (latitude - KAABA_LATITUDE).abs() < SAME_POINT_EPSILON
        && (longitude - KAABA_LONGITUDE).abs() < SAME_POINT_EPSILON
    {
        return Ok(0.0);
    }

    let phi_p = latitude.to_radians();
    let phi_k = KAABA_LATITUDE.to_radians();
    let delta_lambda = (KAABA_LONGITUDE - longitude).to_radians();

    let y = delta_lambda.sin();
    let x = phi_p.cos() * phi_k.tan() - phi_p.sin() * delta_lambda.cos();
    let degrees = y.atan2(x).to_degrees();

    // Plain `rem_euclid` can land on 360.0 for tiny negative inputs.
    Ok(((degrees % 360.0) + 360.0) % 360.0)
}

/// Parses and range-checks a coordinate pair taken verbatim from a URL or form.
pub fn parse_coordinates(latitude: &str, longitude: &str) -> Result<(f64, f64), QiblaError> {
    Ok((Axis::Latitude.parse(latitude)?, Axis::Longitude.parse(longitude)?))
}

/// Round a bearing for display.
pub fn round_bearing(bearing: f64) -> f64 {
    (bearing * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn assert_bearing(lat: f64, lon: f64, expected: f64) {
        let got = qibla_direction(lat, lon).unwrap();
        assert!(
            (got - expected).abs() < TOLERANCE,
            "({lat}, {lon}): expected {expected}, got {got}"
        );
    }

    #[test]
    fn golden_bearings() {
        assert_bearing(19.071017570421, 72.838622286762, 280.07742762491944); // Mumbai
        assert_bearing(40.7128, -74.0060, 58.48170103788368); // New York
        assert_bearing(35.6762, 139.6503, 292.99868018616394); // Tokyo
        assert_bearing(-33.8688, 151.2093, 277.49958912095144); // Sydney
        assert_bearing(30.0444, 31.2357, 136.13727662254735); // Cairo
        assert_bearing(51.5074, -0.1278, 118.98721949633443); // London
    }

    #[test]
    fn kaaba_is_zero() {
        assert_eq!(qibla_direction(KAABA_LATITUDE, KAABA_LONGITUDE).unwrap(), 0.0);
    }

    #[test]
    fn always_in_range() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lon = -180.0;
            while lon <= 180.0 {
                let b = qibla_direction(lat, lon).unwrap();
                assert!((0.0..360.0).contains(&b), "({lat}, {lon}) -> {b}");
                lon += 7.5;
            }
            lat += 5.0;
        }
    }

    #[test]
    fn parses_strings() {
        let (lat, lon) = parse_coordinates(" 30.0444", "31.2357 ").unwrap();
        assert_eq!((lat, lon), (30.0444, 31.2357));
        let b = qibla_direction(lat, lon).unwrap();
        assert!((b - 136.13727662254735).abs() < TOLERANCE);
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        assert!(matches!(
            parse_coordinates("north", "31.2"),
            Err(QiblaError::InvalidArgument(_))
        ));
        assert!(parse_coordinates("30", "").is_err());
        assert!(qibla_direction(91.0, 0.0).is_err());
        assert!(qibla_direction(0.0, -180.5).is_err());
        assert!(qibla_direction(f64::NAN, 0.0).is_err());
        assert!(parse_coordinates("inf", "0").is_err());
    }

    #[test]
    fn rounding() {
        assert_eq!(round_bearing(280.07742762491944), 280.08);
        assert_eq!(round_bearing(292.99868018616394), 293.0);
    }
}
