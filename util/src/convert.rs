//! Unit conversions used at the simulator boundary.

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of meters in a statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Number of seconds in an hour.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a speed in miles per hour into meters per second.
pub fn mph_to_ms(speed_mph: f64) -> f64 {
    speed_mph * (METERS_PER_MILE / SECONDS_PER_HOUR)
}

/// Convert degrees to radians.
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// Convert radians to degrees.
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mph_to_ms() {
        assert_eq!(mph_to_ms(0.0), 0.0);
        assert!((mph_to_ms(100.0) - 44.704).abs() < 1e-9);
    }

    #[test]
    fn test_angles() {
        assert!((deg_to_rad(180.0) - std::f64::consts::PI).abs() < 1e-12);
        assert!((rad_to_deg(deg_to_rad(25.0)) - 25.0).abs() < 1e-12);
    }
}
