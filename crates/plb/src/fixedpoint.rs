//! Degree <-> fixed-point projection.
//!
//! `fp = trunc((degrees / scale) * 2^(precision - 1))`, scale is 90 for
//! latitude and 180 for longitude. Truncation is toward zero, matching a
//! C-style `float` to `int` cast. Decoding is the exact inverse.

pub const LAT_SCALE: f64 = 90.0;
pub const LON_SCALE: f64 = 180.0;

/// Converts a coordinate in degrees to fixed-point at the given precision.
/// `precision` must be in `1..=63`; `Database::open` rejects any file whose
/// header claims otherwise, so callers past that point may assume it.
#[inline]
pub fn to_fixed(degrees: f64, scale: f64, precision: u8) -> i64 {
    let scaled = degrees / scale;
    (scaled * (1i64 << (precision - 1)) as f64).trunc() as i64
}

/// Converts a fixed-point coordinate back to degrees.
#[inline]
pub fn from_fixed(fp: i64, scale: f64, precision: u8) -> f64 {
    (fp as f64 / (1i64 << (precision - 1)) as f64) * scale
}

/// Converts a minimum squared planar distance (longitude weighted x4, per
/// `from_fixed`'s scale) back to a safezone distance in degrees.
#[inline]
pub fn safezone_from_sqr_distance(distance_sqr_min: u64, precision: u8) -> f64 {
    (distance_sqr_min as f64).sqrt() * LAT_SCALE / (1i64 << (precision - 1)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_half_ulp() {
        let precision = 21u8;
        let cases = [0.0, 50.8503, -74.0060, 90.0, -90.0, 179.999, -180.0];
        for &lat in &cases {
            if lat.abs() > 90.0 {
                continue;
            }
            let fp = to_fixed(lat, LAT_SCALE, precision);
            let back = from_fixed(fp, LAT_SCALE, precision);
            assert!((back - lat).abs() < LAT_SCALE * 2f64.powi(-(precision as i32 - 1)));
        }
    }

    #[test]
    fn zero_maps_to_zero() {
        assert_eq!(to_fixed(0.0, LAT_SCALE, 21), 0);
        assert_eq!(to_fixed(0.0, LON_SCALE, 21), 0);
    }

    #[test]
    fn truncation_is_toward_zero() {
        // A value just shy of crossing an integer boundary must truncate down
        // in magnitude, not round.
        let precision = 8u8;
        let fp_pos = to_fixed(44.999, LAT_SCALE, precision);
        let fp_neg = to_fixed(-44.999, LAT_SCALE, precision);
        assert_eq!(fp_pos, -fp_neg);
    }
}
