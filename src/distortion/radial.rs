//! Radial optical distortion in the focal plane.
//!
//! ```text
//! r_d = r × (1 + k1·r² + k2·r⁴ + k3·r⁶)
//! ```
//!
//! `r` is the ideal distance from the boresight in millimetres. Barrel optics
//! have `k1 < 0`, pincushion `k1 > 0`.

use rkyv::{Archive, Deserialize, Serialize};

use super::{INVERSE_MAX_ITERATIONS, INVERSE_TOLERANCE_MM};

/// Radial distortion with up to three coefficients (mm⁻², mm⁻⁴, mm⁻⁶).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RadialDistortion {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
}

impl RadialDistortion {
    pub fn new(k1: f64, k2: f64, k3: f64) -> Self {
        Self { k1, k2, k3 }
    }

    fn scale(&self, r2: f64) -> f64 {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }

    /// Ideal → distorted.
    pub fn to_distorted(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.scale(x * x + y * y);
        (x * s, y * s)
    }

    /// Distorted → ideal, by Newton iteration on the radius.
    ///
    /// Fails when the radial map folds over (derivative ≤ 0) before the
    /// requested radius is reached, or when the iteration stalls.
    pub fn to_ideal(&self, x_d: f64, y_d: f64) -> Option<(f64, f64)> {
        let r_d = x_d.hypot(y_d);
        if r_d < INVERSE_TOLERANCE_MM {
            return Some((x_d, y_d));
        }

        let mut r = r_d;
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let r2 = r * r;
            let f = r * self.scale(r2) - r_d;
            let df = 1.0 + r2 * (3.0 * self.k1 + r2 * (5.0 * self.k2 + r2 * 7.0 * self.k3));
            if df <= 0.0 {
                return None;
            }
            let step = f / df;
            r -= step;
            if step.abs() < INVERSE_TOLERANCE_MM {
                let ratio = r / r_d;
                return Some((x_d * ratio, y_d * ratio));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_distorted_roundtrip() {
        let d = RadialDistortion::new(-2.5e-4, 1.0e-7, 0.0);
        for &(x, y) in &[(0.3, -0.2), (4.0, 3.0), (-6.5, 0.0), (0.0, 7.2)] {
            let (xd, yd) = d.to_distorted(x, y);
            let (xu, yu) = d.to_ideal(xd, yd).expect("inverse should converge");
            assert!(
                (xu - x).abs() < 1e-9 && (yu - y).abs() < 1e-9,
                "Roundtrip failed for ({}, {}): got ({}, {})",
                x,
                y,
                xu,
                yu
            );
        }
    }

    #[test]
    fn test_boresight_is_fixed() {
        let d = RadialDistortion::new(1e-3, 0.0, 0.0);
        assert_eq!(d.to_ideal(0.0, 0.0), Some((0.0, 0.0)));
        assert_eq!(d.to_distorted(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_folded_barrel_has_no_inverse() {
        // r - 0.1 r³ peaks at ~1.217 mm, so 2 mm is unreachable.
        let d = RadialDistortion::new(-0.1, 0.0, 0.0);
        assert!(d.to_ideal(2.0, 0.0).is_none());
    }

    #[test]
    fn test_pincushion_pushes_outward() {
        let d = RadialDistortion::new(1e-3, 0.0, 0.0);
        let (xd, yd) = d.to_distorted(3.0, 4.0);
        assert!(xd > 3.0 && yd > 4.0);
        assert!(((yd / xd) - 4.0 / 3.0).abs() < 1e-12, "direction must be preserved");
    }
}
