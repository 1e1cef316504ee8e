//! Polynomial focal-plane distortion with cross terms.
//!
//! ```text
//! x_d = x + Σ A_pq · x^p · y^q      (2 ≤ p+q ≤ order)
//! y_d = y + Σ B_pq · x^p · y^q
//! ```
//!
//! Only the forward direction is stored. The inverse is solved per point with
//! Newton's method using the analytic Jacobian.

use rkyv::{Archive, Deserialize, Serialize};

use super::{INVERSE_MAX_ITERATIONS, INVERSE_TOLERANCE_MM};

/// Forward polynomial distortion in focal-plane millimetres.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct PolynomialDistortion {
    /// Highest total degree p+q.
    pub order: u32,
    /// x correction coefficients, in [`terms`] order.
    pub x_coeffs: Vec<f64>,
    /// y correction coefficients, in [`terms`] order.
    pub y_coeffs: Vec<f64>,
}

impl PolynomialDistortion {
    /// Both coefficient vectors must hold `terms(order).len()` values.
    pub fn new(order: u32, x_coeffs: Vec<f64>, y_coeffs: Vec<f64>) -> Self {
        let n = terms(order).len();
        assert_eq!(x_coeffs.len(), n, "x_coeffs length mismatch");
        assert_eq!(y_coeffs.len(), n, "y_coeffs length mismatch");
        Self {
            order,
            x_coeffs,
            y_coeffs,
        }
    }

    /// Ideal → distorted.
    pub fn to_distorted(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.correction(x, y);
        (x + dx, y + dy)
    }

    /// Distorted → ideal.
    pub fn to_ideal(&self, x_d: f64, y_d: f64) -> Option<(f64, f64)> {
        let (mut x, mut y) = (x_d, y_d);
        for _ in 0..INVERSE_MAX_ITERATIONS {
            let (fx, fy) = self.to_distorted(x, y);
            let (rx, ry) = (fx - x_d, fy - y_d);
            let [[a, b], [c, d]] = self.jacobian(x, y);
            let det = a * d - b * c;
            if det.abs() < 1e-15 {
                return None;
            }
            let step_x = (d * rx - b * ry) / det;
            let step_y = (a * ry - c * rx) / det;
            x -= step_x;
            y -= step_y;
            if step_x.abs().max(step_y.abs()) < INVERSE_TOLERANCE_MM {
                return Some((x, y));
            }
        }
        None
    }

    fn correction(&self, x: f64, y: f64) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        for (i, (p, q)) in terms(self.order).into_iter().enumerate() {
            let m = x.powi(p as i32) * y.powi(q as i32);
            dx += self.x_coeffs[i] * m;
            dy += self.y_coeffs[i] * m;
        }
        (dx, dy)
    }

    /// ∂(x_d, y_d)/∂(x, y).
    fn jacobian(&self, x: f64, y: f64) -> [[f64; 2]; 2] {
        let mut j = [[1.0, 0.0], [0.0, 1.0]];
        for (i, (p, q)) in terms(self.order).into_iter().enumerate() {
            let dm_dx = if p > 0 {
                p as f64 * x.powi(p as i32 - 1) * y.powi(q as i32)
            } else {
                0.0
            };
            let dm_dy = if q > 0 {
                q as f64 * x.powi(p as i32) * y.powi(q as i32 - 1)
            } else {
                0.0
            };
            j[0][0] += self.x_coeffs[i] * dm_dx;
            j[0][1] += self.x_coeffs[i] * dm_dy;
            j[1][0] += self.y_coeffs[i] * dm_dx;
            j[1][1] += self.y_coeffs[i] * dm_dy;
        }
        j
    }
}

/// Exponent pairs (p, q) for 2 ≤ p+q ≤ order, by increasing degree then
/// decreasing p: (2,0), (1,1), (0,2), (3,0), (2,1), ...
pub fn terms(order: u32) -> Vec<(u32, u32)> {
    (2..=order)
        .flat_map(|s| (0..=s).rev().map(move |p| (p, s - p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> PolynomialDistortion {
        let n = terms(3).len();
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        a[0] = 2.0e-4; // x²
        a[4] = -1.5e-5; // x²y
        b[2] = -3.0e-4; // y²
        b[1] = 1.0e-4; // xy
        PolynomialDistortion::new(3, a, b)
    }

    #[test]
    fn test_terms() {
        assert_eq!(terms(2), vec![(2, 0), (1, 1), (0, 2)]);
        assert_eq!(terms(3).len(), 7);
        assert_eq!(terms(4).len(), 12);
    }

    #[test]
    fn test_inverse_matches_forward() {
        let d = skewed();
        for &(x, y) in &[(0.0, 0.0), (5.0, -3.0), (-7.5, 6.0), (2.0, 8.0)] {
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
    fn test_known_forward_value() {
        let d = skewed();
        // dx = 2e-4·4² - 1.5e-5·4²·2 = 0.0032 - 0.00048
        let (xd, _) = d.to_distorted(4.0, 2.0);
        assert!((xd - (4.0 + 0.0032 - 0.00048)).abs() < 1e-12);
    }
}
