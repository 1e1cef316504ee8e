//! Optical distortion of the actual camera's focal plane.
//!
//! The actual instrument records light at *distorted* focal-plane positions;
//! the ideal camera is a pure pinhole. Reprojection needs both directions:
//!
//! - [`OpticalDistortion::to_ideal`] removes distortion from a measured
//!   focal-plane position before it is turned into a look vector.
//! - [`OpticalDistortion::to_distorted`] applies distortion to a pinhole
//!   position when a look vector is projected back onto the detector.
//!
//! All coordinates are focal-plane millimetres relative to the boresight.
//!
//! # Supported models
//!
//! - [`OpticalDistortion::Radial`]: odd radial polynomial with up to three coefficients
//! - [`OpticalDistortion::Polynomial`]: full 2D polynomial with cross terms, for
//!   detectors whose distortion is not radially symmetric

pub mod polynomial;
pub mod radial;

use rkyv::{Archive, Deserialize, Serialize};

pub use polynomial::PolynomialDistortion;
pub use radial::RadialDistortion;

/// Convergence tolerance for inverse distortion, in millimetres.
pub(crate) const INVERSE_TOLERANCE_MM: f64 = 1e-12;
/// Iteration cap for inverse distortion.
pub(crate) const INVERSE_MAX_ITERATIONS: usize = 50;

/// Distortion model of an actual camera.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum OpticalDistortion {
    /// Pinhole optics; measured and ideal positions coincide.
    None,
    /// Radial distortion: r_distorted = r × (1 + k1·r² + k2·r⁴ + k3·r⁶).
    Radial(RadialDistortion),
    /// Polynomial distortion with independent x and y terms.
    Polynomial(PolynomialDistortion),
}

impl OpticalDistortion {
    /// Measured (distorted) focal-plane position → ideal pinhole position.
    ///
    /// Returns `None` when the inverse does not converge, which happens for
    /// positions outside the region where the model is monotonic.
    pub fn to_ideal(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            OpticalDistortion::None => Some((x, y)),
            OpticalDistortion::Radial(r) => r.to_ideal(x, y),
            OpticalDistortion::Polynomial(p) => p.to_ideal(x, y),
        }
    }

    /// Ideal pinhole position → measured (distorted) focal-plane position.
    pub fn to_distorted(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            OpticalDistortion::None => (x, y),
            OpticalDistortion::Radial(r) => r.to_distorted(x, y),
            OpticalDistortion::Polynomial(p) => p.to_distorted(x, y),
        }
    }

    /// Returns `true` for pinhole optics.
    pub fn is_none(&self) -> bool {
        matches!(self, OpticalDistortion::None)
    }
}

impl Default for OpticalDistortion {
    fn default() -> Self {
        OpticalDistortion::None
    }
}
