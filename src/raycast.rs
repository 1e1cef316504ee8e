//! Output pixel → look ray.

use crate::camera::CameraModel;
use crate::Vector3;

/// A look ray in J2000, originating at the spacecraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookRay {
    /// Spacecraft position, km from the target center.
    pub origin: Vector3,
    /// Unit look direction.
    pub direction: Vector3,
    /// Ephemeris time of the observation.
    pub et: f64,
}

/// Look ray for image coordinate `(sample, line)` of `band` (1-based).
///
/// Geometry does not vary by band; the band is only range-checked. Returns
/// `None` for an out-of-range band or when undistortion fails.
pub fn look_vector(camera: &CameraModel, sample: f64, line: f64, band: u32) -> Option<LookRay> {
    if band == 0 || band > camera.bands {
        return None;
    }
    let (direction, et) = camera.look_direction(sample, line)?;
    Some(LookRay {
        origin: camera.position_at(et),
        direction,
        et,
    })
}
