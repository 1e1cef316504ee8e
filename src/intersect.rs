//! Target body shape, rotation, and ray intersection.
//!
//! Rays and positions arrive in J2000 relative to the target center. The
//! intersection itself runs in the body-fixed frame at the ray's time, which
//! turns the shape into a fixed, axis-aligned ellipsoid.

use rkyv::{Archive, Deserialize, Serialize};

use crate::raycast::LookRay;
use crate::{Quaternion, Vector3};

/// Shape of the target body.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ShapeModel {
    Sphere { radius_km: f64 },
    /// Triaxial ellipsoid with body-fixed semi-axes (a, b, c).
    Ellipsoid { radii_km: [f64; 3] },
}

impl ShapeModel {
    fn radii(&self) -> [f64; 3] {
        match *self {
            ShapeModel::Sphere { radius_km } => [radius_km; 3],
            ShapeModel::Ellipsoid { radii_km } => radii_km,
        }
    }

    /// Distance along `dir` (need not be unit) from `origin` to the nearest
    /// forward crossing of the surface, in units of `|dir|`.
    fn ray_parameter(&self, origin: &Vector3, dir: &Vector3) -> Option<f64> {
        // Scale to the unit sphere.
        let r = self.radii();
        let o = Vector3::new(origin.x / r[0], origin.y / r[1], origin.z / r[2]);
        let d = Vector3::new(dir.x / r[0], dir.y / r[1], dir.z / r[2]);

        let a = d.dot(&d);
        let b = 2.0 * o.dot(&d);
        let c = o.dot(&o) - 1.0;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 || a == 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        // Numerically stable pair of roots.
        let q = -0.5 * (b + b.signum() * sq);
        let (t0, t1) = if q == 0.0 {
            (0.0, 0.0)
        } else {
            let (r0, r1) = (q / a, c / q);
            (r0.min(r1), r0.max(r1))
        };
        if t0 > 0.0 {
            Some(t0)
        } else if t1 > 0.0 {
            Some(t1)
        } else {
            None
        }
    }
}

/// J2000 → body-fixed orientation, spinning uniformly about body +Z.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct BodyRotation {
    /// Time at which `orientation` holds.
    pub epoch: f64,
    /// J2000 → body-fixed rotation at `epoch`, `[w, i, j, k]`.
    pub orientation: [f64; 4],
    /// Spin rate about body +Z, rad/s. Positive is prograde: the prime
    /// meridian advances eastward, so the J2000 → body-fixed rotation turns
    /// by `-spin_rate * (et - epoch)`.
    pub spin_rate: f64,
}

impl BodyRotation {
    /// Body frame aligned with J2000 and not rotating.
    pub fn inertial() -> Self {
        Self {
            epoch: 0.0,
            orientation: [1.0, 0.0, 0.0, 0.0],
            spin_rate: 0.0,
        }
    }

    /// J2000 → body-fixed rotation at `et`.
    pub fn at(&self, et: f64) -> Quaternion {
        let [w, i, j, k] = self.orientation;
        let q0 = Quaternion::from_quaternion(nalgebra::Quaternion::new(w, i, j, k));
        let angle = -self.spin_rate * (et - self.epoch);
        Quaternion::from_axis_angle(&Vector3::z_axis(), angle) * q0
    }
}

impl Default for BodyRotation {
    fn default() -> Self {
        Self::inertial()
    }
}

/// The body being imaged.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub shape: ShapeModel,
    pub rotation: BodyRotation,
}

impl Target {
    /// Body-fixed point → J2000 (target-centered) at `et`.
    pub fn to_j2000(&self, body_fixed: &Vector3, et: f64) -> Vector3 {
        self.rotation.at(et).inverse_transform_vector(body_fixed)
    }

    /// J2000 (target-centered) vector → body-fixed at `et`.
    pub fn to_body_fixed(&self, j2000: &Vector3, et: f64) -> Vector3 {
        self.rotation.at(et).transform_vector(j2000)
    }
}

/// A ray's first crossing of the target surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePoint {
    pub body_fixed: Vector3,
    /// Target-centered J2000 position at the ray time.
    pub j2000: Vector3,
    /// Observer → surface distance, km.
    pub range_km: f64,
}

/// Outcome of a ray/body test.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    Surface(SurfacePoint),
    Miss,
}

impl Intersection {
    pub fn is_hit(&self) -> bool {
        matches!(self, Intersection::Surface(_))
    }
}

/// Nearest forward intersection of `ray` with the target.
pub fn intersect(target: &Target, ray: &LookRay) -> Intersection {
    let q = target.rotation.at(ray.et);
    let origin = q.transform_vector(&ray.origin);
    let dir = q.transform_vector(&ray.direction);
    match target.shape.ray_parameter(&origin, &dir) {
        Some(t) => {
            let body_fixed = origin + dir * t;
            Intersection::Surface(SurfacePoint {
                body_fixed,
                j2000: q.inverse_transform_vector(&body_fixed),
                range_km: t * dir.norm(),
            })
        }
        None => Intersection::Miss,
    }
}

/// Whether `body_fixed` is the first surface crossing seen from `observer`
/// (J2000, target-centered) at `et`.
pub fn visible(target: &Target, observer: &Vector3, body_fixed: &Vector3, et: f64) -> bool {
    let point = target.to_j2000(body_fixed, et);
    let to_point = point - observer;
    let range = to_point.norm();
    if range == 0.0 {
        return false;
    }
    let ray = LookRay {
        origin: *observer,
        direction: to_point / range,
        et,
    };
    match intersect(target, &ray) {
        Intersection::Surface(hit) => (hit.range_km - range).abs() <= 1e-6 * range.max(1.0),
        Intersection::Miss => false,
    }
}
