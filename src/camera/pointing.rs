//! In-memory instrument pointing and spacecraft ephemeris tables.
//!
//! Kernel loading is the caller's business; these tables only hold samples
//! that were already resolved for the image and interpolate between them.
//! Attitudes are stored as `[w, i, j, k]` quaternions rotating J2000 vectors
//! into the instrument frame (`v_inst = q · v_j2000`).

use rkyv::{Archive, Deserialize, Serialize};

use crate::{Quaternion, Vector3};

/// Instrument attitude at one ephemeris time.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct AttitudeSample {
    pub et: f64,
    /// J2000 → instrument rotation, `[w, i, j, k]`.
    pub quaternion: [f64; 4],
}

impl AttitudeSample {
    pub fn new(et: f64, rotation: &Quaternion) -> Self {
        Self {
            et,
            quaternion: [rotation.w, rotation.i, rotation.j, rotation.k],
        }
    }

    pub fn rotation(&self) -> Quaternion {
        let [w, i, j, k] = self.quaternion;
        Quaternion::from_quaternion(nalgebra::Quaternion::new(w, i, j, k))
    }
}

/// Instrument pointing history, sorted by time.
///
/// Interpolates with slerp between samples and holds the end attitudes
/// outside the covered interval.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct InstrumentPointing {
    samples: Vec<AttitudeSample>,
}

impl InstrumentPointing {
    /// Constant attitude.
    pub fn fixed(rotation: &Quaternion) -> Self {
        Self {
            samples: vec![AttitudeSample::new(0.0, rotation)],
        }
    }

    /// Build from samples in any order. At least one sample is required.
    pub fn from_samples(mut samples: Vec<AttitudeSample>) -> Self {
        assert!(!samples.is_empty(), "pointing needs at least one sample");
        samples.sort_by(|a, b| a.et.total_cmp(&b.et));
        Self { samples }
    }

    pub fn samples(&self) -> &[AttitudeSample] {
        &self.samples
    }

    /// J2000 → instrument rotation at `et`.
    pub fn at(&self, et: f64) -> Quaternion {
        let n = self.samples.len();
        let idx = self.samples.partition_point(|s| s.et <= et);
        if idx == 0 {
            return self.samples[0].rotation();
        }
        if idx == n {
            return self.samples[n - 1].rotation();
        }
        let (s0, s1) = (&self.samples[idx - 1], &self.samples[idx]);
        let t = (et - s0.et) / (s1.et - s0.et);
        let (q0, q1) = (s0.rotation(), s1.rotation());
        q0.try_slerp(&q1, t, 1e-12)
            .unwrap_or_else(|| q0.nlerp(&q1, t))
    }
}

/// Spacecraft position at one ephemeris time, km from the target center in J2000.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StateSample {
    pub et: f64,
    pub position_km: [f64; 3],
}

/// Spacecraft trajectory relative to the target, sorted by time.
///
/// Linear interpolation between samples; the end segments extrapolate
/// linearly so line-scan searches slightly past the image stay smooth.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SpacecraftEphemeris {
    samples: Vec<StateSample>,
}

impl SpacecraftEphemeris {
    /// Stationary observer.
    pub fn fixed(position_km: Vector3) -> Self {
        Self {
            samples: vec![StateSample {
                et: 0.0,
                position_km: position_km.into(),
            }],
        }
    }

    /// Uniform motion from `position_km` at `et`.
    pub fn linear(et: f64, position_km: Vector3, velocity_km_s: Vector3) -> Self {
        let later = position_km + velocity_km_s;
        Self::from_samples(vec![
            StateSample {
                et,
                position_km: position_km.into(),
            },
            StateSample {
                et: et + 1.0,
                position_km: later.into(),
            },
        ])
    }

    /// Build from samples in any order. At least one sample is required.
    pub fn from_samples(mut samples: Vec<StateSample>) -> Self {
        assert!(!samples.is_empty(), "ephemeris needs at least one sample");
        samples.sort_by(|a, b| a.et.total_cmp(&b.et));
        Self { samples }
    }

    pub fn samples(&self) -> &[StateSample] {
        &self.samples
    }

    /// Observer position at `et`.
    pub fn position_at(&self, et: f64) -> Vector3 {
        let n = self.samples.len();
        if n == 1 {
            return Vector3::from(self.samples[0].position_km);
        }
        let idx = self.samples.partition_point(|s| s.et <= et).clamp(1, n - 1);
        let (s0, s1) = (&self.samples[idx - 1], &self.samples[idx]);
        let t = (et - s0.et) / (s1.et - s0.et);
        let p0 = Vector3::from(s0.position_km);
        let p1 = Vector3::from(s1.position_km);
        p0 + (p1 - p0) * t
    }
}
