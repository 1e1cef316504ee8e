//! Actual camera model: image pixels ↔ J2000 look directions.
//!
//! A [`CameraModel`] bundles everything needed to turn an image coordinate
//! into a ray and back: detector summing and crop, the focal-plane affine map,
//! optical distortion, focal length, the time model, and in-memory pointing
//! and ephemeris tables. The ideal camera built by [`crate::ideal`] is the
//! same type with [`OpticalDistortion::None`].
//!
//! # Coordinate conventions
//!
//! - **Image**: `(sample, line)`, 1-based, pixel centers at integers.
//! - **Instrument frame**: +Z along the boresight, +X along focal-plane x,
//!   +Y along focal-plane y. A focal-plane point `(x, y)` looks along
//!   `(x, y, f)`.
//! - **J2000**: working inertial frame; positions in km from the target center.
//!
//! # Pipeline
//!
//! ```text
//! image → detector (summing, crop) → focal plane (affine) → undistort
//! → (x, y, f) → J2000
//! J2000 → instrument → (x, y) on the focal plane → distort → detector → image
//! ```
//!
//! Line-scan cameras map image line to time; the inverse searches for the line
//! whose exposure sees the direction on the sensor's detector line.

pub mod focal_plane;
pub mod pointing;

use rkyv::{Archive, Deserialize, Serialize};

use crate::distortion::OpticalDistortion;
use crate::intersect::{self, Target};
use crate::{Quaternion, Vector3};

pub use focal_plane::{DetectorMap, FocalPlaneAxis, FocalPlaneMap};
pub use pointing::{AttitudeSample, InstrumentPointing, SpacecraftEphemeris, StateSample};

/// Coarse scan segments used to bracket a line-scan inverse.
const LINE_SEARCH_SEGMENTS: usize = 32;
/// Line-scan inverse stops when the bracket is narrower than this, in lines.
const LINE_SEARCH_TOLERANCE: f64 = 1e-9;
/// ...or when the detector-line residual is below this, in detector lines.
const LINE_RESIDUAL_TOLERANCE: f64 = 1e-10;
const LINE_SEARCH_MAX_ITERATIONS: usize = 100;

/// Readout geometry of the instrument, as written to labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum InstrumentType {
    Framing,
    LineScan,
}

impl InstrumentType {
    pub fn label_value(self) -> &'static str {
        match self {
            InstrumentType::Framing => "FRAMING",
            InstrumentType::LineScan => "LINESCAN",
        }
    }
}

/// Image line → ephemeris time.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum TimeModel {
    /// Whole frame exposed at the same time.
    Framing { et: f64 },
    /// One image line per `line_rate` seconds, starting at the top edge of line 1.
    LineScan {
        start_et: f64,
        line_rate: f64,
        /// Detector line of the single active sensor row.
        detector_line: f64,
    },
}

/// Valid image extent, 0.5..N+0.5 along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBounds {
    pub samples: u32,
    pub lines: u32,
}

impl ImageBounds {
    pub fn contains(&self, sample: f64, line: f64) -> bool {
        self.contains_with_margin(sample, line, 0.0)
    }

    /// Inside the image and at least `margin` pixels from every edge.
    pub fn contains_with_margin(&self, sample: f64, line: f64, margin: f64) -> bool {
        sample >= 0.5 + margin
            && sample <= self.samples as f64 + 0.5 - margin
            && line >= 0.5 + margin
            && line <= self.lines as f64 + 0.5 - margin
    }
}

/// Geometry of one imaging instrument for one image.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct CameraModel {
    pub spacecraft_name: String,
    pub instrument_id: String,
    /// Name of the cube this geometry came from, recorded as `MatchedCube`.
    pub source_name: String,
    /// UTC start time as found on the source label.
    pub start_time: String,
    /// Reference frame id of the instrument, written as `NaifFrameCode`.
    pub frame_id: i32,
    pub image_samples: u32,
    pub image_lines: u32,
    pub bands: u32,
    pub focal_length_mm: f64,
    pub focal_plane: FocalPlaneMap,
    pub detector: DetectorMap,
    pub distortion: OpticalDistortion,
    pub time: TimeModel,
    pub pointing: InstrumentPointing,
    pub ephemeris: SpacecraftEphemeris,
    pub target: Target,
    /// Instrument keywords of the source label, in order.
    pub instrument_group: Vec<(String, String)>,
}

impl CameraModel {
    /// `SPACECRAFT/INSTRUMENT`, the key used to look up ideal geometry.
    pub fn instrument_key(&self) -> String {
        format!("{}/{}", self.spacecraft_name, self.instrument_id)
    }

    pub fn instrument_type(&self) -> InstrumentType {
        match self.time {
            TimeModel::Framing { .. } => InstrumentType::Framing,
            TimeModel::LineScan { .. } => InstrumentType::LineScan,
        }
    }

    /// Reference time of the image: exposure time, or start of the first line.
    pub fn ephemeris_time(&self) -> f64 {
        match self.time {
            TimeModel::Framing { et } => et,
            TimeModel::LineScan { start_et, .. } => start_et,
        }
    }

    pub fn time_at_line(&self, line: f64) -> f64 {
        match self.time {
            TimeModel::Framing { et } => et,
            TimeModel::LineScan {
                start_et, line_rate, ..
            } => start_et + (line - 0.5) * line_rate,
        }
    }

    /// Detector lines covered by the image before summing.
    pub fn native_detector_lines(&self) -> u32 {
        match self.time {
            TimeModel::Framing { .. } => {
                (self.image_lines as f64 * self.detector.summing).round() as u32
            }
            TimeModel::LineScan { .. } => 1,
        }
    }

    pub fn bounds(&self) -> ImageBounds {
        ImageBounds {
            samples: self.image_samples,
            lines: self.image_lines,
        }
    }

    pub fn contains(&self, sample: f64, line: f64) -> bool {
        self.bounds().contains(sample, line)
    }

    /// Angular size of one image pixel at the boresight, radians.
    pub fn pixel_resolution_rad(&self) -> f64 {
        self.focal_plane.pixel_pitch() * self.detector.summing / self.focal_length_mm
    }

    /// J2000 → instrument rotation at `et`.
    pub fn pointing_at(&self, et: f64) -> Quaternion {
        self.pointing.at(et)
    }

    /// Spacecraft position (J2000, km from the target center) at `et`.
    pub fn position_at(&self, et: f64) -> Vector3 {
        self.ephemeris.position_at(et)
    }

    /// Unit J2000 look direction and time for an image coordinate.
    ///
    /// Returns `None` when the distortion inverse fails.
    pub fn look_direction(&self, sample: f64, line: f64) -> Option<(Vector3, f64)> {
        let et = self.time_at_line(line);
        let (det_sample, mut det_line) = self.detector.image_to_detector(sample, line);
        if let TimeModel::LineScan { detector_line, .. } = self.time {
            det_line = detector_line;
        }
        let (xd, yd) = self.focal_plane.detector_to_focal(det_sample, det_line);
        let (x, y) = self.distortion.to_ideal(xd, yd)?;
        let v_inst = Vector3::new(x, y, self.focal_length_mm).normalize();
        Some((self.pointing_at(et).inverse_transform_vector(&v_inst), et))
    }

    /// Instrument-frame direction → detector `(sample, line)`.
    ///
    /// `None` when the direction points behind the focal plane.
    pub fn instrument_to_detector(&self, v_inst: &Vector3) -> Option<(f64, f64)> {
        if v_inst.z <= 0.0 {
            return None;
        }
        let x = self.focal_length_mm * v_inst.x / v_inst.z;
        let y = self.focal_length_mm * v_inst.y / v_inst.z;
        let (xd, yd) = self.distortion.to_distorted(x, y);
        Some(self.focal_plane.focal_to_detector(xd, yd))
    }

    /// Image coordinate that sees a fixed J2000 direction (a sky point).
    ///
    /// The result is not bounds-checked; line-scan searches are limited to
    /// the image's time span.
    pub fn direction_to_image(&self, direction: &Vector3) -> Option<(f64, f64)> {
        self.solve_image(|_| Some(*direction))
    }

    /// Image coordinate of a body-fixed surface point, if the point is on the
    /// visible side of the target when it is imaged.
    pub fn ground_to_image(&self, body_fixed: &Vector3) -> Option<(f64, f64)> {
        let (sample, line) = self.solve_image(|et| {
            Some(self.target.to_j2000(body_fixed, et) - self.position_at(et))
        })?;
        let et = self.time_at_line(line);
        let observer = self.position_at(et);
        intersect::visible(&self.target, &observer, body_fixed, et).then_some((sample, line))
    }

    fn project_at(&self, direction: &Vector3, et: f64) -> Option<(f64, f64)> {
        let v_inst = self.pointing_at(et).transform_vector(direction);
        self.instrument_to_detector(&v_inst)
    }

    fn solve_image<F>(&self, direction_at: F) -> Option<(f64, f64)>
    where
        F: Fn(f64) -> Option<Vector3>,
    {
        match self.time {
            TimeModel::Framing { et } => {
                let (ds, dl) = self.project_at(&direction_at(et)?, et)?;
                Some(self.detector.detector_to_image(ds, dl))
            }
            TimeModel::LineScan { detector_line, .. } => {
                // Residual of the detector line seen at the time of image line `l`.
                let residual = |l: f64| -> Option<(f64, f64)> {
                    let et = self.time_at_line(l);
                    let (ds, dl) = self.project_at(&direction_at(et)?, et)?;
                    Some((dl - detector_line, ds))
                };
                let line = find_line(&residual, 0.5, self.image_lines as f64 + 0.5)?;
                let (_, ds) = residual(line)?;
                let (sample, _) = self.detector.detector_to_image(ds, 0.5);
                Some((sample, line))
            }
        }
    }
}

/// Root of `residual(l).0` over `[lo, hi]`: coarse bracketing, then Illinois
/// regula falsi.
fn find_line<F>(residual: &F, lo: f64, hi: f64) -> Option<f64>
where
    F: Fn(f64) -> Option<(f64, f64)>,
{
    let step = (hi - lo) / LINE_SEARCH_SEGMENTS as f64;
    let mut prev: Option<(f64, f64)> = None;
    for i in 0..=LINE_SEARCH_SEGMENTS {
        let l = lo + step * i as f64;
        let Some((r, _)) = residual(l) else {
            prev = None;
            continue;
        };
        if r == 0.0 {
            return Some(l);
        }
        if let Some((pl, pr)) = prev {
            if pr.signum() != r.signum() {
                return refine_line(residual, (pl, pr), (l, r));
            }
        }
        prev = Some((l, r));
    }
    None
}

fn refine_line<F>(residual: &F, mut a: (f64, f64), mut b: (f64, f64)) -> Option<f64>
where
    F: Fn(f64) -> Option<(f64, f64)>,
{
    let mut side = 0i8;
    for _ in 0..LINE_SEARCH_MAX_ITERATIONS {
        let c = (a.0 * b.1 - b.0 * a.1) / (b.1 - a.1);
        let (rc, _) = residual(c)?;
        if rc.abs() < LINE_RESIDUAL_TOLERANCE || (b.0 - a.0).abs() < LINE_SEARCH_TOLERANCE {
            return Some(c);
        }
        if rc.signum() == b.1.signum() {
            b = (c, rc);
            if side == -1 {
                a.1 *= 0.5;
            }
            side = -1;
        } else {
            a = (c, rc);
            if side == 1 {
                b.1 *= 0.5;
            }
            side = 1;
        }
        if (b.0 - a.0).abs() < LINE_SEARCH_TOLERANCE {
            return Some(0.5 * (a.0 + b.0));
        }
    }
    Some(0.5 * (a.0 + b.0))
}

/// Synthetic camera shared by unit tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::distortion::RadialDistortion;
    use crate::intersect::{BodyRotation, ShapeModel};
    use crate::Rotation;

    /// 200×160 framing camera at (0, -1000, 0) km looking along +Y at a
    /// 55 km sphere, north up.
    pub(crate) fn framing_camera() -> CameraModel {
        let m = nalgebra::Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0);
        let q = Quaternion::from_rotation_matrix(&Rotation::from_matrix_unchecked(m));
        CameraModel {
            spacecraft_name: "TEST_SPACECRAFT".to_string(),
            instrument_id: "TEST_CAMERA".to_string(),
            source_name: "test.cub".to_string(),
            start_time: "2000-01-01T12:00:00".to_string(),
            frame_id: -99001,
            image_samples: 200,
            image_lines: 160,
            bands: 1,
            focal_length_mm: 100.0,
            focal_plane: FocalPlaneMap::aligned(0.05, 100.5, 80.5),
            detector: DetectorMap::unsummed(),
            distortion: OpticalDistortion::Radial(RadialDistortion::new(2e-4, 0.0, 0.0)),
            time: TimeModel::Framing { et: 0.0 },
            pointing: InstrumentPointing::fixed(&q),
            ephemeris: SpacecraftEphemeris::fixed(Vector3::new(0.0, -1000.0, 0.0)),
            target: Target {
                name: "TEST_TARGET".to_string(),
                shape: ShapeModel::Sphere { radius_km: 55.0 },
                rotation: BodyRotation::inertial(),
            },
            instrument_group: vec![
                ("SpacecraftName".to_string(), "TEST_SPACECRAFT".to_string()),
                ("InstrumentId".to_string(), "TEST_CAMERA".to_string()),
            ],
        }
    }
}
