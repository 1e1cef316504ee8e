//! Look directions on the celestial sphere.
//!
//! Every output pixel has a sky position whether or not it sees the target.
//! This module converts look rays to RA/Dec with the clock angle of celestial
//! north, maps sky directions back into a camera, and produces the point
//! report for a single pixel.

use crate::camera::CameraModel;
use crate::error::{NoprojError, Result};
use crate::label::PvlGroup;
use crate::raycast::{self, LookRay};
use crate::resample::ImageCube;
use crate::Vector3;

use tracing::debug;

/// Angular step, in units of the pixel IFOV, used to find celestial north.
const NORTH_STEP_PIXELS: f64 = 2.0;

/// A look direction on the celestial sphere. All angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPoint {
    /// Right ascension in [0, 360).
    pub right_ascension: f64,
    /// Declination in [-90, 90].
    pub declination: f64,
    pub ephemeris_time: f64,
    /// Direction of celestial north, clockwise from image up, in [0, 360).
    pub celestial_north_clock_angle: f64,
}

impl SkyPoint {
    /// Unit J2000 direction of this point.
    pub fn direction(&self) -> Vector3 {
        direction_from_radec(self.right_ascension, self.declination)
    }
}

/// Unit J2000 vector → (RA, Dec) in degrees, RA in [0, 360).
pub fn radec_from_direction(direction: &Vector3) -> (f64, f64) {
    let d = direction.normalize();
    let ra = normalize_degrees(d.y.atan2(d.x).to_degrees());
    let dec = d.z.clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

/// (RA, Dec) in degrees → unit J2000 vector.
pub fn direction_from_radec(ra_deg: f64, dec_deg: f64) -> Vector3 {
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
}

fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Sky position of a look ray as seen by `camera`.
pub fn project_to_sky(camera: &CameraModel, ray: &LookRay) -> SkyPoint {
    let (right_ascension, declination) = radec_from_direction(&ray.direction);
    SkyPoint {
        right_ascension,
        declination,
        ephemeris_time: ray.et,
        celestial_north_clock_angle: north_clock_angle(camera, &ray.direction, ray.et),
    }
}

/// Clock angle of celestial north at `direction`, from the image displacement
/// of a small northward step.
fn north_clock_angle(camera: &CameraModel, direction: &Vector3, et: f64) -> f64 {
    let d = direction.normalize();
    let pole = Vector3::z();
    let tangent = pole - d * pole.dot(&d);
    if tangent.norm() < 1e-12 {
        // Looking at a celestial pole.
        return 0.0;
    }
    let step = NORTH_STEP_PIXELS * camera.pixel_resolution_rad();
    let north = d * step.cos() + tangent.normalize() * step.sin();

    let q = camera.pointing_at(et);
    let (v0, v1) = (q.transform_vector(&d), q.transform_vector(&north));
    let (ds, dl) = match (
        camera.instrument_to_detector(&v0),
        camera.instrument_to_detector(&v1),
    ) {
        (Some(p0), Some(p1)) => (p1.0 - p0.0, p1.1 - p0.1),
        _ => {
            debug!("north step left the focal plane; using instrument-frame difference");
            camera
                .focal_plane
                .focal_delta_to_detector(v1.x - v0.x, v1.y - v0.y)
        }
    };
    // Image up is -line.
    normalize_degrees(ds.atan2(-dl).to_degrees())
}

/// Where a direction lands in the actual image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackProjection {
    InImage { sample: f64, line: f64 },
    OutOfRange,
}

/// Map a J2000 direction into `camera`'s image.
///
/// `OutOfRange` when the direction is behind the camera, no line-scan line
/// sees it, or it lands outside 0.5..N+0.5.
pub fn back_project(camera: &CameraModel, direction: &Vector3) -> BackProjection {
    match camera.direction_to_image(direction) {
        Some((sample, line)) if camera.contains(sample, line) => {
            BackProjection::InImage { sample, line }
        }
        _ => BackProjection::OutOfRange,
    }
}

pub fn back_project_sky_point(camera: &CameraModel, point: &SkyPoint) -> BackProjection {
    back_project(camera, &point.direction())
}

/// Point report for one image pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPointReport {
    pub sample: f64,
    pub line: f64,
    pub sky: SkyPoint,
    /// Pixel value at the nearest pixel, `None` when null.
    pub pixel_value: Option<f64>,
}

impl SkyPointReport {
    pub fn to_group(&self) -> PvlGroup {
        let mut group = PvlGroup::new("SkyPoint");
        group
            .add("Sample", self.sample)
            .add("Line", self.line)
            .add("RightAscension", self.sky.right_ascension)
            .add("Declination", self.sky.declination)
            .add("EphemerisTime", self.sky.ephemeris_time);
        match self.pixel_value {
            Some(v) => group.add("PixelValue", v),
            None => group.add("PixelValue", "Null"),
        };
        group.add("CelestialNorthClockAngle", self.sky.celestial_north_clock_angle);
        group
    }

    pub fn to_pvl(&self) -> String {
        self.to_group().to_string()
    }
}

/// Sky position and pixel value at `(sample, line)` of `band`.
pub fn sky_point_report(
    camera: &CameraModel,
    image: &ImageCube,
    sample: f64,
    line: f64,
    band: u32,
) -> Result<SkyPointReport> {
    if !camera.contains(sample, line) {
        return Err(NoprojError::PixelOutOfRange { sample, line });
    }
    if band == 0 || band > camera.bands {
        return Err(NoprojError::InvalidOption(format!(
            "band {} outside 1..={}",
            band, camera.bands
        )));
    }
    let ray = raycast::look_vector(camera, sample, line, band)
        .ok_or(NoprojError::PixelOutOfRange { sample, line })?;
    let pixel_value = image.get(
        nearest_pixel(sample, image.samples),
        nearest_pixel(line, image.lines),
        band,
    );
    Ok(SkyPointReport {
        sample,
        line,
        sky: project_to_sky(camera, &ray),
        pixel_value,
    })
}

/// Nearest pixel center to `coord`, kept inside `1..=count` so the outer
/// half-pixel edges read their own pixel.
fn nearest_pixel(coord: f64, count: u32) -> u32 {
    ((coord + 0.5).floor() as u32).clamp(1, count.max(1))
}
