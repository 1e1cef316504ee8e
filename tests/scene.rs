//! Synthetic cameras and pixels shared by the integration tests.
//!
//! The standard scene: a 55 km sphere at the origin, the spacecraft 1000 km
//! away on -Y, boresight along J2000 +Y with celestial north up in the image.

#![allow(dead_code)]

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use noproj::{
    BodyRotation, CameraModel, DetectorMap, FocalPlaneMap, ImageCube, InstrumentPointing,
    OpticalDistortion, RadialDistortion, ShapeModel, SpacecraftEphemeris, SpecsTable, Target,
    TimeModel,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

pub const TEST_SPACECRAFT: &str = "TEST_SPACECRAFT";
pub const TEST_CAMERA: &str = "TEST_CAMERA";
pub const TEST_PUSHBROOM: &str = "TEST_PUSHBROOM";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

/// J2000 → instrument rotation with +Z along J2000 +Y and north up.
pub fn north_up() -> UnitQuaternion<f64> {
    let rot = Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot))
}

pub fn sphere(name: &str, radius_km: f64) -> Target {
    Target {
        name: name.to_string(),
        shape: ShapeModel::Sphere { radius_km },
        rotation: BodyRotation::inertial(),
    }
}

fn instrument_group(
    spacecraft: &str,
    instrument: &str,
    extra: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut group = vec![
        ("SpacecraftName".to_string(), spacecraft.to_string()),
        ("InstrumentId".to_string(), instrument.to_string()),
    ];
    group.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    group
}

/// 200×160 framing camera, 0.05 mm pixels, f = 100 mm, mild pincushion
/// distortion, two bands.
pub fn framing_camera() -> CameraModel {
    CameraModel {
        spacecraft_name: TEST_SPACECRAFT.to_string(),
        instrument_id: TEST_CAMERA.to_string(),
        source_name: "framing.cub".to_string(),
        start_time: "2010-06-01T00:00:00".to_string(),
        frame_id: -99001,
        image_samples: 200,
        image_lines: 160,
        bands: 2,
        focal_length_mm: 100.0,
        focal_plane: FocalPlaneMap::aligned(0.05, 100.5, 80.5),
        detector: DetectorMap::unsummed(),
        distortion: OpticalDistortion::Radial(RadialDistortion::new(2e-4, 0.0, 0.0)),
        time: TimeModel::Framing { et: 328_622_466.0 },
        pointing: InstrumentPointing::fixed(&north_up()),
        ephemeris: SpacecraftEphemeris::fixed(Vector3::new(0.0, -1000.0, 0.0)),
        target: sphere("TEST_MOON", 55.0),
        instrument_group: instrument_group(
            TEST_SPACECRAFT,
            TEST_CAMERA,
            &[("ExposureDuration", "12.5"), ("FilterName", "CLEAR")],
        ),
    }
}

/// The framing camera's geometry as recorded on a 2×2-summed match image:
/// 100×80 pixels, one band, taken 30 s later with the boresight tipped
/// 0.01 rad about the instrument X axis.
pub fn match_camera() -> CameraModel {
    let tipped = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.01) * north_up();
    CameraModel {
        source_name: "match.cub".to_string(),
        image_samples: 100,
        image_lines: 80,
        bands: 1,
        detector: DetectorMap::summed(2.0),
        time: TimeModel::Framing { et: 328_622_496.0 },
        pointing: InstrumentPointing::fixed(&tipped),
        ..framing_camera()
    }
}

/// Pushbroom over the same body: one detector row at the boresight, the
/// spacecraft moving along -Z at 5 km/s, 0.05 s per line.
pub fn pushbroom_camera() -> CameraModel {
    CameraModel {
        spacecraft_name: TEST_SPACECRAFT.to_string(),
        instrument_id: TEST_PUSHBROOM.to_string(),
        source_name: "pushbroom.cub".to_string(),
        start_time: "2010-06-01T00:00:00".to_string(),
        frame_id: -99002,
        image_samples: 200,
        image_lines: 200,
        bands: 1,
        focal_length_mm: 100.0,
        focal_plane: FocalPlaneMap::aligned(0.05, 100.5, 1.0),
        detector: DetectorMap::unsummed(),
        distortion: OpticalDistortion::None,
        time: TimeModel::LineScan {
            start_et: 0.0,
            line_rate: 0.05,
            detector_line: 1.0,
        },
        pointing: InstrumentPointing::fixed(&north_up()),
        ephemeris: SpacecraftEphemeris::linear(
            0.0,
            Vector3::new(0.0, -1000.0, 25.0),
            Vector3::new(0.0, 0.0, -5.0),
        ),
        target: sphere("TEST_MOON", 55.0),
        instrument_group: instrument_group(
            TEST_SPACECRAFT,
            TEST_PUSHBROOM,
            &[("LineExposureDuration", "50.0")],
        ),
    }
}

/// Viking-sized framing camera looking at Mars.
pub fn viking_camera() -> CameraModel {
    CameraModel {
        spacecraft_name: "VIKING_ORBITER_1".to_string(),
        instrument_id: "VISUAL_IMAGING_SUBSYSTEM_CAMERA_B".to_string(),
        source_name: "f348b26.cub".to_string(),
        start_time: "1977-07-09T20:05:51".to_string(),
        frame_id: -27002,
        image_samples: 1204,
        image_lines: 1056,
        bands: 1,
        focal_length_mm: 474.61,
        focal_plane: FocalPlaneMap::aligned(0.0119, 602.5, 528.5),
        detector: DetectorMap::unsummed(),
        distortion: OpticalDistortion::Radial(RadialDistortion::new(8e-6, 0.0, 0.0)),
        time: TimeModel::Framing {
            et: -709_401_200.26114,
        },
        pointing: InstrumentPointing::fixed(&north_up()),
        ephemeris: SpacecraftEphemeris::fixed(Vector3::new(0.0, -12_000.0, 0.0)),
        target: sphere("MARS", 3396.19),
        instrument_group: instrument_group(
            "VIKING_ORBITER_1",
            "VISUAL_IMAGING_SUBSYSTEM_CAMERA_B",
            &[
                ("TargetName", "MARS"),
                ("StartTime", "1977-07-09T20:05:51"),
                ("FloodModeId", "ON"),
            ],
        ),
    }
}

/// Specs entries for the synthetic instruments.
pub fn test_specs() -> SpecsTable {
    SpecsTable::parse(
        r#"
        Object = IdealInstrumentsSpecifications
          Group = "TEST_SPACECRAFT/TEST_CAMERA"
            DetectorSamples = 200
            DetectorLines   = 160
          End_Group
          Group = "TEST_SPACECRAFT/TEST_PUSHBROOM"
            DetectorSamples = 200
          End_Group
        End_Object
        End
        "#,
    )
    .expect("test specs parse")
}

/// Smooth sinusoidal pixels with seeded Gaussian noise.
pub fn pixels(camera: &CameraModel, seed: u64) -> ImageCube {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.01).unwrap();
    ImageCube::from_fn(camera.image_samples, camera.image_lines, camera.bands, |s, l, b| {
        Some(smooth(s as f64, l as f64, b) + noise.sample(&mut rng))
    })
}

/// Noise-free pixel field.
pub fn smooth(sample: f64, line: f64, band: u32) -> f64 {
    100.0 * band as f64 + 10.0 * (sample / 17.0).sin() + 5.0 * (line / 11.0).cos()
}

/// Same pixels without noise.
pub fn smooth_pixels(camera: &CameraModel) -> ImageCube {
    ImageCube::from_fn(camera.image_samples, camera.image_lines, camera.bands, |s, l, b| {
        Some(smooth(s as f64, l as f64, b))
    })
}
