//! Line-scan (pushbroom) reprojection: ideal timing, label and pixels.

mod scene;

use noproj::{
    GeometrySource, InstrumentType, PixelClass, ReprojectConfig, Reprojector, SpecsTable, TimeModel,
};
use scene::{init_tracing, pushbroom_camera, smooth, smooth_pixels, test_specs};

#[test]
fn test_linescan_geometry_and_label() {
    init_tracing();
    let camera = pushbroom_camera();
    let config = ReprojectConfig::default();
    let r = Reprojector::with_specs(&camera, None, &test_specs(), &config).unwrap();
    let p = r.parameters();
    assert_eq!(p.instrument_type, InstrumentType::LineScan);
    assert_eq!(p.line_detectors, 1);
    assert_eq!((p.output_samples, p.output_lines), (200, 200));

    let inst = &r.label().instrument;
    assert_eq!(inst.get("InstrumentType"), Some("LINESCAN"));
    assert_eq!(inst.get("LineDetectors"), Some("1"));
    assert_eq!(inst.get("LineExposureDuration"), Some("50"));
}

#[test]
fn test_linescan_summing_scales_time() {
    let camera = pushbroom_camera();
    let config = ReprojectConfig {
        source: GeometrySource::FromUser,
        summing: 2.0,
        ..Default::default()
    };
    let r = Reprojector::with_specs(&camera, None, &test_specs(), &config).unwrap();
    let ideal = r.ideal_camera();
    assert_eq!((ideal.image_samples, ideal.image_lines), (100, 100));
    match ideal.time {
        TimeModel::LineScan { start_et, line_rate, .. } => {
            assert_eq!(start_et, 0.0);
            assert!((line_rate - 0.1).abs() < 1e-15);
        }
        TimeModel::Framing { .. } => panic!("ideal camera lost its line-scan timing"),
    }
    // Both cameras span the same time.
    let span = |c: &noproj::CameraModel| {
        c.time_at_line(c.image_lines as f64 + 0.5) - c.ephemeris_time()
    };
    assert!((span(ideal) - span(&camera)).abs() < 1e-12);
}

#[test]
fn test_linescan_pixels_follow_the_ground() {
    let camera = pushbroom_camera();
    let input = smooth_pixels(&camera);
    let config = ReprojectConfig::default();
    let r = Reprojector::with_specs(&camera, None, &test_specs(), &config).unwrap();
    let product = r.run(&input).unwrap();

    let mut on_body = 0;
    for l in (10..=190).step_by(20) {
        for s in (60..=140).step_by(20) {
            let geometry = r.pixel(s as f64, l as f64);
            assert_eq!(geometry.classification.class, PixelClass::OnBody, "({}, {})", s, l);
            // Same timing and pinhole optics: the ideal grid coincides with the input.
            let (src_s, src_l) = geometry.classification.source.unwrap();
            assert!(
                (src_s - s as f64).abs() < 1e-5 && (src_l - l as f64).abs() < 1e-5,
                "({}, {}) came from ({}, {})",
                s,
                l,
                src_s,
                src_l
            );
            let v = product.image.get(s, l, 1).unwrap();
            assert!((v - smooth(s as f64, l as f64, 1)).abs() < 1e-6);
            on_body += 1;
        }
    }
    assert_eq!(on_body, 50);
}

#[test]
fn test_builtin_ctx_offsets() {
    let mut camera = pushbroom_camera();
    camera.spacecraft_name = "MARS RECONNAISSANCE ORBITER".to_string();
    camera.instrument_id = "CTX".to_string();
    camera.focal_plane = noproj::FocalPlaneMap::oriented(
        0.007,
        [100.5, 1.0],
        noproj::FocalPlaneAxis::Line,
        1.0,
        1.0,
        [0.0, 0.0],
    );
    let builtin = SpecsTable::builtin().unwrap();
    let r = Reprojector::with_specs(&camera, None, &builtin, &ReprojectConfig::default()).unwrap();
    let p = r.parameters();
    assert_eq!(p.sample_detectors, 4991);
    assert_eq!(p.line_detectors, 1);
    assert_eq!(p.offsets.trans_y0, Some(-0.39031635));
    assert_eq!(p.offsets.itrans_s0, Some(55.759479));
    assert_eq!(p.offsets.trans_x0, None);
    assert_eq!(r.label().instrument.get("TransS0"), Some("55.759479"));
}
