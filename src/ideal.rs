//! Ideal (distortion-free) camera geometry.
//!
//! The ideal camera keeps the basis camera's pointing, ephemeris, target,
//! timing, focal length and axis orientation, but replaces its detector with
//! the grid named in the specs table and drops optical distortion.

use rkyv::{Archive, Deserialize, Serialize};
use tracing::info;

use crate::camera::{
    CameraModel, DetectorMap, FocalPlaneAxis, FocalPlaneMap, InstrumentType, TimeModel,
};
use crate::distortion::OpticalDistortion;
use crate::error::{NoprojError, Result};
use crate::specs::InstrumentGeometrySpec;

pub const IDEAL_SPACECRAFT: &str = "IdealSpacecraft";
pub const IDEAL_INSTRUMENT: &str = "IdealCamera";

/// Where the ideal camera's summing comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SummingMode {
    /// Summing of the camera the geometry is matched to.
    #[default]
    UseMatchCubeSumming,
    UseInputCubeSumming,
    UserSpecified(f64),
}

/// Percent growth of the ideal detector beyond the specs size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Expansion {
    pub sample_percent: f64,
    pub line_percent: f64,
}

/// Constant offsets of the ideal focal-plane map.
///
/// `trans_x0`/`trans_y0` are focal-plane millimetres; `itrans_s0`/`itrans_l0`
/// are the same offsets expressed in detector pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct TransformOffsets {
    pub trans_x0: Option<f64>,
    pub trans_y0: Option<f64>,
    pub itrans_s0: Option<f64>,
    pub itrans_l0: Option<f64>,
}

impl TransformOffsets {
    /// Fill in the missing member of each forward/inverse pair.
    ///
    /// `x_axis` is the detector axis driven by x, `signs` the axis signs and
    /// `pitch_mm` the unsummed detector pitch.
    fn derive(
        spec: &InstrumentGeometrySpec,
        x_axis: FocalPlaneAxis,
        signs: (f64, f64),
        pitch_mm: f64,
    ) -> Self {
        let pair = |mm: Option<f64>, px: Option<f64>, sign: f64| match (mm, px) {
            (Some(mm), None) => (Some(mm), Some(-sign * mm / pitch_mm)),
            (None, Some(px)) => (Some(-sign * px * pitch_mm), Some(px)),
            other => other,
        };
        let (x_itrans, y_itrans) = match x_axis {
            FocalPlaneAxis::Sample => (spec.itrans_s, spec.itrans_l),
            FocalPlaneAxis::Line => (spec.itrans_l, spec.itrans_s),
        };
        let (trans_x0, ix) = pair(spec.trans_x, x_itrans, signs.0);
        let (trans_y0, iy) = pair(spec.trans_y, y_itrans, signs.1);
        let (itrans_s0, itrans_l0) = match x_axis {
            FocalPlaneAxis::Sample => (ix, iy),
            FocalPlaneAxis::Line => (iy, ix),
        };
        Self {
            trans_x0,
            trans_y0,
            itrans_s0,
            itrans_l0,
        }
    }
}

/// Everything needed to materialize the ideal camera and its label.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct IdealCameraParameters {
    /// Ideal detector samples after expansion and summing.
    pub sample_detectors: u32,
    /// Framing: unsummed lines after expansion. Line scan: 1.
    pub line_detectors: u32,
    pub output_samples: u32,
    pub output_lines: u32,
    pub summing: f64,
    pub focal_plane_x_dependency: FocalPlaneAxis,
    /// Sign (±1) of focal-plane x along its detector axis.
    pub trans_x: f64,
    /// Sign (±1) of focal-plane y along its detector axis.
    pub trans_y: f64,
    pub offsets: TransformOffsets,
    pub instrument_type: InstrumentType,
    pub reference_frame_id: i32,
    pub focal_length_mm: f64,
    /// Unsummed detector pixel pitch.
    pub pixel_pitch_mm: f64,
}

fn expand(base: u32, percent: f64) -> f64 {
    let base = base as f64;
    (base + base * percent / 100.0).round()
}

fn dimension(value: f64, what: &str) -> Result<u32> {
    if !(value >= 1.0) || value > u32::MAX as f64 {
        return Err(NoprojError::IncompatibleGeometry(format!(
            "{} would be {}",
            what, value
        )));
    }
    Ok(value as u32)
}

impl IdealCameraParameters {
    /// Derive ideal geometry from the camera it is matched to (`basis`), the
    /// input camera (for [`SummingMode::UseInputCubeSumming`]) and its specs.
    pub fn build(
        basis: &CameraModel,
        input: &CameraModel,
        spec: &InstrumentGeometrySpec,
        summing_mode: SummingMode,
        expansion: Expansion,
    ) -> Result<Self> {
        let summing = match summing_mode {
            SummingMode::UseMatchCubeSumming => basis.detector.summing,
            SummingMode::UseInputCubeSumming => input.detector.summing,
            SummingMode::UserSpecified(s) => s,
        };
        if !(summing.is_finite() && summing > 0.0) {
            return Err(NoprojError::IncompatibleGeometry(format!(
                "summing must be a positive number, got {}",
                summing
            )));
        }
        let percents = [
            ("sample", expansion.sample_percent),
            ("line", expansion.line_percent),
        ];
        for (axis, pct) in percents {
            if !pct.is_finite() || pct < 0.0 {
                return Err(NoprojError::InvalidOption(format!(
                    "{} expansion must be a non-negative percentage, got {}",
                    axis, pct
                )));
            }
        }

        let instrument_type = basis.instrument_type();
        let expanded_samples = expand(spec.detector_samples, expansion.sample_percent);
        let sample_detectors = dimension((expanded_samples / summing).round(), "sample detectors")?;
        let (line_detectors, output_lines) = match instrument_type {
            InstrumentType::Framing => {
                let base = spec.detector_lines.unwrap_or_else(|| basis.native_detector_lines());
                let expanded = expand(base, expansion.line_percent);
                (
                    dimension(expanded, "line detectors")?,
                    dimension((expanded / summing).round(), "output lines")?,
                )
            }
            InstrumentType::LineScan => {
                let lines = basis.image_lines as f64 * basis.detector.summing / summing;
                (1, dimension(lines.round(), "output lines")?)
            }
        };

        let x_axis = basis.focal_plane.x_dependency();
        let signs = basis.focal_plane.axis_signs();
        let pixel_pitch_mm = basis.focal_plane.pixel_pitch();
        let offsets = TransformOffsets::derive(spec, x_axis, signs, pixel_pitch_mm);

        let params = Self {
            sample_detectors,
            line_detectors,
            output_samples: sample_detectors,
            output_lines,
            summing,
            focal_plane_x_dependency: x_axis,
            trans_x: signs.0,
            trans_y: signs.1,
            offsets,
            instrument_type,
            reference_frame_id: basis.frame_id,
            focal_length_mm: basis.focal_length_mm,
            pixel_pitch_mm,
        };
        info!(
            "Ideal {} camera: {} x {} output, summing {}, x along {:?}",
            instrument_type.label_value(),
            params.output_samples,
            params.output_lines,
            summing,
            x_axis
        );
        Ok(params)
    }

    /// The ideal camera over the output grid.
    pub fn camera(&self, basis: &CameraModel) -> CameraModel {
        let origin_sample = self.output_samples as f64 / 2.0 + 0.5;
        let (origin_line, time) = match &basis.time {
            TimeModel::Framing { et } => (
                self.output_lines as f64 / 2.0 + 0.5,
                TimeModel::Framing { et: *et },
            ),
            TimeModel::LineScan {
                start_et, line_rate, ..
            } => (
                1.0,
                TimeModel::LineScan {
                    start_et: *start_et,
                    line_rate: line_rate * self.summing / basis.detector.summing,
                    detector_line: 1.0,
                },
            ),
        };
        let focal_plane = FocalPlaneMap::oriented(
            self.pixel_pitch_mm * self.summing,
            [origin_sample, origin_line],
            self.focal_plane_x_dependency,
            self.trans_x,
            self.trans_y,
            [
                self.offsets.trans_x0.unwrap_or(0.0),
                self.offsets.trans_y0.unwrap_or(0.0),
            ],
        );
        CameraModel {
            spacecraft_name: IDEAL_SPACECRAFT.to_string(),
            instrument_id: IDEAL_INSTRUMENT.to_string(),
            source_name: basis.source_name.clone(),
            start_time: basis.start_time.clone(),
            frame_id: self.reference_frame_id,
            image_samples: self.output_samples,
            image_lines: self.output_lines,
            bands: basis.bands,
            focal_length_mm: self.focal_length_mm,
            focal_plane,
            detector: DetectorMap::unsummed(),
            distortion: OpticalDistortion::None,
            time,
            pointing: basis.pointing.clone(),
            ephemeris: basis.ephemeris.clone(),
            target: basis.target.clone(),
            instrument_group: Vec::new(),
        }
    }
}
