//! Output label groups for the ideal image, rendered as PVL text.

use std::fmt;

use crate::camera::{CameraModel, InstrumentType, TimeModel};
use crate::ideal::IdealCameraParameters;

/// One `Group = NAME … End_Group` block of keyword/value pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PvlGroup {
    pub name: String,
    keywords: Vec<(String, String)>,
}

impl PvlGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
        }
    }

    /// Append a keyword; values are written with their `Display` form.
    pub fn add(&mut self, keyword: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.keywords.push((keyword.into(), value.to_string()));
        self
    }

    /// Case-insensitive keyword lookup.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
            .map(|(_, v)| v.as_str())
    }

    pub fn keywords(&self) -> &[(String, String)] {
        &self.keywords
    }
}

impl fmt::Display for PvlGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.keywords.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        writeln!(f, "Group = {}", self.name)?;
        for (k, v) in &self.keywords {
            if v.is_empty() || v.contains(char::is_whitespace) {
                writeln!(f, "  {:<width$} = \"{}\"", k, v, width = width)?;
            } else {
                writeln!(f, "  {:<width$} = {}", k, v, width = width)?;
            }
        }
        writeln!(f, "End_Group")
    }
}

/// Label of the ideal output image.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentLabel {
    pub instrument: PvlGroup,
    /// Instrument group of the input image, copied verbatim.
    pub original_instrument: PvlGroup,
    pub kernels: PvlGroup,
}

impl InstrumentLabel {
    /// Build the label from the ideal geometry, the ideal camera, the input
    /// camera and the camera the geometry was matched to.
    pub fn new(
        params: &IdealCameraParameters,
        ideal: &CameraModel,
        input: &CameraModel,
        matched: &CameraModel,
    ) -> Self {
        let mut instrument = PvlGroup::new("Instrument");
        instrument
            .add("SpacecraftName", &ideal.spacecraft_name)
            .add("InstrumentId", &ideal.instrument_id)
            .add("TargetName", &ideal.target.name)
            .add("SampleDetectors", params.sample_detectors)
            .add("LineDetectors", params.line_detectors)
            .add("InstrumentType", params.instrument_type.label_value())
            .add("EphemerisTime", ideal.ephemeris_time())
            .add("StartTime", &ideal.start_time)
            .add("FocalPlaneXDependency", params.focal_plane_x_dependency.label_value())
            .add("TransX", params.trans_x)
            .add("TransY", params.trans_y);
        let offsets = [
            ("TransX0", params.offsets.trans_x0),
            ("TransY0", params.offsets.trans_y0),
            ("TransS0", params.offsets.itrans_s0),
            ("TransL0", params.offsets.itrans_l0),
        ];
        for (key, value) in offsets {
            if let Some(v) = value {
                instrument.add(key, v);
            }
        }
        if let (InstrumentType::LineScan, TimeModel::LineScan { line_rate, .. }) =
            (params.instrument_type, &ideal.time)
        {
            instrument.add("LineExposureDuration", line_rate * 1000.0);
        }
        instrument.add("MatchedCube", &matched.source_name);

        let mut original_instrument = PvlGroup::new("OriginalInstrument");
        for (k, v) in &input.instrument_group {
            original_instrument.add(k, v);
        }

        let mut kernels = PvlGroup::new("Kernels");
        kernels
            .add("NaifFrameCode", params.reference_frame_id)
            .add("IdealFocalLength", params.focal_length_mm)
            .add("IdealPixelPitch", params.pixel_pitch_mm);

        Self {
            instrument,
            original_instrument,
            kernels,
        }
    }

    pub fn to_pvl(&self) -> String {
        format!(
            "{}{}{}",
            self.instrument, self.original_instrument, self.kernels
        )
    }
}
