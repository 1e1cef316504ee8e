//! Image ↔ detector ↔ focal-plane coordinate maps.
//!
//! # Coordinate conventions
//!
//! - **Image coordinates** `(sample, line)`: 1-based, pixel centers at integers,
//!   +sample right, +line down. The first pixel spans 0.5..1.5.
//! - **Detector coordinates**: the same convention on the full, unsummed
//!   detector. [`DetectorMap`] accounts for summing and cropping.
//! - **Focal-plane coordinates** `(x, y)`: millimetres relative to the
//!   boresight. [`FocalPlaneMap`] is an affine map between detector offsets
//!   from the boresight pixel and focal-plane millimetres.

use rkyv::{Archive, Deserialize, Serialize};

/// Detector axis primarily driven by focal-plane x.
///
/// Written to labels as `FocalPlaneXDependency`: 1 for sample, 2 for line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum FocalPlaneAxis {
    Sample,
    Line,
}

impl FocalPlaneAxis {
    pub fn label_value(self) -> u8 {
        match self {
            FocalPlaneAxis::Sample => 1,
            FocalPlaneAxis::Line => 2,
        }
    }
}

/// Image → detector mapping: on-chip summing and the crop origin.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct DetectorMap {
    /// Detector pixels combined into one image pixel along each axis.
    pub summing: f64,
    /// Detector sample at the left edge of image sample 1.
    pub starting_sample: f64,
    /// Detector line at the top edge of image line 1.
    pub starting_line: f64,
}

impl DetectorMap {
    /// Full-frame readout with no summing.
    pub fn unsummed() -> Self {
        Self::summed(1.0)
    }

    /// Full-frame readout with `summing`×`summing` binning.
    pub fn summed(summing: f64) -> Self {
        Self {
            summing,
            starting_sample: 0.5,
            starting_line: 0.5,
        }
    }

    pub fn image_to_detector(&self, sample: f64, line: f64) -> (f64, f64) {
        (
            self.starting_sample + (sample - 0.5) * self.summing,
            self.starting_line + (line - 0.5) * self.summing,
        )
    }

    pub fn detector_to_image(&self, det_sample: f64, det_line: f64) -> (f64, f64) {
        (
            (det_sample - self.starting_sample) / self.summing + 0.5,
            (det_line - self.starting_line) / self.summing + 0.5,
        )
    }
}

impl Default for DetectorMap {
    fn default() -> Self {
        Self::unsummed()
    }
}

/// Affine detector ↔ focal-plane map.
///
/// ```text
/// x  = trans_x[0]  + trans_x[1]·ds  + trans_x[2]·dl
/// y  = trans_y[0]  + trans_y[1]·ds  + trans_y[2]·dl
/// ds = itrans_s[0] + itrans_s[1]·x  + itrans_s[2]·y
/// dl = itrans_l[0] + itrans_l[1]·x  + itrans_l[2]·y
/// ```
///
/// where `ds`, `dl` are detector offsets from `detector_origin`. The inverse
/// coefficients are always derived from the forward ones.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FocalPlaneMap {
    /// Detector (sample, line) of the boresight.
    pub detector_origin: [f64; 2],
    pub trans_x: [f64; 3],
    pub trans_y: [f64; 3],
    pub itrans_s: [f64; 3],
    pub itrans_l: [f64; 3],
}

impl FocalPlaneMap {
    /// Build from the forward transform. The linear part must be invertible.
    pub fn new(detector_origin: [f64; 2], trans_x: [f64; 3], trans_y: [f64; 3]) -> Self {
        let (a, b) = (trans_x[1], trans_x[2]);
        let (c, d) = (trans_y[1], trans_y[2]);
        let det = a * d - b * c;
        assert!(det.abs() > 1e-30, "focal plane transform is singular");
        let (i00, i01, i10, i11) = (d / det, -b / det, -c / det, a / det);
        let (tx, ty) = (trans_x[0], trans_y[0]);
        Self {
            detector_origin,
            trans_x,
            trans_y,
            itrans_s: [-(i00 * tx + i01 * ty), i00, i01],
            itrans_l: [-(i10 * tx + i11 * ty), i10, i11],
        }
    }

    /// Square pixels, +x along +sample and +y along +line.
    pub fn aligned(pixel_pitch_mm: f64, origin_sample: f64, origin_line: f64) -> Self {
        Self::oriented(
            pixel_pitch_mm,
            [origin_sample, origin_line],
            FocalPlaneAxis::Sample,
            1.0,
            1.0,
            [0.0, 0.0],
        )
    }

    /// Square pixels with x tied to `x_axis`, axis signs `trans_x`/`trans_y`
    /// (±1) and a constant focal-plane offset in millimetres.
    pub fn oriented(
        pixel_pitch_mm: f64,
        detector_origin: [f64; 2],
        x_axis: FocalPlaneAxis,
        trans_x: f64,
        trans_y: f64,
        offset_mm: [f64; 2],
    ) -> Self {
        let px = trans_x * pixel_pitch_mm;
        let py = trans_y * pixel_pitch_mm;
        let (tx, ty) = match x_axis {
            FocalPlaneAxis::Sample => ([offset_mm[0], px, 0.0], [offset_mm[1], 0.0, py]),
            FocalPlaneAxis::Line => ([offset_mm[0], 0.0, px], [offset_mm[1], py, 0.0]),
        };
        Self::new(detector_origin, tx, ty)
    }

    pub fn detector_to_focal(&self, det_sample: f64, det_line: f64) -> (f64, f64) {
        let ds = det_sample - self.detector_origin[0];
        let dl = det_line - self.detector_origin[1];
        (
            self.trans_x[0] + self.trans_x[1] * ds + self.trans_x[2] * dl,
            self.trans_y[0] + self.trans_y[1] * ds + self.trans_y[2] * dl,
        )
    }

    pub fn focal_to_detector(&self, x: f64, y: f64) -> (f64, f64) {
        let [s, l] = self.detector_origin;
        (
            s + self.itrans_s[0] + self.itrans_s[1] * x + self.itrans_s[2] * y,
            l + self.itrans_l[0] + self.itrans_l[1] * x + self.itrans_l[2] * y,
        )
    }

    /// Detector displacement produced by a focal-plane displacement.
    pub fn focal_delta_to_detector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (
            self.itrans_s[1] * dx + self.itrans_s[2] * dy,
            self.itrans_l[1] * dx + self.itrans_l[2] * dy,
        )
    }

    /// Geometric-mean pixel size in millimetres.
    pub fn pixel_pitch(&self) -> f64 {
        let det = self.trans_x[1] * self.trans_y[2] - self.trans_x[2] * self.trans_y[1];
        det.abs().sqrt()
    }

    /// Which detector axis focal-plane x mostly drives.
    pub fn x_dependency(&self) -> FocalPlaneAxis {
        if self.itrans_s[1].abs() >= self.itrans_l[1].abs() {
            FocalPlaneAxis::Sample
        } else {
            FocalPlaneAxis::Line
        }
    }

    /// Signs (±1) of the x and y axes relative to the detector axes they drive.
    pub fn axis_signs(&self) -> (f64, f64) {
        let (dx, dy) = match self.x_dependency() {
            FocalPlaneAxis::Sample => (self.itrans_s[1], self.itrans_l[2]),
            FocalPlaneAxis::Line => (self.itrans_l[1], self.itrans_s[2]),
        };
        (sign(dx), sign(dy))
    }
}

fn sign(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_map_roundtrip() {
        let map = DetectorMap {
            summing: 2.0,
            starting_sample: 10.5,
            starting_line: 0.5,
        };
        // Image pixel 1 covers detector 10.5..12.5, centered at 11.5.
        let (ds, dl) = map.image_to_detector(1.0, 1.0);
        assert!((ds - 11.5).abs() < 1e-12 && (dl - 1.5).abs() < 1e-12);
        let (s, l) = map.detector_to_image(ds, dl);
        assert!((s - 1.0).abs() < 1e-12 && (l - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_focal_plane_roundtrip_with_offset() {
        let map = FocalPlaneMap::oriented(
            0.012,
            [512.5, 512.5],
            FocalPlaneAxis::Line,
            1.0,
            -1.0,
            [-92.9979, 0.0],
        );
        for &(s, l) in &[(1.0, 1.0), (512.5, 512.5), (1000.0, 20.0)] {
            let (x, y) = map.detector_to_focal(s, l);
            let (s2, l2) = map.focal_to_detector(x, y);
            assert!(
                (s - s2).abs() < 1e-9 && (l - l2).abs() < 1e-9,
                "Roundtrip failed for ({}, {}): got ({}, {})",
                s,
                l,
                s2,
                l2
            );
        }
        // A line offset of -92.9979 mm at 0.012 mm/px sits 7749.825 px from origin.
        assert!((map.itrans_l[0] - 7749.825).abs() < 1e-6);
    }

    #[test]
    fn test_orientation_recovery() {
        for axis in [FocalPlaneAxis::Sample, FocalPlaneAxis::Line] {
            for (tx, ty) in [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)] {
                let map = FocalPlaneMap::oriented(0.01, [0.0, 0.0], axis, tx, ty, [0.0, 0.0]);
                assert_eq!(map.x_dependency(), axis);
                assert_eq!(map.axis_signs(), (tx, ty), "axis {:?}", axis);
            }
        }
    }

    #[test]
    fn test_pixel_pitch() {
        let map = FocalPlaneMap::aligned(0.0075, 0.0, 0.0);
        assert!((map.pixel_pitch() - 0.0075).abs() < 1e-15);
    }
}
