//! In-memory pixel buffers and sub-pixel resampling.
//!
//! Image coordinates are 1-based with pixel centers at integers. Every kernel
//! fails closed: if any tap with non-zero weight falls outside the buffer or
//! on a null pixel, the result is `None`.

use std::str::FromStr;

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{NoprojError, Result};

/// Positions this close to a pixel center are treated as exactly on it.
const CENTER_SNAP: f64 = 1e-9;
/// Keys cubic convolution parameter.
const CUBIC_A: f64 = -0.5;

/// Multi-band image, band-sequential, nulls stored as NaN.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ImageCube {
    pub samples: u32,
    pub lines: u32,
    pub bands: u32,
    data: Vec<f64>,
}

impl ImageCube {
    /// All-null cube.
    pub fn new(samples: u32, lines: u32, bands: u32) -> Self {
        let len = samples as usize * lines as usize * bands as usize;
        Self {
            samples,
            lines,
            bands,
            data: vec![f64::NAN; len],
        }
    }

    /// Fill from `f(sample, line, band)`, all 1-based.
    pub fn from_fn<F>(samples: u32, lines: u32, bands: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32, u32) -> Option<f64>,
    {
        let mut cube = Self::new(samples, lines, bands);
        for b in 1..=bands {
            for l in 1..=lines {
                for s in 1..=samples {
                    cube.set(s, l, b, f(s, l, b));
                }
            }
        }
        cube
    }

    /// Wrap band-sequential data (NaN = null).
    pub fn from_data(samples: u32, lines: u32, bands: u32, data: Vec<f64>) -> Result<Self> {
        let expected = samples as usize * lines as usize * bands as usize;
        if data.len() != expected {
            return Err(NoprojError::IncompatibleGeometry(format!(
                "{} pixels supplied for a {}x{}x{} cube",
                data.len(),
                samples,
                lines,
                bands
            )));
        }
        Ok(Self {
            samples,
            lines,
            bands,
            data,
        })
    }

    fn index(&self, sample: u32, line: u32, band: u32) -> Option<usize> {
        if sample == 0 || line == 0 || band == 0 {
            return None;
        }
        if sample > self.samples || line > self.lines || band > self.bands {
            return None;
        }
        let (s, l, b) = (sample as usize - 1, line as usize - 1, band as usize - 1);
        Some((b * self.lines as usize + l) * self.samples as usize + s)
    }

    /// Pixel value, or `None` when null or outside the cube.
    pub fn get(&self, sample: u32, line: u32, band: u32) -> Option<f64> {
        let v = self.data[self.index(sample, line, band)?];
        (!v.is_nan()).then_some(v)
    }

    /// Store a value (`None` = null). Out-of-range writes are ignored.
    pub fn set(&mut self, sample: u32, line: u32, band: u32, value: Option<f64>) {
        if let Some(i) = self.index(sample, line, band) {
            self.data[i] = value.unwrap_or(f64::NAN);
        }
    }

    /// Raw band plane, line-major.
    pub fn band(&self, band: u32) -> &[f64] {
        let n = self.samples as usize * self.lines as usize;
        let start = (band as usize - 1) * n;
        &self.data[start..start + n]
    }

    pub fn band_mut(&mut self, band: u32) -> &mut [f64] {
        let n = self.samples as usize * self.lines as usize;
        let start = (band as usize - 1) * n;
        &mut self.data[start..start + n]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Archive, Serialize, Deserialize)]
pub enum Interpolation {
    NearestNeighbor,
    Bilinear,
    /// Keys cubic convolution over a 4×4 footprint.
    #[default]
    CubicConvolution,
}

impl FromStr for Interpolation {
    type Err = NoprojError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearestneighbor" => Ok(Interpolation::NearestNeighbor),
            "bilinear" => Ok(Interpolation::Bilinear),
            "cubicconvolution" => Ok(Interpolation::CubicConvolution),
            other => Err(NoprojError::InvalidOption(format!(
                "unknown interpolation \"{}\"",
                other
            ))),
        }
    }
}

/// Interpolating reader over one image.
#[derive(Debug, Clone, Copy)]
pub struct Resampler<'a> {
    image: &'a ImageCube,
    interpolation: Interpolation,
}

impl<'a> Resampler<'a> {
    pub fn new(image: &'a ImageCube, interpolation: Interpolation) -> Self {
        Self {
            image,
            interpolation,
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Interpolated value at a fractional `(sample, line)` of `band`.
    pub fn sample(&self, sample: f64, line: f64, band: u32) -> Option<f64> {
        if !sample.is_finite() || !line.is_finite() {
            return None;
        }
        let sample = snap(sample);
        let line = snap(line);
        match self.interpolation {
            Interpolation::NearestNeighbor => {
                let (s, l) = ((sample + 0.5).floor(), (line + 0.5).floor());
                if s < 1.0 || l < 1.0 {
                    return None;
                }
                self.image.get(s as u32, l as u32, band)
            }
            Interpolation::Bilinear => {
                let (s0, fs) = split(sample);
                let (l0, fl) = split(line);
                self.convolve(band, s0, &[1.0 - fs, fs], l0, &[1.0 - fl, fl])
            }
            Interpolation::CubicConvolution => {
                let (s0, fs) = split(sample);
                let (l0, fl) = split(line);
                self.convolve(band, s0 - 1, &cubic_weights(fs), l0 - 1, &cubic_weights(fl))
            }
        }
    }

    /// Separable weighted sum with taps starting at `(s0, l0)`.
    fn convolve(&self, band: u32, s0: i64, ws: &[f64], l0: i64, wl: &[f64]) -> Option<f64> {
        let mut sum = 0.0;
        for (j, &wy) in wl.iter().enumerate() {
            if wy == 0.0 {
                continue;
            }
            for (i, &wx) in ws.iter().enumerate() {
                if wx == 0.0 {
                    continue;
                }
                let (s, l) = (s0 + i as i64, l0 + j as i64);
                if s < 1 || l < 1 {
                    return None;
                }
                sum += wx * wy * self.image.get(s as u32, l as u32, band)?;
            }
        }
        Some(sum)
    }
}

fn snap(x: f64) -> f64 {
    let r = x.round();
    if (x - r).abs() < CENTER_SNAP {
        r
    } else {
        x
    }
}

fn split(x: f64) -> (i64, f64) {
    let base = x.floor();
    (base as i64, x - base)
}

fn cubic_weights(t: f64) -> [f64; 4] {
    [keys(1.0 + t), keys(t), keys(1.0 - t), keys(2.0 - t)]
}

fn keys(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ImageCube {
        ImageCube::from_fn(8, 6, 2, |s, l, b| Some(s as f64 + 10.0 * l as f64 + 100.0 * b as f64))
    }

    #[test]
    fn test_cube_indexing() {
        let cube = ramp();
        assert_eq!(cube.get(1, 1, 1), Some(111.0));
        assert_eq!(cube.get(8, 6, 2), Some(268.0));
        assert_eq!(cube.get(0, 1, 1), None);
        assert_eq!(cube.get(9, 1, 1), None);
        assert_eq!(cube.band(2)[0], 211.0);
        assert!(ImageCube::from_data(2, 2, 1, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_kernels_reproduce_linear_ramp() {
        let cube = ramp();
        for interp in [Interpolation::Bilinear, Interpolation::CubicConvolution] {
            let r = Resampler::new(&cube, interp);
            let v = r.sample(4.25, 3.5, 1).unwrap();
            assert!(
                (v - (4.25 + 35.0 + 100.0)).abs() < 1e-9,
                "{:?} gave {}",
                interp,
                v
            );
        }
        let nn = Resampler::new(&cube, Interpolation::NearestNeighbor);
        assert_eq!(nn.sample(4.6, 3.4, 2), Some(5.0 + 30.0 + 200.0));
    }

    #[test]
    fn test_exact_center_at_edge() {
        let cube = ramp();
        let r = Resampler::new(&cube, Interpolation::CubicConvolution);
        assert_eq!(r.sample(1.0, 1.0, 1), Some(111.0));
        assert_eq!(r.sample(8.0 + 1e-12, 6.0, 1), Some(168.0));
    }

    #[test]
    fn test_fails_closed() {
        let mut cube = ramp();
        let r = Resampler::new(&cube, Interpolation::CubicConvolution);
        // Footprint reaches pixel 0.
        assert_eq!(r.sample(1.5, 3.0, 1), None);
        assert_eq!(Resampler::new(&cube, Interpolation::Bilinear).sample(8.5, 3.0, 1), None);

        cube.set(5, 4, 1, None);
        let r = Resampler::new(&cube, Interpolation::Bilinear);
        assert_eq!(r.sample(4.5, 3.5, 1), None);
        assert!(r.sample(4.5, 3.5, 2).is_some());
        assert!(r.sample(f64::NAN, 3.0, 1).is_none());
    }

    #[test]
    fn test_parse_interpolation() {
        assert_eq!(
            "CubicConvolution".parse::<Interpolation>().unwrap(),
            Interpolation::CubicConvolution
        );
        assert_eq!(Interpolation::default(), Interpolation::CubicConvolution);
        assert!("lanczos".parse::<Interpolation>().is_err());
    }
}
