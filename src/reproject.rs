//! Reprojection of an actual image onto its ideal camera.
//!
//! # Pipeline
//!
//! ```text
//! specs table + match camera → IdealCameraParameters → ideal camera
//! for every output pixel:
//!     ideal look ray → body intersection → ground point in the input camera
//!                    ↘ (miss / not imaged) sky back projection, if enabled
//!     → classification → resample each band → statistics
//! ```
//!
//! Geometry is band-independent and computed once per output pixel. Output
//! lines are processed in parallel; each line accumulates its own statistics
//! partial, and partials are merged in line order so repeated runs agree
//! bit for bit.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use rayon::prelude::*;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::CameraModel;
use crate::classify::{
    self, Classification, OffBodyPolicy, PixelClass, SurfaceMapping, DEFAULT_TRIM_MARGIN,
};
use crate::error::{NoprojError, Result};
use crate::ideal::{Expansion, IdealCameraParameters, SummingMode};
use crate::intersect::{self, Intersection};
use crate::label::InstrumentLabel;
use crate::raycast::{self, LookRay};
use crate::resample::{ImageCube, Interpolation, Resampler};
use crate::sky::{self, SkyPoint, SkyPointReport};
use crate::specs::SpecsTable;
use crate::stats::StatisticsAccumulator;

/// Which camera's summing the ideal camera uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometrySource {
    #[default]
    FromMatch,
    FromInput,
    FromUser,
}

impl FromStr for GeometrySource {
    type Err = NoprojError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "frommatch" => Ok(GeometrySource::FromMatch),
            "frominput" => Ok(GeometrySource::FromInput),
            "fromuser" => Ok(GeometrySource::FromUser),
            other => Err(NoprojError::InvalidOption(format!(
                "unknown source \"{}\"",
                other
            ))),
        }
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectConfig {
    /// Where summing comes from. Default [`GeometrySource::FromMatch`].
    pub source: GeometrySource,
    /// Summing used with [`GeometrySource::FromUser`]. Default 1.0.
    pub summing: f64,
    /// Sample expansion in percent. Default 0.
    pub sample_expansion: f64,
    /// Line expansion in percent. Default 0.
    pub line_expansion: f64,
    /// Specs file whose entries override the built-in table. Default none.
    pub specs: Option<PathBuf>,
    /// Resample off-body pixels from the sky. Default `false`.
    pub offbody: bool,
    /// Null off-body pixels near the input image edge. Default `false`.
    pub offbodytrim: bool,
    /// Edge margin for `offbodytrim`, input pixels. Default [`DEFAULT_TRIM_MARGIN`].
    pub trim_margin: f64,
    /// Default [`Interpolation::CubicConvolution`].
    pub interpolation: Interpolation,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            source: GeometrySource::FromMatch,
            summing: 1.0,
            sample_expansion: 0.0,
            line_expansion: 0.0,
            specs: None,
            offbody: false,
            offbodytrim: false,
            trim_margin: DEFAULT_TRIM_MARGIN,
            interpolation: Interpolation::CubicConvolution,
        }
    }
}

impl ReprojectConfig {
    pub fn summing_mode(&self) -> SummingMode {
        match self.source {
            GeometrySource::FromMatch => SummingMode::UseMatchCubeSumming,
            GeometrySource::FromInput => SummingMode::UseInputCubeSumming,
            GeometrySource::FromUser => SummingMode::UserSpecified(self.summing),
        }
    }

    pub fn expansion(&self) -> Expansion {
        Expansion {
            sample_percent: self.sample_expansion,
            line_percent: self.line_expansion,
        }
    }

    pub fn policy(&self) -> OffBodyPolicy {
        OffBodyPolicy {
            offbody: self.offbody,
            offbodytrim: self.offbodytrim,
            trim_margin: self.trim_margin,
        }
    }
}

/// Geometry of one output pixel, shared by all bands.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGeometry {
    pub sample: f64,
    pub line: f64,
    /// `None` when the ideal camera could not form a ray.
    pub ray: Option<LookRay>,
    pub intersection: Intersection,
    pub classification: Classification,
}

/// One classified and resampled output value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputPixelRecord {
    pub sample: u32,
    pub line: u32,
    pub band: u32,
    pub class: PixelClass,
    pub source_sample: Option<f64>,
    pub source_line: Option<f64>,
    pub value: Option<f64>,
}

/// A configured reprojection from an input camera to its ideal camera.
#[derive(Debug, Clone)]
pub struct Reprojector {
    input: CameraModel,
    ideal: CameraModel,
    parameters: IdealCameraParameters,
    label: InstrumentLabel,
    policy: OffBodyPolicy,
    interpolation: Interpolation,
}

impl Reprojector {
    /// Load specs (built-in plus `config.specs`) and build the ideal camera.
    ///
    /// `matched` defaults to the input camera.
    pub fn new(
        input: &CameraModel,
        matched: Option<&CameraModel>,
        config: &ReprojectConfig,
    ) -> anyhow::Result<Self> {
        let specs = SpecsTable::load(config.specs.as_deref())?;
        Ok(Self::with_specs(input, matched, &specs, config)?)
    }

    /// Build against an already-loaded specs table.
    pub fn with_specs(
        input: &CameraModel,
        matched: Option<&CameraModel>,
        specs: &SpecsTable,
        config: &ReprojectConfig,
    ) -> Result<Self> {
        let matched = matched.unwrap_or(input);
        if !(config.trim_margin.is_finite() && config.trim_margin >= 0.0) {
            return Err(NoprojError::InvalidOption(format!(
                "trim margin must be non-negative, got {}",
                config.trim_margin
            )));
        }
        let key = matched.instrument_key();
        let spec = specs.resolve(&key)?;
        let parameters = IdealCameraParameters::build(
            matched,
            input,
            &spec,
            config.summing_mode(),
            config.expansion(),
        )?;
        let mut ideal = parameters.camera(matched);
        ideal.bands = input.bands;
        let label = InstrumentLabel::new(&parameters, &ideal, input, matched);
        info!(
            "Reprojecting {} ({} x {}) onto {} x {} ideal grid",
            input.instrument_key(),
            input.image_samples,
            input.image_lines,
            ideal.image_samples,
            ideal.image_lines
        );
        Ok(Self {
            input: input.clone(),
            ideal,
            parameters,
            label,
            policy: config.policy(),
            interpolation: config.interpolation,
        })
    }

    pub fn parameters(&self) -> &IdealCameraParameters {
        &self.parameters
    }

    pub fn ideal_camera(&self) -> &CameraModel {
        &self.ideal
    }

    pub fn label(&self) -> &InstrumentLabel {
        &self.label
    }

    pub fn policy(&self) -> &OffBodyPolicy {
        &self.policy
    }

    /// Classify output pixel `(sample, line)`.
    pub fn pixel(&self, sample: f64, line: f64) -> PixelGeometry {
        let Some(ray) = raycast::look_vector(&self.ideal, sample, line, 1) else {
            debug!("No ideal look vector at ({}, {})", sample, line);
            return PixelGeometry {
                sample,
                line,
                ray: None,
                intersection: Intersection::Miss,
                classification: Classification {
                    class: PixelClass::OffBodyNull,
                    source: None,
                },
            };
        };
        let intersection = intersect::intersect(&self.ideal.target, &ray);
        let surface = match &intersection {
            Intersection::Surface(point) => match self.input.ground_to_image(&point.body_fixed) {
                Some((s, l)) => SurfaceMapping::Mapped { sample: s, line: l },
                None => SurfaceMapping::OutOfImage,
            },
            Intersection::Miss => SurfaceMapping::Miss,
        };
        let classification = classify::classify(&self.policy, surface, &self.input.bounds(), || {
            sky::back_project(&self.input, &ray.direction)
        });
        PixelGeometry {
            sample,
            line,
            ray: Some(ray),
            intersection,
            classification,
        }
    }

    /// Sky position of output pixel `(sample, line)` in the ideal camera.
    pub fn sky_point(&self, sample: f64, line: f64) -> Option<SkyPoint> {
        let ray = raycast::look_vector(&self.ideal, sample, line, 1)?;
        Some(sky::project_to_sky(&self.ideal, &ray))
    }

    /// Full record for one output pixel and band.
    pub fn record(
        &self,
        image: &ImageCube,
        sample: u32,
        line: u32,
        band: u32,
    ) -> OutputPixelRecord {
        let geometry = self.pixel(sample as f64, line as f64);
        let resampler = Resampler::new(image, self.interpolation);
        self.resolve(&resampler, &geometry, sample, line, band)
    }

    fn resolve(
        &self,
        resampler: &Resampler<'_>,
        geometry: &PixelGeometry,
        sample: u32,
        line: u32,
        band: u32,
    ) -> OutputPixelRecord {
        let source = geometry.classification.source;
        let value = match (geometry.classification.class.is_valid(), source) {
            (true, Some((s, l))) => resampler.sample(s, l, band),
            _ => None,
        };
        OutputPixelRecord {
            sample,
            line,
            band,
            class: geometry.classification.class,
            source_sample: source.map(|(s, _)| s),
            source_line: source.map(|(_, l)| l),
            value,
        }
    }

    /// Reproject `image` (pixels of the input camera) onto the ideal grid.
    pub fn run(&self, image: &ImageCube) -> Result<ReprojectionProduct> {
        if image.samples != self.input.image_samples
            || image.lines != self.input.image_lines
            || image.bands != self.input.bands
        {
            return Err(NoprojError::IncompatibleGeometry(format!(
                "input pixels are {}x{}x{} but the camera is {}x{}x{}",
                image.samples,
                image.lines,
                image.bands,
                self.input.image_samples,
                self.input.image_lines,
                self.input.bands
            )));
        }
        let samples = self.ideal.image_samples;
        let lines = self.ideal.image_lines;
        let bands = image.bands;
        let resampler = Resampler::new(image, self.interpolation);

        let rows: Vec<(Vec<f64>, StatisticsAccumulator)> = (1..=lines)
            .into_par_iter()
            .map(|line| {
                let mut values = vec![f64::NAN; samples as usize * bands as usize];
                let mut stats = StatisticsAccumulator::new(bands);
                for sample in 1..=samples {
                    let geometry = self.pixel(sample as f64, line as f64);
                    for band in 1..=bands {
                        let record = self.resolve(&resampler, &geometry, sample, line, band);
                        stats.record(band, record.value);
                        if let Some(v) = record.value {
                            let index = (band as usize - 1) * samples as usize;
                            values[index + sample as usize - 1] = v;
                        }
                    }
                }
                (values, stats)
            })
            .collect();

        let mut output = ImageCube::new(samples, lines, bands);
        let mut statistics = StatisticsAccumulator::new(bands);
        for (row, (values, stats)) in rows.iter().enumerate() {
            let line = row + 1;
            for band in 1..=bands {
                let start = (band as usize - 1) * samples as usize;
                let plane = output.band_mut(band);
                let offset = (line - 1) * samples as usize;
                plane[offset..offset + samples as usize]
                    .copy_from_slice(&values[start..start + samples as usize]);
            }
            statistics.merge(stats);
        }

        for (i, band) in statistics.bands().iter().enumerate() {
            info!(
                "Band {}: {} valid, {} null, average {:?}, std dev {:?}",
                i + 1,
                band.valid_pixels(),
                band.null_pixels(),
                band.average(),
                band.standard_deviation()
            );
        }

        Ok(ReprojectionProduct {
            image: output,
            parameters: self.parameters.clone(),
            camera: self.ideal.clone(),
            label: self.label.to_pvl(),
            statistics,
        })
    }
}

/// Output of a run: ideal pixels, geometry, label and statistics.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ReprojectionProduct {
    pub image: ImageCube,
    pub parameters: IdealCameraParameters,
    pub camera: CameraModel,
    /// Output label rendered as PVL.
    pub label: String,
    pub statistics: StatisticsAccumulator,
}

impl ReprojectionProduct {
    /// Point report for output pixel `(sample, line)` of `band`.
    pub fn sky_point(&self, sample: f64, line: f64, band: u32) -> Result<SkyPointReport> {
        sky::sky_point_report(&self.camera, &self.image, sample, line, band)
    }

    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the product to a file using rkyv.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes).with_context(|| format!("writing {}", path))?;
        info!("Saved reprojection product to {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Load a product from an rkyv file.
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;
        let product = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&bytes)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        info!(
            "Loaded reprojection product: {} x {} x {}",
            product.image.samples, product.image.lines, product.image.bands
        );
        Ok(product)
    }
}
