//! # noproj
//!
//! Reprojection of images from real, distorted planetary cameras onto an
//! **ideal camera**: a distortion-free pinhole with a regular detector grid
//! that shares the original camera's pointing, position and timing.
//!
//! Given an actual camera model and its pixels, `noproj` builds the ideal
//! camera from a table of ideal instrument specifications, traces every ideal
//! pixel to the target body (or the sky), finds where that point was recorded
//! in the actual image, and resamples it. It can also report the celestial
//! position of any pixel.
//!
//! ## Features
//!
//! - **Framing and line-scan cameras** — time-varying pointing and ephemeris
//!   interpolated from in-memory tables
//! - **Optical distortion** — radial and full 2D polynomial models with
//!   Newton inverses
//! - **Off-body pixels** — optionally resampled from the sky, with edge trimming
//! - **Specs table** — built-in ideal geometry merged field by field with
//!   user overrides
//! - **Parallel** — output lines are processed with [rayon](https://docs.rs/rayon);
//!   results are identical run to run
//! - **Zero-copy products** — outputs serialize with [rkyv](https://docs.rs/rkyv)
//!
//! ## Example
//!
//! ```no_run
//! use noproj::{CameraModel, ImageCube, ReprojectConfig, Reprojector};
//!
//! fn reproject(camera: &CameraModel, pixels: &ImageCube) -> anyhow::Result<()> {
//!     let config = ReprojectConfig {
//!         offbody: true,
//!         offbodytrim: true,
//!         ..Default::default()
//!     };
//!     let reprojector = Reprojector::new(camera, None, &config)?;
//!     let product = reprojector.run(pixels)?;
//!     println!("{}", product.label);
//!
//!     let report = product.sky_point(20.0, 30.0, 1)?;
//!     println!("{}", report.to_pvl());
//!     product.save_to_file("ideal.rkyv")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Ideal geometry** — resolve the instrument's specs entry, apply summing
//!    and expansion, and copy axis orientation from the actual focal plane
//! 2. **Ray casting** — each ideal pixel becomes a J2000 look ray at its
//!    observation time
//! 3. **Intersection** — the ray is intersected with the target's sphere or
//!    ellipsoid in the body-fixed frame
//! 4. **Back projection** — the surface point (or, off body, the sky direction)
//!    is mapped through the actual camera's pointing and distortion
//! 5. **Classification and resampling** — on-body / off-body policy decides
//!    validity; valid pixels are interpolated from the actual image and
//!    folded into per-band statistics

pub mod camera;
pub mod classify;
pub mod distortion;
mod error;
pub mod ideal;
#[cfg(feature = "image")]
pub mod image_io;
pub mod intersect;
pub mod label;
pub mod raycast;
pub mod reproject;
pub mod resample;
pub mod sky;
pub mod specs;
pub mod stats;

pub use camera::{
    CameraModel, DetectorMap, FocalPlaneAxis, FocalPlaneMap, ImageBounds, InstrumentPointing,
    InstrumentType, SpacecraftEphemeris, TimeModel,
};
pub use classify::{classify, Classification, OffBodyPolicy, PixelClass, SurfaceMapping};
pub use distortion::{OpticalDistortion, PolynomialDistortion, RadialDistortion};
pub use error::{NoprojError, Result};
pub use ideal::{Expansion, IdealCameraParameters, SummingMode, TransformOffsets};
#[cfg(feature = "image")]
pub use image_io::{image_cube_from_dynamic, load_image_cube};
pub use intersect::{intersect, BodyRotation, Intersection, ShapeModel, SurfacePoint, Target};
pub use label::{InstrumentLabel, PvlGroup};
pub use raycast::{look_vector, LookRay};
pub use reproject::{
    GeometrySource, OutputPixelRecord, PixelGeometry, ReprojectConfig, ReprojectionProduct,
    Reprojector,
};
pub use resample::{ImageCube, Interpolation, Resampler};
pub use sky::{
    back_project, back_project_sky_point, project_to_sky, sky_point_report, BackProjection,
    SkyPoint, SkyPointReport,
};
pub use specs::{InstrumentGeometrySpec, SpecsEntry, SpecsTable};
pub use stats::{BandStatistics, StatisticsAccumulator};

// Commonly used types
pub type Quaternion = nalgebra::UnitQuaternion<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Rotation = nalgebra::Rotation3<f64>;
