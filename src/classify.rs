//! On-body / off-body classification of output pixels.
//!
//! Classification is a pure function of the intersection outcome and the
//! off-body policy. The sky back projection is passed in lazily so that runs
//! with off-body pixels disabled never pay for it.

use crate::camera::ImageBounds;
use crate::sky::BackProjection;

/// Default distance, in actual-image pixels, an off-body source position must
/// keep from every edge when trimming. Matches the half-width of the cubic
/// convolution footprint.
pub const DEFAULT_TRIM_MARGIN: f64 = 2.0;

/// What to do with output pixels that do not see the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffBodyPolicy {
    /// Resample off-body pixels from the sky back projection.
    ///
    /// Default `false`.
    pub offbody: bool,
    /// Null off-body pixels whose source position is near the image edge.
    ///
    /// Default `false`.
    pub offbodytrim: bool,
    /// Edge margin used by `offbodytrim`, in actual-image pixels.
    ///
    /// Default [`DEFAULT_TRIM_MARGIN`].
    pub trim_margin: f64,
}

impl Default for OffBodyPolicy {
    fn default() -> Self {
        Self {
            offbody: false,
            offbodytrim: false,
            trim_margin: DEFAULT_TRIM_MARGIN,
        }
    }
}

/// Per-pixel validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelClass {
    OnBody,
    OffBodyValid,
    OffBodyNull,
}

impl PixelClass {
    /// Whether the pixel gets a resampled value.
    pub fn is_valid(self) -> bool {
        !matches!(self, PixelClass::OffBodyNull)
    }

    pub fn label(self) -> &'static str {
        match self {
            PixelClass::OnBody => "ON_BODY",
            PixelClass::OffBodyValid => "OFF_BODY_VALID",
            PixelClass::OffBodyNull => "OFF_BODY_NULL",
        }
    }
}

/// Where a ray's surface point lands in the actual camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceMapping {
    /// Visible surface point inside the actual image.
    Mapped { sample: f64, line: f64 },
    /// Surface hit that the actual camera did not image.
    OutOfImage,
    /// The ray missed the target.
    Miss,
}

/// Classification result with the actual-image source position to resample
/// from, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class: PixelClass,
    pub source: Option<(f64, f64)>,
}

impl Classification {
    fn null() -> Self {
        Self {
            class: PixelClass::OffBodyNull,
            source: None,
        }
    }
}

/// Classify one output pixel.
pub fn classify<F>(
    policy: &OffBodyPolicy,
    surface: SurfaceMapping,
    bounds: &ImageBounds,
    back_project: F,
) -> Classification
where
    F: FnOnce() -> BackProjection,
{
    if let SurfaceMapping::Mapped { sample, line } = surface {
        if bounds.contains(sample, line) {
            return Classification {
                class: PixelClass::OnBody,
                source: Some((sample, line)),
            };
        }
    }
    if !policy.offbody {
        return Classification::null();
    }
    match back_project() {
        BackProjection::InImage { sample, line } => {
            let margin = if policy.offbodytrim {
                policy.trim_margin
            } else {
                0.0
            };
            if bounds.contains_with_margin(sample, line, margin) {
                Classification {
                    class: PixelClass::OffBodyValid,
                    source: Some((sample, line)),
                }
            } else {
                Classification::null()
            }
        }
        BackProjection::OutOfRange => Classification::null(),
    }
}
