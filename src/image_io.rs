//! Load pixel buffers from common raster formats.
//!
//! Grayscale images give one band, color images three (alpha is dropped).
//! Integer samples keep their raw values; no radiometric scaling is applied.

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};

use crate::resample::ImageCube;

/// Read an image file into a band-sequential [`ImageCube`].
pub fn load_image_cube(path: impl AsRef<Path>) -> Result<ImageCube> {
    let img = image::open(path.as_ref())
        .with_context(|| format!("Failed to open image: {}", path.as_ref().display()))?;
    image_cube_from_dynamic(&img)
}

/// Convert an already-loaded [`DynamicImage`].
pub fn image_cube_from_dynamic(img: &DynamicImage) -> Result<ImageCube> {
    let (width, height) = img.dimensions();
    let (bands, interleaved): (u32, Vec<f64>) = match img {
        DynamicImage::ImageLuma8(g) => (1, g.as_raw().iter().map(|&v| v as f64).collect()),
        DynamicImage::ImageLuma16(g) => (1, g.as_raw().iter().map(|&v| v as f64).collect()),
        DynamicImage::ImageLumaA8(g) => (1, g.pixels().map(|p| p.0[0] as f64).collect()),
        DynamicImage::ImageLumaA16(g) => (1, g.pixels().map(|p| p.0[0] as f64).collect()),
        DynamicImage::ImageRgb16(rgb) => (3, rgb.as_raw().iter().map(|&v| v as f64).collect()),
        DynamicImage::ImageRgba16(rgba) => (
            3,
            rgba.pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .map(|v| v as f64)
                .collect(),
        ),
        DynamicImage::ImageRgb32F(rgb) => (3, rgb.as_raw().iter().map(|&v| v as f64).collect()),
        DynamicImage::ImageRgba32F(rgba) => (
            3,
            rgba.pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .map(|v| v as f64)
                .collect(),
        ),
        _ => {
            let rgb = img.to_rgb8();
            (3, rgb.as_raw().iter().map(|&v| v as f64).collect())
        }
    };

    // Pixel-interleaved → band-sequential.
    let plane = width as usize * height as usize;
    let mut data = vec![0.0; plane * bands as usize];
    for (i, v) in interleaved.iter().enumerate() {
        let (pixel, band) = (i / bands as usize, i % bands as usize);
        data[band * plane + pixel] = *v;
    }
    Ok(ImageCube::from_data(width, height, bands, data)?)
}
