//! Log-scaled rendering of a [`CooccurrenceTable`] into pixels.
//!
//! Pixel `(x, y)` (column `x`, row `y`) shows how often byte `x` was followed
//! by byte `y`. Every buffer produced here is row-major with that
//! orientation.

use image::{
    codecs::png::PngEncoder,
    error::{ParameterError, ParameterErrorKind},
    ColorType, ImageEncoder, ImageError, RgbImage,
};

use crate::{error::Result, table::CooccurrenceTable};

pub const CHANNELS: usize = 3;

/// Maps a count to a display intensity: `floor(ln(count) / max_log * 255)`.
///
/// A zero count is black. When `max_log` is zero every non-zero count in the
/// table is 1, i.e. already the maximum, so it renders white.
pub fn intensity(count: u64, max_log: f64) -> u8 {
    if count == 0 {
        return 0;
    }
    if max_log == 0.0 {
        return u8::MAX;
    }
    let t = (count as f64).ln() / max_log * 255.0;
    t.floor().clamp(0.0, 255.0) as u8
}

/// One intensity per cell, in table layout.
pub fn intensities(table: &CooccurrenceTable) -> Vec<u8> {
    let max_log = table.max_log();
    table
        .cells()
        .iter()
        .map(|&count| intensity(count, max_log))
        .collect()
}

/// Flat RGB buffer of `map_size * map_size * 3` bytes with R = G = B.
pub fn render_pixels(table: &CooccurrenceTable) -> Vec<u8> {
    let max_log = table.max_log();
    let mut pixels = vec![0u8; table.cells().len() * CHANNELS];
    for (i, &count) in table.cells().iter().enumerate() {
        if count == 0 {
            continue;
        }
        let v = intensity(count, max_log);
        pixels[i * CHANNELS..(i + 1) * CHANNELS].fill(v);
    }
    pixels
}

/// Intensities scaled to `[0, 1]`, the layout a classifier input expects.
pub fn normalized(table: &CooccurrenceTable) -> Vec<f32> {
    intensities(table)
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect()
}

pub fn render_image(table: &CooccurrenceTable) -> Result<RgbImage> {
    let size = u32::try_from(table.map_size()).map_err(|_| dimension_mismatch())?;
    RgbImage::from_raw(size, size, render_pixels(table))
        .ok_or_else(|| dimension_mismatch().into())
}

/// Encodes `image` as PNG into memory.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
    ))
}
