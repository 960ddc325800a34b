use std::io::Cursor;

use anyhow::{Context, Result};
use image::{imageops::FilterType, GenericImageView, ImageFormat};

/// Decodes any supported icon format and re-encodes it as a PNG no larger
/// than `max_edge` on either side.
pub fn normalize_icon(bytes: &[u8], max_edge: u32) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).context("decode icon bytes")?;
    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = calculate_target_size(width, height, max_edge);

    let resized = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Triangle)
    };

    let mut png = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("encode icon to png")?;
    Ok(png)
}

fn calculate_target_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }

    if width >= height {
        let scaled_height = ((height as f64) * (max_edge as f64) / (width as f64)).round() as u32;
        (max_edge, scaled_height.max(1))
    } else {
        let scaled_width = ((width as f64) * (max_edge as f64) / (height as f64)).round() as u32;
        (scaled_width.max(1), max_edge)
    }
}
