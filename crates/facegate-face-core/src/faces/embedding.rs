use image::{DynamicImage, GrayImage, Luma, Rgb};
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::faces::decoder::PixelGrid;

/// Largest intensity after the 8-bit luminance collapse.
pub const MAX_INTENSITY: f64 = 255.0;

const LUMA_RED: f64 = 0.299;
const LUMA_GREEN: f64 = 0.587;
const LUMA_BLUE: f64 = 0.114;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Side length `S` of the canonical grid; embeddings have `S * S` values.
    pub image_size: u32,
}

impl EmbeddingConfig {
    pub fn new(image_size: u32) -> Self {
        Self { image_size }
    }

    pub fn embedding_len(&self) -> usize {
        let side = self.image_size as usize;
        side * side
    }
}

/// Grayscale, area-resize to `S x S`, scale into `[0, 1]`, flatten row-major.
pub fn generate_embedding(grid: &PixelGrid, config: &EmbeddingConfig) -> AppResult<Vec<f64>> {
    let (width, height) = (grid.width(), grid.height());
    if width == 0 || height == 0 {
        return Err(AppError::EmptyImage { width, height });
    }
    if config.image_size == 0 {
        return Err(AppError::InvalidConfig(
            "image_size must be greater than zero".into(),
        ));
    }

    let intensity = to_intensity(grid.as_image());
    let resized = resize_area(&intensity, config.image_size, config.image_size);
    let embedding: Vec<f64> = resized
        .pixels()
        .map(|pixel| f64::from(pixel[0]) / MAX_INTENSITY)
        .collect();

    debug!(
        source_width = width,
        source_height = height,
        len = embedding.len(),
        "generated embedding"
    );
    Ok(embedding)
}

fn to_intensity(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other if !other.color().has_color() => other.to_luma8(),
        other => {
            let rgb = other.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
                Luma([luminance(r, g, b)])
            })
        }
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let value = LUMA_RED * f64::from(r) + LUMA_GREEN * f64::from(g) + LUMA_BLUE * f64::from(b);
    value.round().clamp(0.0, MAX_INTENSITY) as u8
}

/// Each destination cell is the coverage-weighted mean of the source pixels under its box.
fn resize_area(src: &GrayImage, dst_width: u32, dst_height: u32) -> GrayImage {
    let (src_width, src_height) = src.dimensions();
    let x_spans: Vec<Vec<(u32, f64)>> = (0..dst_width)
        .map(|dx| coverage(dx, src_width, dst_width))
        .collect();
    let y_spans: Vec<Vec<(u32, f64)>> = (0..dst_height)
        .map(|dy| coverage(dy, src_height, dst_height))
        .collect();

    GrayImage::from_fn(dst_width, dst_height, |dx, dy| {
        let mut weighted = 0.0;
        let mut area = 0.0;
        for &(sy, wy) in &y_spans[dy as usize] {
            for &(sx, wx) in &x_spans[dx as usize] {
                let weight = wx * wy;
                weighted += f64::from(src.get_pixel(sx, sy)[0]) * weight;
                area += weight;
            }
        }
        let mean = if area > 0.0 { weighted / area } else { 0.0 };
        Luma([mean.round().clamp(0.0, MAX_INTENSITY) as u8])
    })
}

/// Source indices overlapped by destination cell `dst_index`, with the overlap length of each.
fn coverage(dst_index: u32, src_len: u32, dst_len: u32) -> Vec<(u32, f64)> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    let start = f64::from(dst_index) * scale;
    let end = (f64::from(dst_index + 1) * scale).min(f64::from(src_len));
    let first = start.floor() as u32;
    let last = (end.ceil() as u32).min(src_len);

    (first..last)
        .filter_map(|index| {
            let lo = start.max(f64::from(index));
            let hi = end.min(f64::from(index + 1));
            let overlap = hi - lo;
            (overlap > 0.0).then_some((index, overlap))
        })
        .collect()
}
