use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;

use crate::errors::{AppError, AppResult};

const PAYLOAD_SEPARATOR: char = ',';

/// Decoded raster image, prior to any embedding work.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    image: DynamicImage,
}

impl PixelGrid {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

impl From<DynamicImage> for PixelGrid {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

/// Drops a leading descriptor such as `data:image/png;base64,`.
pub fn strip_payload_header(payload: &str) -> &str {
    match payload.split_once(PAYLOAD_SEPARATOR) {
        Some((_, data)) => data,
        None => payload,
    }
}

pub fn decode_payload(payload: &str) -> AppResult<PixelGrid> {
    let data: String = strip_payload_header(payload)
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    if data.is_empty() {
        return Err(AppError::InvalidPayload {
            message: "payload contains no image data".into(),
        });
    }

    let bytes = general_purpose::STANDARD
        .decode(data.as_bytes())
        .map_err(|err| AppError::InvalidPayload {
            message: format!("not valid base64: {err}"),
        })?;

    let image = image::load_from_memory(&bytes).map_err(|source| AppError::ImageDecode { source })?;
    Ok(PixelGrid::new(image))
}

pub fn encode_image_payload(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_payload(image: &DynamicImage) -> String {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        encode_image_payload(&cursor.into_inner())
    }

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(6, 4, |x, y| {
            Rgb([(x * 40) as u8, (y * 60) as u8, 90])
        }))
    }

    #[test]
    fn strip_header_keeps_data_after_first_separator() {
        assert_eq!(strip_payload_header("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_payload_header("QUJD"), "QUJD");
        assert_eq!(strip_payload_header("a,b,c"), "b,c");
    }

    #[test]
    fn decodes_plain_and_prefixed_payloads() {
        let payload = png_payload(&sample_image());

        let plain = decode_payload(&payload).unwrap();
        assert_eq!((plain.width(), plain.height()), (6, 4));
        assert_eq!(plain.channels(), 3);

        let prefixed = decode_payload(&format!("data:image/png;base64,{payload}")).unwrap();
        assert_eq!(prefixed.as_image(), plain.as_image());
    }

    #[test]
    fn tolerates_line_wrapped_base64() {
        let payload = png_payload(&sample_image());
        let (head, tail) = payload.split_at(payload.len() / 2);
        let wrapped = format!("{head}\n{tail}\n");
        assert!(decode_payload(&wrapped).is_ok());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = decode_payload("data:image/png;base64,@@not-base64@@").unwrap_err();
        assert!(matches!(err, AppError::InvalidPayload { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn empty_payload_is_rejected() {
        for payload in ["", "   ", "data:image/png;base64,"] {
            let err = decode_payload(payload).unwrap_err();
            assert!(matches!(err, AppError::InvalidPayload { .. }), "{payload:?}");
        }
    }

    #[test]
    fn non_image_bytes_fail_to_decode() {
        let payload = encode_image_payload(b"definitely not an image");
        let err = decode_payload(&payload).unwrap_err();
        assert!(matches!(err, AppError::ImageDecode { .. }));
        assert!(err.is_client_error());
    }
}
