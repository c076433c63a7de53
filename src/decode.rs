//! Base64 image decoding.
//!
//! Turns a client-supplied Base64 payload into a 3-channel RGB raster. All
//! downstream code (detector input, bbox coordinates) assumes RGB8, so
//! palette, grayscale and alpha inputs are normalized here. Pure
//! transformation, no side effects.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::RgbImage;

use crate::error::ServiceError;

/// Cap on the decoded (pre-raster) payload, shared with the API body limit.
pub const MAX_IMAGE_BYTES: usize = 12 * 1024 * 1024;

/// Decode a Base64 payload into an RGB8 image.
///
/// Accepts an optional `data:<mime>;base64,` prefix; the reference frontend
/// strips it client-side but hand-rolled clients often forget.
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, ServiceError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Decode("no image data provided".to_string()));
    }

    let encoded = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };

    let bytes = B64
        .decode(encoded.as_bytes())
        .map_err(|err| ServiceError::Decode(format!("invalid base64 payload: {err}")))?;
    if bytes.is_empty() {
        return Err(ServiceError::Decode("decoded payload is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ServiceError::Decode(format!(
            "decoded payload is {} bytes, limit is {}",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }

    let img = image::load_from_memory(&bytes)
        .map_err(|err| ServiceError::Decode(format!("unrecognized image data: {err}")))?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(img: DynamicImage) -> String {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        B64.encode(&buf)
    }

    #[test]
    fn round_trip_preserves_dimensions() {
        let mut img = RgbImage::new(17, 9);
        img.put_pixel(3, 4, Rgb([200, 10, 30]));
        let payload = png_base64(DynamicImage::ImageRgb8(img));

        let decoded = decode_base64_image(&payload).unwrap();
        assert_eq!(decoded.dimensions(), (17, 9));
        assert_eq!(decoded.get_pixel(3, 4), &Rgb([200, 10, 30]));
    }

    #[test]
    fn grayscale_is_normalized_to_rgb() {
        let img = GrayImage::from_pixel(5, 5, image::Luma([128]));
        let payload = png_base64(DynamicImage::ImageLuma8(img));

        let decoded = decode_base64_image(&payload).unwrap();
        assert_eq!(decoded.dimensions(), (5, 5));
        assert_eq!(decoded.get_pixel(2, 2), &Rgb([128, 128, 128]));
    }

    #[test]
    fn data_url_prefix_is_tolerated() {
        let img = RgbImage::new(4, 4);
        let payload = format!(
            "data:image/png;base64,{}",
            png_base64(DynamicImage::ImageRgb8(img))
        );
        assert!(decode_base64_image(&payload).is_ok());
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            decode_base64_image(""),
            Err(ServiceError::Decode(_))
        ));
        assert!(matches!(
            decode_base64_image("   "),
            Err(ServiceError::Decode(_))
        ));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode_base64_image("not base64 at all!"),
            Err(ServiceError::Decode(_))
        ));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let payload = B64.encode(b"definitely not an image");
        assert!(matches!(
            decode_base64_image(&payload),
            Err(ServiceError::Decode(_))
        ));
    }
}
