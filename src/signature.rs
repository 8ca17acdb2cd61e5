//! Patient signature validation.
//!
//! Signatures arrive as `data:image/png;base64,…` URLs captured from a
//! canvas. A canvas the patient never touched still encodes to a valid PNG,
//! so emptiness is decided from the pixels: the image must hold at least one
//! ink pixel (reasonably opaque and dark in some channel).

use base64::Engine as _;
use image::GenericImageView;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Signatures larger than this are rejected before decoding.
const MAX_SIGNATURE_BYTES: usize = 5 * 1024 * 1024;

const INK_MIN_ALPHA: u8 = 32;
const INK_MAX_CHANNEL: u8 = 128;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature is required")]
    Missing,

    #[error("Signature is not a PNG data URL")]
    NotPngDataUrl,

    #[error("Signature payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Signature exceeds {MAX_SIGNATURE_BYTES} bytes")]
    TooLarge,

    #[error("Signature is not a readable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Signature is blank")]
    Blank,
}

/// Cheap check usable before any request: is there a data URL at all?
pub fn is_empty_signature(data_url: &str) -> bool {
    let trimmed = data_url.trim();
    trimmed.is_empty() || trimmed == PNG_DATA_URL_PREFIX.trim_end_matches(',') || trimmed == PNG_DATA_URL_PREFIX
}

/// Decode the PNG bytes out of a data URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, SignatureError> {
    if is_empty_signature(data_url) {
        return Err(SignatureError::Missing);
    }
    let payload = data_url
        .trim()
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(SignatureError::NotPngDataUrl)?;
    if payload.len() / 4 * 3 > MAX_SIGNATURE_BYTES {
        return Err(SignatureError::TooLarge);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn is_ink(pixel: [u8; 4]) -> bool {
    let [r, g, b, a] = pixel;
    a >= INK_MIN_ALPHA && (r < INK_MAX_CHANNEL || g < INK_MAX_CHANNEL || b < INK_MAX_CHANNEL)
}

/// Full validation: well-formed PNG data URL with at least one ink pixel.
pub fn validate_signature(data_url: &str) -> Result<(), SignatureError> {
    let bytes = decode_data_url(data_url)?;
    let img = image::load_from_memory(&bytes)?;
    let (width, height) = img.dimensions();

    let inked = img.to_rgba8().pixels().any(|p| is_ink(p.0));
    if !inked {
        tracing::debug!(width, height, "Rejected blank signature");
        return Err(SignatureError::Blank);
    }
    Ok(())
}

/// Encode PNG bytes as a data URL.
pub fn to_data_url(png: &[u8]) -> String {
    format!(
        "{PNG_DATA_URL_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    fn png(img: RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    /// Transparent canvas, as produced by an untouched signature pad.
    pub fn blank_png() -> Vec<u8> {
        png(RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 0])))
    }

    /// Transparent canvas with a short dark stroke.
    pub fn signed_png() -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 0]));
        for x in 5..30 {
            img.put_pixel(x, 10, Rgba([20, 20, 60, 255]));
        }
        png(img)
    }

    pub fn signed_data_url() -> String {
        super::to_data_url(&signed_png())
    }

    pub fn blank_data_url() -> String {
        super::to_data_url(&blank_png())
    }
}

#[cfg(test)]
mod tests {
    use super::test_images::*;
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

    #[test]
    fn signed_canvas_is_accepted() {
        validate_signature(&signed_data_url()).unwrap();
    }

    #[test]
    fn blank_canvas_is_rejected() {
        assert!(matches!(
            validate_signature(&blank_data_url()),
            Err(SignatureError::Blank)
        ));
    }

    #[test]
    fn white_canvas_is_blank() {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])))
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        assert!(matches!(
            validate_signature(&to_data_url(&buf)),
            Err(SignatureError::Blank)
        ));
    }

    #[test]
    fn faint_pixels_are_not_ink() {
        assert!(!is_ink([0, 0, 0, 10]));
        assert!(!is_ink([200, 200, 200, 255]));
        assert!(is_ink([0, 0, 0, 255]));
        assert!(is_ink([255, 255, 100, 40]));
    }

    #[test]
    fn empty_and_malformed_urls() {
        assert!(is_empty_signature(""));
        assert!(is_empty_signature("data:image/png;base64,"));
        assert!(matches!(validate_signature("   "), Err(SignatureError::Missing)));
        assert!(matches!(
            validate_signature("data:image/jpeg;base64,AAAA"),
            Err(SignatureError::NotPngDataUrl)
        ));
        assert!(matches!(
            validate_signature("data:image/png;base64,@@@"),
            Err(SignatureError::Base64(_))
        ));
        assert!(matches!(
            validate_signature("data:image/png;base64,AAAA"),
            Err(SignatureError::Image(_))
        ));
    }
}
