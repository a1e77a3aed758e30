//! Frame payload decoding.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use image::RgbImage;
use perceptor_core::PerceptorError;

/// Decode a base64 frame (optionally a `data:image/...;base64,` URL) into RGB.
pub fn decode_frame(payload: &str) -> Result<RgbImage, PerceptorError> {
    let trimmed = payload.trim();
    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| PerceptorError::Decode("data URL has no payload".to_string()))?,
        None => trimmed,
    };
    if encoded.is_empty() {
        return Err(PerceptorError::Decode("empty frame payload".to_string()));
    }

    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded.trim_end_matches('=')))
        .map_err(|e| PerceptorError::Decode(format!("invalid base64: {e}")))?;
    decode_image_bytes(&bytes)
}

/// Decode raw encoded image bytes (JPEG or PNG) into RGB.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, PerceptorError> {
    if bytes.is_empty() {
        return Err(PerceptorError::Decode("empty image".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| PerceptorError::Decode(format!("unreadable image: {e}")))?;
    let rgb = image.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PerceptorError::Decode("image has no pixels".to_string()));
    }
    Ok(rgb)
}

#[cfg(test)]
pub(crate) fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
