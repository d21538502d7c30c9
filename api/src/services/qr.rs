//! QR rendering.

use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};

const MIN_DIMENSION: u32 = 256;

/// Encodes `content` as a QR code and returns it as an SVG data URI suitable
/// for an `<img src>` attribute.
pub fn svg_data_uri(content: &str) -> Result<String, QrError> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::H)?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .quiet_zone(true)
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}
