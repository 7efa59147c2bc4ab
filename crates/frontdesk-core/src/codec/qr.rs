//! QR rendering for printed slips.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use super::{CodecError, CodecResult};

/// Render a shareable URL as an SVG QR code in slip colours.
pub fn render_qr_svg(url: &str) -> CodecResult<String> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|e| CodecError::Qr(e.to_string()))?;

    let svg_string = code
        .render::<svg::Color>()
        .min_dimensions(90, 90)
        .dark_color(svg::Color("#720000"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(false)
        .build();

    Ok(svg_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::share_url;
    use crate::models::fixtures::sample_record;

    #[test]
    fn test_renders_share_url() {
        let url = share_url("https://desk.example.org/", &sample_record()).unwrap();
        let svg = render_qr_svg(&url).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("#720000"));
    }

    #[test]
    fn test_oversized_input_fails() {
        let huge = "x".repeat(10_000);
        assert!(matches!(render_qr_svg(&huge), Err(CodecError::Qr(_))));
    }
}
