// ============================================================================
// Region/Mask preparation — context padding and wire encoding
// ============================================================================
//
// Computes the two rects the operation works with:
//   coords  — selection bounds in layer-local coordinates, clamped
//   pcoords — coords grown by the context margin, clamped
// and encodes the extracted buffers as data:image/png;base64 payloads for
// the inpaint endpoint.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::canvas::Rect;
use crate::ops::inpaint::InpaintError;

/// Context pixels included around the selection so the model sees
/// surrounding texture.
pub const PAD: u32 = 256;

/// Compute `(coords, pcoords)` for a selection rect already translated into
/// layer-local coordinates.
///
/// A selection fully interior to the layer (margin ≥ `margin` on all sides)
/// yields a `pcoords` exactly `2 * margin` larger in each dimension; near an
/// edge the window silently shrinks.
pub fn padded_region(sel: Rect, layer_bounds: Rect, margin: u32) -> (Rect, Rect) {
    let coords = sel.clamp_to(layer_bounds);
    let pcoords = coords.pad(margin).clamp_to(layer_bounds);
    (coords, pcoords)
}

// ============================================================================
// Wire encoding
// ============================================================================

/// The two base64 PNG payloads sent to the service.
pub struct RegionPayload {
    /// `data:image/png;base64,...` of the BGRA image region.
    pub image: String,
    /// `data:image/png;base64,...` of the 8-bit grayscale selection mask.
    pub mask: String,
}

impl RegionPayload {
    /// Encode raw BGRA + mask buffers for a `width`×`height` region.
    pub fn encode(
        bgra: &[u8],
        mask: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self, InpaintError> {
        Ok(Self {
            image: png_data_url(&encode_bgra_png(bgra, width, height)?),
            mask: png_data_url(&encode_gray_png(mask, width, height)?),
        })
    }
}

/// PNG-encode a BGRA buffer (swizzled to RGBA at the codec boundary).
pub fn encode_bgra_png(bgra: &[u8], width: u32, height: u32) -> Result<Vec<u8>, InpaintError> {
    let expected = width as usize * height as usize * 4;
    if bgra.len() != expected {
        return Err(InpaintError::Encode(format!(
            "image buffer is {} bytes, expected {} for {}×{}",
            bgra.len(),
            expected,
            width,
            height
        )));
    }
    let mut rgba = bgra.to_vec();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&rgba, width, height, ColorType::Rgba8)
        .map_err(|e| InpaintError::Encode(e.to_string()))?;
    Ok(out)
}

/// PNG-encode a 1-byte-per-pixel grayscale mask buffer.
pub fn encode_gray_png(gray: &[u8], width: u32, height: u32) -> Result<Vec<u8>, InpaintError> {
    let expected = width as usize * height as usize;
    if gray.len() != expected {
        return Err(InpaintError::Encode(format!(
            "mask buffer is {} bytes, expected {} for {}×{}",
            gray.len(),
            expected,
            width,
            height
        )));
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(gray, width, height, ColorType::L8)
        .map_err(|e| InpaintError::Encode(e.to_string()))?;
    Ok(out)
}

/// Wrap PNG bytes as a `data:image/png;base64,...` URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_selection_pads_symmetrically() {
        let bounds = Rect::from_size(2000, 1500);
        let sel = Rect::new(700, 600, 120, 90);
        let (coords, pcoords) = padded_region(sel, bounds, PAD);
        assert_eq!(coords, sel);
        assert_eq!(pcoords, Rect::new(444, 344, 632, 602));
    }

    #[test]
    fn near_corner_selection_pads_asymmetrically() {
        let bounds = Rect::from_size(1000, 1000);
        let sel = Rect::new(5, 900, 50, 50);
        let (coords, pcoords) = padded_region(sel, bounds, PAD);
        assert_eq!(coords, sel);
        // Left and bottom margins are cut short by the layer edge
        assert_eq!(pcoords, Rect::new(0, 644, 311, 356));
    }

    #[test]
    fn selection_overhanging_the_layer_is_clamped_first() {
        let bounds = Rect::from_size(100, 100);
        let sel = Rect::new(90, 90, 40, 40);
        let (coords, pcoords) = padded_region(sel, bounds, 8);
        assert_eq!(coords, Rect::new(90, 90, 10, 10));
        assert_eq!(pcoords, Rect::new(82, 82, 18, 18));
    }

    #[test]
    fn payload_is_a_decodable_png_data_url() {
        // 2×1 BGRA: blue pixel then 50%-gray-alpha red pixel
        let bgra = [255, 0, 0, 255, 0, 0, 255, 128];
        let mask = [0, 255];
        let payload = RegionPayload::encode(&bgra, &mask, 2, 1).unwrap();

        let prefix = "data:image/png;base64,";
        assert!(payload.image.starts_with(prefix));
        assert!(payload.mask.starts_with(prefix));

        let png = BASE64.decode(&payload.image[prefix.len()..]).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().into_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        // RGBA view of the first (blue) BGRA pixel
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn encode_rejects_short_buffers() {
        assert!(encode_bgra_png(&[0u8; 4], 2, 2).is_err());
        assert!(encode_gray_png(&[0u8; 3], 2, 2).is_err());
    }
}
