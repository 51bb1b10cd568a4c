// ============================================================================
// Result compositing — response decode, mask re-application, write-back
// ============================================================================
//
// The service returns an opaque inpainted crop of the whole padded region.
// Only the selected pixels may change on the layer, so the original
// selection mask is re-applied as the alpha channel before the buffer is
// written into a duplicate layer and merged down.

use crate::canvas::Rect;
use crate::host::DocumentHost;
use crate::ops::inpaint::InpaintError;

/// Decode the service's PNG response into a BGRA buffer.
///
/// The response must be exactly `expected_w`×`expected_h` (the padded
/// region); anything else aborts the operation before any document
/// mutation.
pub fn decode_response(
    png: &[u8],
    expected_w: u32,
    expected_h: u32,
) -> Result<Vec<u8>, InpaintError> {
    let decoded = image::load_from_memory(png)
        .map_err(|e| InpaintError::BadResponse(e.to_string()))?
        .into_rgba8();
    let (w, h) = decoded.dimensions();
    if (w, h) != (expected_w, expected_h) {
        return Err(InpaintError::DimensionMismatch {
            expected: (expected_w, expected_h),
            got: (w, h),
        });
    }
    let mut bgra = decoded.into_raw();
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    Ok(bgra)
}

/// Overwrite each pixel's alpha byte with the corresponding mask byte.
///
/// Full replacement, never a blend: unselected pixels (mask 0) become fully
/// transparent and vanish in the merge, partially selected pixels feather.
pub fn apply_mask(bgra: &mut [u8], mask: &[u8]) {
    debug_assert_eq!(bgra.len(), mask.len() * 4);
    for (px, m) in bgra.chunks_exact_mut(4).zip(mask) {
        px[3] = *m;
    }
}

/// Write the masked buffer into a duplicate of the active layer at the
/// padded-region offset, then merge the duplicate down.  This is the only
/// place the document is mutated, and it runs only after a successful
/// response.
pub fn write_back(
    host: &mut dyn DocumentHost,
    region: Rect,
    bgra: &[u8],
) -> Result<(), InpaintError> {
    host.duplicate_active_layer()
        .map_err(InpaintError::WriteBack)?;
    host.write_pixels(region, bgra)
        .map_err(InpaintError::WriteBack)?;
    host.merge_active_down().map_err(InpaintError::WriteBack)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
