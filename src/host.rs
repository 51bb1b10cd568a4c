// ============================================================================
// Host capability seam — what the pipeline needs from an editor document
// ============================================================================
//
// The inpaint operation never touches a concrete document type.  It talks to
// this trait so the region math and compositing can run against any host:
// the in-memory `Document` used by the CLI and the tests, or a thin shim
// over a real editor's node/selection API.

use crate::canvas::{Document, Rect};

/// Capabilities the inpaint pipeline requires from the hosting editor.
///
/// Pixel buffers cross this boundary in the wire layout: BGRA, 4 bytes per
/// pixel for images; 1 byte per pixel grayscale for masks.  Both are
/// row-major and tightly packed.  Reads outside the layer report
/// transparent / zero samples.
pub trait DocumentHost {
    /// Bounding rect of the active selection in document coordinates, or
    /// `None` when nothing is selected.
    fn selection_bounds(&self) -> Option<Rect>;

    /// Local bounds of the active layer's pixel store, or `None` when there
    /// is no active layer.
    fn layer_bounds(&self) -> Option<Rect>;

    /// Origin of the active layer in document coordinates.
    fn layer_position(&self) -> (i64, i64);

    /// Read a BGRA buffer for `rect` (layer-local coordinates) from the
    /// active layer.
    fn read_pixels(&self, rect: Rect) -> Vec<u8>;

    /// Read the selection mask for `rect` (layer-local coordinates) as one
    /// grayscale byte per pixel.
    fn read_mask(&self, rect: Rect) -> Vec<u8>;

    /// Duplicate the active layer; the duplicate becomes the active layer.
    fn duplicate_active_layer(&mut self) -> Result<(), String>;

    /// Overwrite `rect` (layer-local coordinates) of the active layer with a
    /// BGRA buffer of exactly `rect.w * rect.h * 4` bytes.
    fn write_pixels(&mut self, rect: Rect, bgra: &[u8]) -> Result<(), String>;

    /// Merge the active layer down onto the layer below it.
    fn merge_active_down(&mut self) -> Result<(), String>;

    /// Surface a non-fatal, user-visible message (floating toast in a GUI
    /// host, stderr in the CLI).
    fn show_warning(&mut self, message: &str);
}

// ============================================================================
// In-memory host
// ============================================================================

impl DocumentHost for Document {
    fn selection_bounds(&self) -> Option<Rect> {
        self.selection_rect()
    }

    fn layer_bounds(&self) -> Option<Rect> {
        self.active_layer().map(|l| l.bounds())
    }

    fn layer_position(&self) -> (i64, i64) {
        self.active_layer().map(|l| l.position).unwrap_or((0, 0))
    }

    fn read_pixels(&self, rect: Rect) -> Vec<u8> {
        let (rw, rh) = rect.size();
        let mut buf = vec![0u8; rw as usize * rh as usize * 4];
        let Some(layer) = self.active_layer() else {
            return buf;
        };
        let (lw, lh) = layer.pixels.dimensions();
        for y in 0..rh as i64 {
            let ly = rect.y + y;
            if ly < 0 || ly >= lh as i64 {
                continue;
            }
            for x in 0..rw as i64 {
                let lx = rect.x + x;
                if lx < 0 || lx >= lw as i64 {
                    continue;
                }
                let px = layer.pixels.get_pixel(lx as u32, ly as u32);
                let off = ((y * rw as i64 + x) * 4) as usize;
                buf[off] = px[2]; // B
                buf[off + 1] = px[1]; // G
                buf[off + 2] = px[0]; // R
                buf[off + 3] = px[3]; // A
            }
        }
        buf
    }

    fn read_mask(&self, rect: Rect) -> Vec<u8> {
        let (rw, rh) = rect.size();
        let mut buf = vec![0u8; rw as usize * rh as usize];
        let Some(mask) = self.selection_mask.as_ref() else {
            return buf;
        };
        // The mask lives in document space; translate by the layer origin.
        let (px, py) = self.layer_position();
        let (mw, mh) = mask.dimensions();
        for y in 0..rh as i64 {
            let dy = rect.y + y + py;
            if dy < 0 || dy >= mh as i64 {
                continue;
            }
            for x in 0..rw as i64 {
                let dx = rect.x + x + px;
                if dx < 0 || dx >= mw as i64 {
                    continue;
                }
                buf[(y * rw as i64 + x) as usize] = mask.get_pixel(dx as u32, dy as u32).0[0];
            }
        }
        buf
    }

    fn duplicate_active_layer(&mut self) -> Result<(), String> {
        self.duplicate_layer(self.active_layer_index)
    }

    fn write_pixels(&mut self, rect: Rect, bgra: &[u8]) -> Result<(), String> {
        let (rw, rh) = rect.size();
        let expected = rw as usize * rh as usize * 4;
        if bgra.len() != expected {
            return Err(format!(
                "pixel buffer is {} bytes, expected {} for {}×{}",
                bgra.len(),
                expected,
                rw,
                rh
            ));
        }
        let layer = self
            .layers
            .get_mut(self.active_layer_index)
            .ok_or_else(|| "no active layer".to_string())?;
        if !layer.bounds().contains(rect) {
            return Err(format!("write rect {:?} exceeds layer bounds", rect));
        }
        for y in 0..rh {
            for x in 0..rw {
                let off = ((y * rw + x) * 4) as usize;
                layer.pixels.put_pixel(
                    (rect.x + x as i64) as u32,
                    (rect.y + y as i64) as u32,
                    image::Rgba([
                        bgra[off + 2], // R
                        bgra[off + 1], // G
                        bgra[off],     // B
                        bgra[off + 3], // A
                    ]),
                );
            }
        }
        Ok(())
    }

    fn merge_active_down(&mut self) -> Result<(), String> {
        self.merge_down(self.active_layer_index)
    }

    fn show_warning(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

// ============================================================================
// TESTS
// ============================================================================
