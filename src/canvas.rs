// ============================================================================
// Canvas model — rectangles, layers, and the in-memory document
// ============================================================================

use image::{GrayImage, Rgba, RgbaImage};

// ============================================================================
// RECTANGLES
// ============================================================================

/// Axis-aligned rectangle in integer pixel coordinates.
///
/// Coordinates are signed because selection rects are translated by the
/// layer position and expanded by the context margin before clamping, both
/// of which can push the origin negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Rect anchored at the origin, e.g. the local bounds of a layer.
    pub fn from_size(w: u32, h: u32) -> Self {
        Self { x: 0, y: 0, w: w as i64, h: h as i64 }
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Width/height as unsigned pixel counts. Empty rects report (0, 0).
    pub fn size(&self) -> (u32, u32) {
        if self.is_empty() {
            (0, 0)
        } else {
            (self.w as u32, self.h as u32)
        }
    }

    pub fn contains(&self, other: Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Expand by `margin` pixels on every side.
    pub fn pad(&self, margin: u32) -> Rect {
        let m = margin as i64;
        Rect {
            x: self.x - m,
            y: self.y - m,
            w: self.w + 2 * m,
            h: self.h + 2 * m,
        }
    }

    /// Clamp the low edges up to `bounds`' origin and the high edges down to
    /// origin + extent.  A rect already inside `bounds` comes back unchanged;
    /// a rect hanging over an edge is silently shrunk, so a padded context
    /// window near a corner ends up asymmetric.
    pub fn clamp_to(&self, bounds: Rect) -> Rect {
        let x0 = self.x.max(bounds.x);
        let y0 = self.y.max(bounds.y);
        let x1 = self.right().min(bounds.right());
        let y1 = self.bottom().min(bounds.bottom());
        Rect {
            x: x0,
            y: y0,
            w: (x1 - x0).max(0),
            h: (y1 - y0).max(0),
        }
    }
}

// ============================================================================
// LAYERS
// ============================================================================

pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    /// Layer origin in document coordinates.  (0, 0) for layers created by
    /// the CLI; hosts with movable layers report the real offset.
    pub position: (i64, i64),
    pub pixels: RgbaImage,
}

impl Layer {
    pub fn new(name: String, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        let mut pixels = RgbaImage::new(width, height);
        if fill_color[3] > 0 {
            for px in pixels.pixels_mut() {
                *px = fill_color;
            }
        }
        Self {
            name,
            visible: true,
            opacity: 1.0,
            position: (0, 0),
            pixels,
        }
    }

    pub fn from_image(name: String, pixels: RgbaImage) -> Self {
        Self {
            name,
            visible: true,
            opacity: 1.0,
            position: (0, 0),
            pixels,
        }
    }

    /// Local bounds of the pixel store (origin at 0,0).
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.pixels.width(), self.pixels.height())
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

pub struct Document {
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    pub width: u32,
    pub height: u32,
    /// Selection mask — 0 = unselected, 255 = fully selected.
    /// Dimensions must match (width, height).
    pub selection_mask: Option<GrayImage>,
    /// Inline messages a GUI host would float over the canvas.
    /// Callers drain and display these.
    pub messages: Vec<String>,
}

impl Document {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layers: vec![Layer::new(
                "Background".to_string(),
                width,
                height,
                Rgba([0, 0, 0, 0]),
            )],
            active_layer_index: 0,
            width,
            height,
            selection_mask: None,
            messages: Vec::new(),
        }
    }

    /// Single-layer document from a decoded image (the CLI entry path).
    pub fn from_image(pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            layers: vec![Layer::from_image("Background".to_string(), pixels)],
            active_layer_index: 0,
            width,
            height,
            selection_mask: None,
            messages: Vec::new(),
        }
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(self.active_layer_index)
    }

    pub fn set_selection_mask(&mut self, mask: GrayImage) {
        debug_assert_eq!(mask.dimensions(), (self.width, self.height));
        self.selection_mask = Some(mask);
    }

    pub fn clear_selection(&mut self) {
        self.selection_mask = None;
    }

    /// Mark a rectangular region as fully selected (255).  Convenience for
    /// tests and simple callers; arbitrary shapes go through
    /// [`Document::set_selection_mask`].
    pub fn select_rect(&mut self, rect: Rect) {
        let (w, h) = (self.width, self.height);
        let mask = self
            .selection_mask
            .get_or_insert_with(|| GrayImage::new(w, h));
        let clamped = rect.clamp_to(Rect::from_size(w, h));
        for y in clamped.y..clamped.bottom() {
            for x in clamped.x..clamped.right() {
                mask.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }

    /// Tight bounding rect of all non-zero mask pixels, in document
    /// coordinates.  `None` when there is no mask or the mask is all zero.
    pub fn selection_rect(&self) -> Option<Rect> {
        let mask = self.selection_mask.as_ref()?;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for (x, y, px) in mask.enumerate_pixels() {
            if px.0[0] == 0 {
                continue;
            }
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if !any {
            return None;
        }
        Some(Rect::new(
            min_x as i64,
            min_y as i64,
            (max_x - min_x + 1) as i64,
            (max_y - min_y + 1) as i64,
        ))
    }

    // ---- layer operations ---------------------------------------------------

    /// Insert a copy of the layer at `layer_idx` directly above it and make
    /// the copy the active layer.
    pub fn duplicate_layer(&mut self, layer_idx: usize) -> Result<(), String> {
        let source = self
            .layers
            .get(layer_idx)
            .ok_or_else(|| format!("no layer at index {}", layer_idx))?;
        let new_layer = Layer {
            name: format!("{} copy", source.name),
            visible: source.visible,
            opacity: source.opacity,
            position: source.position,
            pixels: source.pixels.clone(),
        };
        let new_index = layer_idx + 1;
        self.layers.insert(new_index, new_layer);
        self.active_layer_index = new_index;
        Ok(())
    }

    /// Blend the layer at `layer_idx` onto the layer below it (Normal mode,
    /// honoring the top layer's opacity), then remove it.  The layer below
    /// becomes the active layer.
    pub fn merge_down(&mut self, layer_idx: usize) -> Result<(), String> {
        if layer_idx == 0 || layer_idx >= self.layers.len() {
            return Err(format!("cannot merge down layer {}", layer_idx));
        }

        let top_opacity = self.layers[layer_idx].opacity;
        let top_visible = self.layers[layer_idx].visible;

        if top_visible {
            let (below, above) = self.layers.split_at_mut(layer_idx);
            let bottom = &mut below[layer_idx - 1];
            let top = &above[0];
            for (x, y, base) in bottom.pixels.enumerate_pixels_mut() {
                let top_px = *top.pixels.get_pixel(x, y);
                *base = blend_normal(*base, top_px, top_opacity);
            }
        }

        self.layers.remove(layer_idx);
        if self.active_layer_index >= layer_idx && self.active_layer_index > 0 {
            self.active_layer_index -= 1;
        }
        Ok(())
    }

    /// Flatten all visible layers into a single image (Normal blend over a
    /// transparent base).
    pub fn composite(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for layer in self.layers.iter().filter(|l| l.visible) {
            for (x, y, base) in out.enumerate_pixels_mut() {
                let top = *layer.pixels.get_pixel(x, y);
                *base = blend_normal(*base, top, layer.opacity);
            }
        }
        out
    }
}

// ============================================================================
// BLENDING
// ============================================================================

/// Normal-mode alpha-over blend of `top` onto `base`, un-premultiplied u8
/// channels.  `opacity` scales the top layer's alpha.
pub fn blend_normal(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Fast path: fully transparent top pixel — nothing to blend
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    // Fast path: fully opaque top pixel at full opacity — just overwrite
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    let base_a = base[3] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let b = base[c] as f32 / 255.0;
        let t = top[c] as f32 / 255.0;
        let v = (t * top_a + b * base_a * (1.0 - top_a)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_of_contained_rect_is_noop() {
        let bounds = Rect::from_size(1000, 800);
        let r = Rect::new(100, 50, 300, 200);
        assert_eq!(r.clamp_to(bounds), r);
        // Idempotent: clamping twice changes nothing further
        assert_eq!(r.clamp_to(bounds).clamp_to(bounds), r);
    }

    #[test]
    fn clamp_shrinks_overhanging_edges() {
        let bounds = Rect::from_size(100, 100);
        let r = Rect::new(-20, 50, 60, 80);
        let c = r.clamp_to(bounds);
        assert_eq!(c, Rect::new(0, 50, 40, 50));
    }

    #[test]
    fn interior_pad_grows_by_twice_the_margin() {
        let bounds = Rect::from_size(2000, 2000);
        let sel = Rect::new(600, 700, 100, 80);
        let padded = sel.pad(256).clamp_to(bounds);
        assert_eq!(padded, Rect::new(344, 444, 612, 592));
        assert_eq!(padded.w, sel.w + 512);
        assert_eq!(padded.h, sel.h + 512);
    }

    #[test]
    fn corner_pad_is_asymmetric() {
        // Selection near the top-left corner: the context window loses most
        // of its left/top margin but keeps the full right/bottom margin.
        let bounds = Rect::from_size(1000, 1000);
        let sel = Rect::new(10, 10, 50, 50);
        let padded = sel.pad(256).clamp_to(bounds);
        assert_eq!(padded, Rect::new(0, 0, 316, 316));
    }

    #[test]
    fn selection_rect_is_tight_over_mask() {
        let mut doc = Document::new(64, 64);
        doc.select_rect(Rect::new(10, 20, 5, 3));
        assert_eq!(doc.selection_rect(), Some(Rect::new(10, 20, 5, 3)));
    }

    #[test]
    fn empty_mask_has_no_selection_rect() {
        let mut doc = Document::new(16, 16);
        assert_eq!(doc.selection_rect(), None);
        doc.set_selection_mask(GrayImage::new(16, 16));
        assert_eq!(doc.selection_rect(), None);
    }

    #[test]
    fn duplicate_then_merge_down_preserves_opaque_pixels() {
        let mut doc = Document::new(8, 8);
        doc.layers[0] = Layer::new("bg".to_string(), 8, 8, Rgba([10, 20, 30, 255]));
        doc.duplicate_layer(0).unwrap();
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.active_layer_index, 1);

        doc.merge_down(1).unwrap();
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.active_layer_index, 0);
        assert_eq!(*doc.layers[0].pixels.get_pixel(3, 3), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn merge_down_respects_top_alpha() {
        let mut doc = Document::new(1, 1);
        doc.layers[0] = Layer::new("bg".to_string(), 1, 1, Rgba([0, 0, 0, 255]));
        doc.duplicate_layer(0).unwrap();
        doc.layers[1]
            .pixels
            .put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        doc.merge_down(1).unwrap();
        // Transparent top pixel leaves the base untouched
        assert_eq!(*doc.layers[0].pixels.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn blend_normal_opaque_top_overwrites() {
        let out = blend_normal(Rgba([1, 2, 3, 255]), Rgba([9, 8, 7, 255]), 1.0);
        assert_eq!(out, Rgba([9, 8, 7, 255]));
    }
}
