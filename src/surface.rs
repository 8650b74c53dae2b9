use image::RgbaImage;
use std::collections::HashMap;
use uuid::Uuid;

/// A per-layer drawing surface: an RGBA backing store plus the logical
/// (CSS-pixel) size it represents. The backing store may be larger than the
/// logical size by `pixel_ratio` for high-DPI output; all tool and redraw
/// coordinates are logical and get scaled on write.
pub struct Surface {
    image: RgbaImage,
    logical_width: u32,
    logical_height: u32,
    pixel_ratio: f32,
    epoch: u64,
}

impl Surface {
    pub fn new(logical_width: u32, logical_height: u32, pixel_ratio: f32) -> Self {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio >= 1.0 {
            pixel_ratio
        } else {
            1.0
        };
        let bw = ((logical_width as f32) * ratio).round().max(1.0) as u32;
        let bh = ((logical_height as f32) * ratio).round().max(1.0) as u32;
        Self {
            image: RgbaImage::new(bw, bh),
            logical_width,
            logical_height,
            pixel_ratio: ratio,
            epoch: 0,
        }
    }

    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Replace the whole backing store, e.g. when restoring a captured
    /// pre-stroke buffer.
    pub fn restore_pixels(&mut self, pixels: RgbaImage) {
        self.image = pixels;
    }

    /// Begin a redraw targeting this surface. Bumps the epoch and returns a
    /// token; a decode that finishes after a newer redraw started will find
    /// its token stale and must drop its result instead of drawing.
    pub fn begin_redraw(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a redraw token issued by `begin_redraw` is still current.
    pub fn is_current(&self, token: u64) -> bool {
        self.epoch == token
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = image::Rgba([0, 0, 0, 0]);
        }
    }

    /// Clamp a logical-space position to the surface bounds.
    pub fn clamp(&self, pos: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            pos.x.clamp(0.0, self.logical_width as f32),
            pos.y.clamp(0.0, self.logical_height as f32),
        )
    }

    /// Whether a logical-space position lies inside the surface bounds.
    pub fn contains(&self, pos: egui::Pos2) -> bool {
        pos.x >= 0.0
            && pos.y >= 0.0
            && pos.x <= self.logical_width as f32
            && pos.y <= self.logical_height as f32
    }
}


impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("logical", &(self.logical_width, self.logical_height))
            .field("pixel_ratio", &self.pixel_ratio)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Explicit registry mapping layer ids to their live surfaces, owned by the
/// editor session and passed to whichever component needs surface access.
/// Torn down when the session ends.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<Uuid, Surface>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer_id: Uuid, surface: Surface) {
        self.surfaces.insert(layer_id, surface);
    }

    pub fn remove(&mut self, layer_id: Uuid) -> Option<Surface> {
        self.surfaces.remove(&layer_id)
    }

    pub fn get(&self, layer_id: Uuid) -> Option<&Surface> {
        self.surfaces.get(&layer_id)
    }

    pub fn get_mut(&mut self, layer_id: Uuid) -> Option<&mut Surface> {
        self.surfaces.get_mut(&layer_id)
    }

    pub fn contains(&self, layer_id: Uuid) -> bool {
        self.surfaces.contains_key(&layer_id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }
}
