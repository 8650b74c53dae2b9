//! Repaints layer surfaces from a history entry's snapshot set, and replays
//! object logs for the action kinds that are undone by flipping tombstones
//! rather than by snapshot restore.

use crate::history::HistoryEntry;
use crate::layer::Layer;
use crate::raster;
use crate::snapshot::Snapshot;
use crate::surface::{Surface, SurfaceRegistry};
use ab_glyph::FontArc;

/// Restore every layer's surface from the snapshot set of one history
/// entry. Layers without a snapshot in the entry are cleared only.
///
/// Idempotent: repeating the call with the same entry yields the same
/// pixels.
pub fn redraw(registry: &mut SurfaceRegistry, layers: &[Layer], entry: &HistoryEntry) {
    for layer in layers {
        let Some(surface) = registry.get_mut(layer.id) else {
            log::debug!("redraw: no surface for layer {}, skipping", layer.id);
            continue;
        };
        let token = surface.begin_redraw();
        restore_layer(surface, entry.snapshots.get(&layer.id), token);
    }
}

/// Restore one surface from an optional snapshot under a redraw token.
///
/// The decode is the suspension point: when a newer redraw has begun by the
/// time the decoded pixels would be applied, the token is stale and the
/// result is dropped, so a rapid undo/redo burst cannot apply an older
/// frame over a newer one. Returns whether the surface was written.
pub fn restore_layer(surface: &mut Surface, snapshot: Option<&Snapshot>, token: u64) -> bool {
    match snapshot {
        Some(snapshot) if !snapshot.is_empty() => {
            let decoded = match snapshot.decode() {
                Ok(img) => img,
                Err(err) => {
                    log::warn!("redraw: snapshot decode failed: {err}");
                    return false;
                }
            };
            if !surface.is_current(token) {
                log::debug!("redraw: superseded decode dropped");
                return false;
            }
            surface.clear();
            raster::blit_scaled(surface, &decoded);
            true
        }
        _ => {
            if !surface.is_current(token) {
                return false;
            }
            surface.clear();
            true
        }
    }
}

/// Repaint one layer's surface from its object log: clear, then draw every
/// object visible at `pointer` in commit order. Used when an erase or
/// layer-clear entry is undone/redone by restoring tombstoned objects
/// instead of replaying a snapshot.
pub fn replay_objects(
    surface: &mut Surface,
    layer: &Layer,
    pointer: usize,
    font: Option<&FontArc>,
) {
    surface.begin_redraw();
    surface.clear();
    for obj in layer.visible_objects(pointer) {
        raster::draw_drawable(surface, obj, font);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_snapshot(w: u32, h: u32) -> Snapshot {
        let img = RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]));
        Snapshot::encode(&img).unwrap()
    }

    #[test]
    fn restore_applies_with_a_current_token() {
        let mut surface = Surface::new(4, 4, 1.0);
        let snap = red_snapshot(4, 4);
        let token = surface.begin_redraw();
        assert!(restore_layer(&mut surface, Some(&snap), token));
        assert_eq!(surface.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn superseded_token_drops_its_decode() {
        let mut surface = Surface::new(4, 4, 1.0);
        let red = red_snapshot(4, 4);
        let stale = surface.begin_redraw();
        // A newer redraw begins before the first one applies its pixels.
        let current = surface.begin_redraw();
        assert!(!restore_layer(&mut surface, Some(&red), stale));
        assert!(surface.image().pixels().all(|p| p[3] == 0));
        // The newer redraw still lands.
        assert!(restore_layer(&mut surface, Some(&red), current));
        assert_eq!(surface.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn stale_token_cannot_clear_either() {
        let mut surface = Surface::new(4, 4, 1.0);
        let red = red_snapshot(4, 4);
        let token = surface.begin_redraw();
        restore_layer(&mut surface, Some(&red), token);
        let stale = token;
        surface.begin_redraw();
        assert!(!restore_layer(&mut surface, None, stale));
        assert_eq!(surface.image().get_pixel(1, 1).0, [255, 0, 0, 255]);
    }
}
