//! Pure geometry helpers: bounding boxes, stroke-aware hit tests and
//! point-to-segment distance. No state lives here.

use crate::drawable::{Drawable, DrawableKind};
use egui::{Pos2, Rect, pos2};

/// Fallback per-character width factor when a text drawable carries no
/// measured width.
pub const TEXT_WIDTH_ESTIMATE: f32 = 0.6;
/// Fallback line-height factor for unmeasured text.
pub const TEXT_HEIGHT_ESTIMATE: f32 = 1.2;

/// Axis-aligned bounding box of a drawable, ignoring stroke width.
pub fn bounding_box(drawable: &Drawable) -> Rect {
    match &drawable.kind {
        DrawableKind::Rect { rect } => Rect::from_two_pos(rect.min, rect.max),
        DrawableKind::Circle { center, radius } => {
            let r = radius.abs();
            Rect::from_min_size(pos2(center.x - r, center.y - r), egui::vec2(2.0 * r, 2.0 * r))
        }
        DrawableKind::Line { from, to } => Rect::from_two_pos(*from, *to),
        DrawableKind::Text {
            pos,
            content,
            lines,
            width,
            height,
        } => {
            let font_size = drawable.style.font_size;
            let w = if *width > 0.0 {
                *width
            } else {
                content.chars().count() as f32 * font_size * TEXT_WIDTH_ESTIMATE
            };
            let h = if *height > 0.0 {
                *height
            } else {
                lines.len().max(1) as f32 * font_size * TEXT_HEIGHT_ESTIMATE
            };
            Rect::from_min_size(*pos, egui::vec2(w, h))
        }
        DrawableKind::Brush { points } => {
            if points.is_empty() {
                return Rect::NOTHING;
            }
            let mut min = points[0];
            let mut max = points[0];
            for p in points {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
            Rect::from_min_max(min, max)
        }
    }
}

/// Bounding box inflated by half the stroke width on each side. Text and
/// brush contribute no stroke inflation.
pub fn bounding_box_with_stroke(drawable: &Drawable) -> Rect {
    bounding_box(drawable).expand(drawable.hit_stroke_width() / 2.0)
}

/// Distance from `p` to the finite segment `a`..`b` (projection clamped to
/// the segment).
pub fn point_to_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let projected = a + ab * t;
    (p - projected).length()
}

/// Whether a single drawable is hit at `pos` with the given tolerance.
///
/// Rect and text test containment in their (stroke-inflated, for rect) box;
/// circle and line test exact radius / segment distance; brush matches if
/// the point is near any sampled path point, a deliberate approximation
/// rather than true segment distance.
pub fn hits(drawable: &Drawable, pos: Pos2, tolerance: f32) -> bool {
    let half_stroke = drawable.hit_stroke_width() / 2.0;
    match &drawable.kind {
        DrawableKind::Rect { .. } => bounding_box_with_stroke(drawable)
            .expand(tolerance)
            .contains(pos),
        DrawableKind::Circle { center, radius } => {
            (pos - *center).length() <= radius.abs() + half_stroke + tolerance
        }
        DrawableKind::Line { from, to } => {
            point_to_segment_distance(pos, *from, *to) <= half_stroke + tolerance
        }
        DrawableKind::Text { .. } => bounding_box(drawable).contains(pos),
        DrawableKind::Brush { points } => {
            let reach = drawable.style.stroke_width / 2.0 + tolerance;
            points.iter().any(|p| (pos - *p).length() <= reach)
        }
    }
}

/// Hit-test a z-ordered object list (last = topmost) at `pos`. Iterates
/// topmost first and returns the first match; no tie-breaking beyond that.
pub fn hit_test<'a>(objects: &'a [Drawable], pos: Pos2, tolerance: f32) -> Option<&'a Drawable> {
    objects.iter().rev().find(|obj| hits(obj, pos, tolerance))
}
