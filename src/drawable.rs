use egui::{Color32, Pos2, Rect};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

// Single static counter for all drawables
static NEXT_DRAWABLE_ID: AtomicUsize = AtomicUsize::new(1);

pub fn next_drawable_id() -> usize {
    NEXT_DRAWABLE_ID.fetch_add(1, Ordering::SeqCst)
}

/// The style bundle a tool is constructed with: fill and stroke colors,
/// stroke width and font size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Color32,
    pub stroke: Color32,
    pub stroke_width: f32,
    pub font_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Color32::TRANSPARENT,
            stroke: Color32::BLACK,
            stroke_width: 2.0,
            font_size: 16.0,
        }
    }
}

/// Geometry of a committed drawable. Once a drawable is rasterized into a
/// layer snapshot this is retained only for hit-testing and the select
/// tool's move preview, not for general re-editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawableKind {
    Rect {
        rect: Rect,
    },
    Circle {
        center: Pos2,
        radius: f32,
    },
    Line {
        from: Pos2,
        to: Pos2,
    },
    Text {
        pos: Pos2,
        content: String,
        /// Word-wrapped lines, precomputed at commit time
        lines: Vec<String>,
        width: f32,
        height: f32,
    },
    Brush {
        points: Vec<Pos2>,
    },
}

impl DrawableKind {
    /// Normalize geometry that can go negative during a drag: rects get
    /// sorted corners, circles a non-negative radius.
    pub fn normalized(self) -> Self {
        match self {
            DrawableKind::Rect { rect } => DrawableKind::Rect {
                rect: Rect::from_two_pos(rect.min, rect.max),
            },
            DrawableKind::Circle { center, radius } => DrawableKind::Circle {
                center,
                radius: radius.abs(),
            },
            other => other,
        }
    }

    /// Reposition so the geometry's top-left corner lands at `top_left`,
    /// preserving size. Used by the select tool's move commit.
    pub fn with_top_left(&self, top_left: Pos2) -> Self {
        match self {
            DrawableKind::Rect { rect } => DrawableKind::Rect {
                rect: Rect::from_min_size(top_left, rect.size()),
            },
            DrawableKind::Circle { radius, .. } => DrawableKind::Circle {
                center: Pos2::new(top_left.x + radius, top_left.y + radius),
                radius: *radius,
            },
            DrawableKind::Line { from, to } => {
                let min = Pos2::new(from.x.min(to.x), from.y.min(to.y));
                let delta = top_left - min;
                DrawableKind::Line {
                    from: *from + delta,
                    to: *to + delta,
                }
            }
            DrawableKind::Text {
                content,
                lines,
                width,
                height,
                ..
            } => DrawableKind::Text {
                pos: top_left,
                content: content.clone(),
                lines: lines.clone(),
                width: *width,
                height: *height,
            },
            DrawableKind::Brush { points } => {
                let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
                let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
                let delta = top_left - Pos2::new(min_x, min_y);
                DrawableKind::Brush {
                    points: points.iter().map(|p| *p + delta).collect(),
                }
            }
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            DrawableKind::Rect { .. } => "rect",
            DrawableKind::Circle { .. } => "circle",
            DrawableKind::Line { .. } => "line",
            DrawableKind::Text { .. } => "text",
            DrawableKind::Brush { .. } => "brush",
        }
    }
}

/// A committed drawing object in a layer's append-only log.
///
/// Objects are never physically removed while the project lives: erasing
/// sets the `removed` tombstone, and visibility at a given history pointer
/// is `pointer >= committed_at && !removed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub id: usize,
    /// The layer that owns this object
    pub layer_id: Uuid,
    pub kind: DrawableKind,
    pub style: Style,
    /// History index at which the object was committed
    pub committed_at: usize,
    /// Tombstone flag set by the eraser / layer clear
    pub removed: bool,
}

impl Drawable {
    pub fn new(layer_id: Uuid, kind: DrawableKind, style: Style, committed_at: usize) -> Self {
        Self {
            id: next_drawable_id(),
            layer_id,
            kind: kind.normalized(),
            style,
            committed_at,
            removed: false,
        }
    }

    pub fn visible_at(&self, pointer: usize) -> bool {
        pointer >= self.committed_at && !self.removed
    }

    /// Effective stroke width for hit-test inflation: text and brush boxes
    /// are not stroke-inflated.
    pub fn hit_stroke_width(&self) -> f32 {
        match self.kind {
            DrawableKind::Text { .. } | DrawableKind::Brush { .. } => 0.0,
            _ => self.style.stroke_width,
        }
    }
}
