use super::{Tool, ToolBinding, ToolCtx, ToolKind, ToolOutput};
use crate::drawable::{Drawable, DrawableKind, Style};
use crate::geometry;
use crate::snapshot::Snapshot;
use egui::{Pos2, Rect, Vec2};

/// How close (in canvas units) an edge must be to a guide line to snap.
pub const GUIDE_SNAP_TOLERANCE: f32 = 8.0;

/// Configured grid guide lines used to align dragged objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapGuides {
    /// x positions of vertical guide lines
    pub vertical: Vec<f32>,
    /// y positions of horizontal guide lines
    pub horizontal: Vec<f32>,
}

impl SnapGuides {
    /// Evenly spaced guides across a canvas, the usual grid configuration.
    pub fn grid(width: f32, height: f32, spacing: f32) -> Self {
        let mut guides = Self::default();
        if spacing > 0.0 {
            let mut x = 0.0;
            while x <= width {
                guides.vertical.push(x);
                x += spacing;
            }
            let mut y = 0.0;
            while y <= height {
                guides.horizontal.push(y);
                y += spacing;
            }
        }
        guides
    }
}

fn nearest_guide(guides: &[f32], value: f32) -> Option<f32> {
    guides
        .iter()
        .copied()
        .filter(|g| (g - value).abs() <= GUIDE_SNAP_TOLERANCE)
        .min_by(|a, b| {
            (a - value)
                .abs()
                .partial_cmp(&(b - value).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Snap a candidate top-left against the guides, each axis independently.
/// When both opposing edges qualify, the left/top snap wins.
fn snap_top_left(guides: &SnapGuides, top_left: Pos2, size: Vec2) -> Pos2 {
    let mut snapped = top_left;
    if let Some(g) = nearest_guide(&guides.vertical, top_left.x) {
        snapped.x = g;
    } else if let Some(g) = nearest_guide(&guides.vertical, top_left.x + size.x) {
        snapped.x = g - size.x;
    }
    if let Some(g) = nearest_guide(&guides.horizontal, top_left.y) {
        snapped.y = g;
    } else if let Some(g) = nearest_guide(&guides.horizontal, top_left.y + size.y) {
        snapped.y = g - size.y;
    }
    snapped
}

struct SelectState {
    drawable_id: usize,
    grab: Pos2,
    /// Bounding box at grab time; the drag moves this box
    bbox: Rect,
    kind: DrawableKind,
    style: Style,
    base: Snapshot,
}

/// Click-and-drag repositioning of committed rect/circle/line/text objects.
/// Brush strokes are not selectable. The tool only previews the offset;
/// the actual move is emitted as an instruction on pointer up.
pub struct SelectTool {
    binding: ToolBinding,
    guides: Option<SnapGuides>,
    state: Option<SelectState>,
}

impl SelectTool {
    pub fn new(binding: ToolBinding, guides: Option<SnapGuides>) -> Self {
        Self {
            binding,
            guides,
            state: None,
        }
    }

    pub fn set_guides(&mut self, guides: Option<SnapGuides>) {
        self.guides = guides;
    }

    pub fn has_selection(&self) -> bool {
        self.state.is_some()
    }

    fn selectable(obj: &Drawable) -> bool {
        !matches!(obj.kind, DrawableKind::Brush { .. })
    }

    fn candidate_top_left(&self, state: &SelectState, pos: Pos2) -> Pos2 {
        let raw = state.bbox.min + (pos - state.grab);
        match &self.guides {
            Some(guides) => snap_top_left(guides, raw, state.bbox.size()),
            None => raw,
        }
    }

    fn restore_base(&self, ctx: &mut ToolCtx<'_>) {
        let Some(state) = &self.state else { return };
        let Some(surface) = ctx.registry.get_mut(self.binding.surface) else {
            return;
        };
        match state.base.decode() {
            Ok(img) => surface.restore_pixels(img),
            Err(err) => log::warn!("select preview: base snapshot decode failed: {err}"),
        }
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        let pos = self.binding.to_canvas(pos);
        let Some(surface) = ctx.registry.get(self.binding.surface) else {
            return;
        };
        // Un-padded bounding-box test, topmost first.
        let hit = ctx
            .objects
            .iter()
            .rev()
            .filter(|obj| obj.visible_at(ctx.pointer) && Self::selectable(obj))
            .find(|obj| geometry::bounding_box(obj).contains(pos));
        let Some(obj) = hit else { return };
        let base = match Snapshot::encode(surface.image()) {
            Ok(snap) => snap,
            Err(err) => {
                log::warn!("select tool: surface readback failed, gesture dropped: {err}");
                return;
            }
        };
        self.state = Some(SelectState {
            drawable_id: obj.id,
            grab: pos,
            bbox: geometry::bounding_box(obj),
            kind: obj.kind.clone(),
            style: obj.style,
            base,
        });
    }

    fn update(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        let pos = self.binding.to_canvas(pos);
        let (preview_kind, style) = {
            let state = self.state.as_ref()?;
            let top_left = self.candidate_top_left(state, pos);
            (state.kind.with_top_left(top_left), state.style)
        };
        self.restore_base(ctx);
        let surface = ctx.registry.get_mut(self.binding.surface)?;
        let preview = Drawable {
            id: 0,
            layer_id: self.binding.surface,
            kind: preview_kind,
            style,
            committed_at: 0,
            removed: false,
        };
        crate::raster::draw_drawable(surface, &preview, ctx.font);
        None
    }

    fn commit(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        let pos = self.binding.to_canvas(pos);
        self.restore_base(ctx);
        let state = self.state.take()?;
        let top_left = self.candidate_top_left(&state, pos);
        Some(ToolOutput::Move {
            drawable_id: state.drawable_id,
            kind: state.kind.with_top_left(top_left),
        })
    }

    fn teardown(&mut self, ctx: &mut ToolCtx<'_>) {
        if self.state.is_some() {
            self.restore_base(ctx);
            self.state = None;
        }
    }
}
