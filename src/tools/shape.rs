use super::{Tool, ToolBinding, ToolCtx, ToolKind, ToolOutput};
use crate::drawable::{Drawable, DrawableKind};
use crate::snapshot::Snapshot;
use egui::{Pos2, Rect};

struct ShapeState {
    start: Pos2,
    /// Full-surface readback taken at arm time. Captured through the
    /// encoded form, not the raw buffer, so intermediate previews can never
    /// bleed into the base snapshot.
    base: Snapshot,
}

/// Drag-to-draw machinery shared by the rectangle, circle and line modes.
pub struct ShapeTool {
    kind: ToolKind,
    binding: ToolBinding,
    state: Option<ShapeState>,
}

impl ShapeTool {
    pub fn new(kind: ToolKind, binding: ToolBinding) -> Self {
        debug_assert!(matches!(
            kind,
            ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line
        ));
        Self {
            kind,
            binding,
            state: None,
        }
    }

    fn geometry(&self, start: Pos2, current: Pos2) -> DrawableKind {
        match self.kind {
            ToolKind::Rectangle => DrawableKind::Rect {
                rect: Rect::from_two_pos(start, current),
            },
            ToolKind::Circle => DrawableKind::Circle {
                center: start,
                radius: (current - start).length(),
            },
            _ => DrawableKind::Line {
                from: start,
                to: current,
            },
        }
    }

    fn restore_base(&self, ctx: &mut ToolCtx<'_>) {
        let Some(state) = &self.state else { return };
        let Some(surface) = ctx.registry.get_mut(self.binding.surface) else {
            return;
        };
        match state.base.decode() {
            Ok(img) => surface.restore_pixels(img),
            Err(err) => {
                log::warn!("shape preview: base snapshot decode failed: {err}");
            }
        }
    }
}

impl Tool for ShapeTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        let pos = self.binding.to_canvas(pos);
        let Some(surface) = ctx.registry.get(self.binding.surface) else {
            return;
        };
        let base = match Snapshot::encode(surface.image()) {
            Ok(snap) => snap,
            Err(err) => {
                log::warn!("shape tool: surface readback failed, gesture dropped: {err}");
                return;
            }
        };
        self.state = Some(ShapeState { start: pos, base });
    }

    fn update(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        let start = self.state.as_ref()?.start;
        let pos = self.binding.to_canvas(pos);
        self.restore_base(ctx);
        let surface = ctx.registry.get_mut(self.binding.surface)?;
        let preview = Drawable {
            id: 0,
            layer_id: self.binding.surface,
            kind: self.geometry(start, pos).normalized(),
            style: self.binding.style,
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
        ctx.registry.get(self.binding.surface)?;
        Some(ToolOutput::Commit {
            kind: self.geometry(state.start, pos).normalized(),
            style: self.binding.style,
        })
    }

    fn teardown(&mut self, ctx: &mut ToolCtx<'_>) {
        if self.state.is_some() {
            self.restore_base(ctx);
            self.state = None;
        }
    }
}
