use super::{Tool, ToolBinding, ToolCtx, ToolKind, ToolOutput};
use crate::geometry;
use egui::Pos2;

/// Base hit-test tolerance; the tested object's half stroke width is added
/// on top by the hit test itself.
pub const ERASER_TOLERANCE: f32 = 5.0;

/// Click-to-erase. Hit-tests the topmost visible drawable on pointer down
/// (there is no drag stroke) and emits a tombstone instruction on commit.
/// A click over empty canvas is a complete no-op.
pub struct EraserTool {
    binding: ToolBinding,
    pending: Option<usize>,
}

impl EraserTool {
    pub fn new(binding: ToolBinding) -> Self {
        Self {
            binding,
            pending: None,
        }
    }
}

impl Tool for EraserTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eraser
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        if !ctx.registry.contains(self.binding.surface) {
            return;
        }
        let pos = self.binding.to_canvas(pos);
        self.pending = ctx
            .objects
            .iter()
            .rev()
            .filter(|obj| obj.visible_at(ctx.pointer))
            .find(|obj| geometry::hits(obj, pos, ERASER_TOLERANCE))
            .map(|obj| obj.id);
    }

    fn update(&mut self, _ctx: &mut ToolCtx<'_>, _pos: Pos2) -> Option<ToolOutput> {
        None
    }

    fn commit(&mut self, _ctx: &mut ToolCtx<'_>, _pos: Pos2) -> Option<ToolOutput> {
        self.pending
            .take()
            .map(|drawable_id| ToolOutput::Erase { drawable_id })
    }

    fn teardown(&mut self, _ctx: &mut ToolCtx<'_>) {
        self.pending = None;
    }
}
