use super::{Tool, ToolBinding, ToolCtx, ToolKind, ToolOutput};
use crate::drawable::DrawableKind;
use crate::raster;
use egui::Pos2;
use image::RgbaImage;

/// State for the brush tool's current stroke
struct BrushState {
    /// Raw pixel buffer captured before the stroke started
    pre_stroke: RgbaImage,
    points: Vec<Pos2>,
}

/// Freehand drawing. Every repaint restores the pre-stroke buffer and
/// strokes the full accumulated polyline, so anti-aliasing never compounds
/// across incremental segments.
pub struct BrushTool {
    binding: ToolBinding,
    state: Option<BrushState>,
}

impl BrushTool {
    pub fn new(binding: ToolBinding) -> Self {
        Self {
            binding,
            state: None,
        }
    }

    fn repaint(&mut self, ctx: &mut ToolCtx<'_>) {
        let Some(state) = &self.state else { return };
        let Some(surface) = ctx.registry.get_mut(self.binding.surface) else {
            return;
        };
        surface.restore_pixels(state.pre_stroke.clone());
        raster::stroke_polyline(
            surface,
            &state.points,
            self.binding.style.stroke_width.max(1.0),
            self.binding.style.stroke,
        );
    }

    /// Finish the stroke and emit the drawable if it has at least two
    /// points. The pre-stroke pixels are restored either way: a single-point
    /// tap leaves no trace, and a real stroke is rasterized exactly once by
    /// the dispatcher applying the emitted commit.
    fn finish(&mut self, ctx: &mut ToolCtx<'_>) -> Option<ToolOutput> {
        let state = self.state.take()?;
        let Some(surface) = ctx.registry.get_mut(self.binding.surface) else {
            return None;
        };
        surface.restore_pixels(state.pre_stroke);
        if state.points.len() < 2 {
            return None;
        }
        Some(ToolOutput::Commit {
            kind: DrawableKind::Brush {
                points: state.points,
            },
            style: self.binding.style,
        })
    }
}

impl Tool for BrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Brush
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        let pos = self.binding.to_canvas(pos);
        let Some(surface) = ctx.registry.get_mut(self.binding.surface) else {
            return;
        };
        let start = self.binding.snapped(surface.clamp(pos));
        self.state = Some(BrushState {
            pre_stroke: surface.image().clone(),
            points: vec![start],
        });
    }

    fn update(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        self.state.as_ref()?;
        let pos = self.binding.to_canvas(pos);
        let (inside, clamped) = {
            let surface = ctx.registry.get(self.binding.surface)?;
            (surface.contains(pos), surface.clamp(pos))
        };
        let point = self.binding.snapped(clamped);
        if let Some(state) = &mut self.state {
            state.points.push(point);
        }
        self.repaint(ctx);
        if !inside {
            // The pointer left the surface: force-commit at the boundary
            // instead of silently dropping the stroke.
            return self.finish(ctx);
        }
        None
    }

    fn commit(&mut self, ctx: &mut ToolCtx<'_>, _pos: Pos2) -> Option<ToolOutput> {
        self.finish(ctx)
    }

    fn teardown(&mut self, ctx: &mut ToolCtx<'_>) {
        // Cancel any in-flight preview so nothing leaks into the next tool.
        if let Some(state) = self.state.take() {
            if let Some(surface) = ctx.registry.get_mut(self.binding.surface) {
                surface.restore_pixels(state.pre_stroke);
            }
        }
    }
}
