use crate::drawable::{Drawable, DrawableKind, Style};
use crate::surface::SurfaceRegistry;
use ab_glyph::FontArc;
use egui::Pos2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod brush;
mod eraser;
mod select;
mod shape;
mod text;

pub use brush::BrushTool;
pub use eraser::EraserTool;
pub use select::{SelectTool, SnapGuides};
pub use shape::ShapeTool;
pub use text::{EstimateMeasure, GlyphMeasure, TextKey, TextMeasure, TextTool, wrap_text};

/// The closed set of drawing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    Brush,
    Rectangle,
    Circle,
    Line,
    Eraser,
    Select,
    Text,
}

impl ToolKind {
    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
            ToolKind::Line => "Line",
            ToolKind::Eraser => "Eraser",
            ToolKind::Select => "Select",
            ToolKind::Text => "Text",
        }
    }
}

/// Grid snapping applied to raw pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGrid {
    pub spacing: f32,
}

impl SnapGrid {
    pub fn snap(&self, pos: Pos2) -> Pos2 {
        if self.spacing <= 0.0 {
            return pos;
        }
        Pos2::new(
            (pos.x / self.spacing).round() * self.spacing,
            (pos.y / self.spacing).round() * self.spacing,
        )
    }
}

/// What every tool is constructed bound to: one target surface, a style
/// bundle, the view zoom and an optional grid-snap.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBinding {
    pub surface: Uuid,
    pub style: Style,
    pub zoom: f32,
    pub snap: Option<SnapGrid>,
}

impl ToolBinding {
    pub fn new(surface: Uuid, style: Style) -> Self {
        Self {
            surface,
            style,
            zoom: 1.0,
            snap: None,
        }
    }

    /// Convert a screen-space pointer position to canvas space.
    pub fn to_canvas(&self, pos: Pos2) -> Pos2 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        (pos.to_vec2() / zoom).to_pos2()
    }

    pub fn snapped(&self, pos: Pos2) -> Pos2 {
        match self.snap {
            Some(grid) => grid.snap(pos),
            None => pos,
        }
    }
}

/// Everything a tool may look at while handling a pointer event. Tools
/// never mutate shared editor state through this; they only paint their
/// bound surface and emit instructions.
pub struct ToolCtx<'a> {
    pub registry: &'a mut SurfaceRegistry,
    /// The active layer's object log, oldest first
    pub objects: &'a [Drawable],
    /// Current history pointer of the active project
    pub pointer: usize,
    pub font: Option<&'a FontArc>,
}

/// Instruction emitted by a committed tool gesture. Applying it to the
/// store is the dispatching caller's job, never the tool's.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Commit a fresh drawable onto the bound layer
    Commit { kind: DrawableKind, style: Style },
    /// Tombstone an existing drawable
    Erase { drawable_id: usize },
    /// Reposition an existing drawable (select tool)
    Move { drawable_id: usize, kind: DrawableKind },
}

/// Capability interface every drawing mode implements.
///
/// Lifecycle: idle, `begin` on pointer down (armed), `update` on pointer
/// move (active, live preview; may force-commit at the surface boundary),
/// `commit` on pointer up, back to idle. `teardown` drops all transient
/// state so nothing leaks into the next tool instance; tools are replaced,
/// not reused, when the mode changes. A missing bound surface turns every
/// handler into a no-op.
pub trait Tool {
    fn kind(&self) -> ToolKind;
    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2);
    fn update(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput>;
    fn commit(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput>;
    fn teardown(&mut self, ctx: &mut ToolCtx<'_>);
}

/// Enum dispatch over the tool set; avoids `Box<dyn Tool>` and keeps the
/// variant set closed.
pub enum ActiveTool {
    Brush(BrushTool),
    Shape(ShapeTool),
    Eraser(EraserTool),
    Select(SelectTool),
    Text(TextTool),
}

impl ActiveTool {
    pub fn as_text_mut(&mut self) -> Option<&mut TextTool> {
        match self {
            ActiveTool::Text(tool) => Some(tool),
            _ => None,
        }
    }
}

impl Tool for ActiveTool {
    fn kind(&self) -> ToolKind {
        match self {
            ActiveTool::Brush(t) => t.kind(),
            ActiveTool::Shape(t) => t.kind(),
            ActiveTool::Eraser(t) => t.kind(),
            ActiveTool::Select(t) => t.kind(),
            ActiveTool::Text(t) => t.kind(),
        }
    }

    fn begin(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) {
        match self {
            ActiveTool::Brush(t) => t.begin(ctx, pos),
            ActiveTool::Shape(t) => t.begin(ctx, pos),
            ActiveTool::Eraser(t) => t.begin(ctx, pos),
            ActiveTool::Select(t) => t.begin(ctx, pos),
            ActiveTool::Text(t) => t.begin(ctx, pos),
        }
    }

    fn update(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        match self {
            ActiveTool::Brush(t) => t.update(ctx, pos),
            ActiveTool::Shape(t) => t.update(ctx, pos),
            ActiveTool::Eraser(t) => t.update(ctx, pos),
            ActiveTool::Select(t) => t.update(ctx, pos),
            ActiveTool::Text(t) => t.update(ctx, pos),
        }
    }

    fn commit(&mut self, ctx: &mut ToolCtx<'_>, pos: Pos2) -> Option<ToolOutput> {
        match self {
            ActiveTool::Brush(t) => t.commit(ctx, pos),
            ActiveTool::Shape(t) => t.commit(ctx, pos),
            ActiveTool::Eraser(t) => t.commit(ctx, pos),
            ActiveTool::Select(t) => t.commit(ctx, pos),
            ActiveTool::Text(t) => t.commit(ctx, pos),
        }
    }

    fn teardown(&mut self, ctx: &mut ToolCtx<'_>) {
        match self {
            ActiveTool::Brush(t) => t.teardown(ctx),
            ActiveTool::Shape(t) => t.teardown(ctx),
            ActiveTool::Eraser(t) => t.teardown(ctx),
            ActiveTool::Select(t) => t.teardown(ctx),
            ActiveTool::Text(t) => t.teardown(ctx),
        }
    }
}

/// Factory selecting the active variant by tool kind.
pub fn new_tool(kind: ToolKind, binding: ToolBinding) -> ActiveTool {
    match kind {
        ToolKind::Brush => ActiveTool::Brush(BrushTool::new(binding)),
        ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line => {
            ActiveTool::Shape(ShapeTool::new(kind, binding))
        }
        ToolKind::Eraser => ActiveTool::Eraser(EraserTool::new(binding)),
        ToolKind::Select => ActiveTool::Select(SelectTool::new(binding, None)),
        ToolKind::Text => ActiveTool::Text(TextTool::new(binding)),
    }
}
