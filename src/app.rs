use crate::drawable::Style;
use crate::editor::Editor;
use crate::export;
use crate::persistence::WorkspaceStore;
use crate::project::Workspace;
use crate::tools::{ActiveTool, TextKey, Tool, ToolBinding, ToolKind, new_tool};
use ab_glyph::FontArc;
use egui::{Pos2, Rect};
use std::time::Instant;

/// The part of the app worth keeping across restarts. Live surfaces are
/// rebuilt from layer snapshots on load.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct PersistedState {
    workspace: Workspace,
    tool_kind: ToolKind,
    style: Style,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            workspace: Workspace::new(),
            tool_kind: ToolKind::Brush,
            style: Style::default(),
        }
    }
}

pub struct PaintApp {
    editor: Editor,
    tool_kind: ToolKind,
    style: Style,
    active: Option<ActiveTool>,
    /// Binding the active tool was built with
    binding: Option<ToolBinding>,
    canvas_texture: Option<egui::TextureHandle>,
    new_project_name: String,
}

impl PaintApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let font = default_ui_font();
        if font.is_none() {
            log::warn!("no usable UI font found; text commits will not rasterize");
        }
        let mut editor = Editor::new(font);
        editor.set_pixel_ratio(cc.egui_ctx.pixels_per_point());

        let mut tool_kind = ToolKind::Brush;
        let mut style = Style::default();
        if let Some(storage) = cc.storage {
            if let Some(state) = eframe::get_value::<PersistedState>(storage, eframe::APP_KEY) {
                editor.load_workspace(state.workspace);
                tool_kind = state.tool_kind;
                style = state.style;
            }
        }

        Self {
            editor,
            tool_kind,
            style,
            active: None,
            binding: None,
            canvas_texture: None,
            new_project_name: String::new(),
        }
    }

    /// Rebuild the active tool only when the selected kind or its binding
    /// (target layer, style) changed; an unchanged tool keeps handling input
    /// across frames so multi-frame gestures survive. Rebuilding tears the
    /// old tool's transient state down first.
    fn ensure_tool(&mut self) {
        let Ok(layer_id) = self.editor.workspace.active_layer().map(|l| l.id) else {
            self.active = None;
            self.binding = None;
            return;
        };
        let next = ToolBinding::new(layer_id, self.style);
        if keep_active_tool(&mut self.active, self.tool_kind, self.binding.as_ref(), &next) {
            return;
        }
        if let Some(mut old) = self.active.take() {
            if let Ok(mut ctx) = self.editor.tool_ctx() {
                old.teardown(&mut ctx);
            }
        }
        self.binding = Some(next.clone());
        self.active = Some(new_tool(self.tool_kind, next));
    }

    fn route_text_input(&mut self, ctx: &egui::Context, canvas: Rect) {
        let font = self.editor.font().cloned();
        let Some(tool) = self.active.as_mut().and_then(|t| t.as_text_mut()) else {
            return;
        };
        tool.sync_bounds(canvas, font.as_ref());
        let events = ctx.input(|i| i.events.clone());
        let mut output = None;
        for event in events {
            match event {
                egui::Event::Text(text) => {
                    for ch in text.chars() {
                        tool.input_char(ch);
                    }
                }
                egui::Event::Key {
                    key: egui::Key::Enter,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    output = tool.handle_key(
                        TextKey::Enter {
                            shift: modifiers.shift,
                        },
                        font.as_ref(),
                    );
                }
                egui::Event::Key {
                    key: egui::Key::Escape,
                    pressed: true,
                    ..
                } => {
                    tool.handle_key(TextKey::Escape, font.as_ref());
                }
                egui::Event::Key {
                    key: egui::Key::Backspace,
                    pressed: true,
                    ..
                } => tool.backspace(),
                _ => {}
            }
        }
        if let Some(output) = output {
            if let Err(err) = self.editor.apply(output) {
                log::error!("applying text commit failed: {err}");
            }
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tools");
        for kind in [
            ToolKind::Brush,
            ToolKind::Rectangle,
            ToolKind::Circle,
            ToolKind::Line,
            ToolKind::Eraser,
            ToolKind::Select,
            ToolKind::Text,
        ] {
            if ui
                .selectable_label(self.tool_kind == kind, kind.label())
                .clicked()
            {
                self.tool_kind = kind;
            }
        }

        ui.separator();
        ui.label("Stroke");
        ui.color_edit_button_srgba(&mut self.style.stroke);
        ui.label("Fill");
        ui.color_edit_button_srgba(&mut self.style.fill);
        ui.add(egui::Slider::new(&mut self.style.stroke_width, 1.0..=32.0).text("Width"));
        ui.add(egui::Slider::new(&mut self.style.font_size, 8.0..=72.0).text("Font size"));

        ui.separator();
        let project_id = self.editor.workspace.active_project;
        let undo_on = project_id
            .and_then(|id| self.editor.workspace.is_undo_active(id).ok())
            .unwrap_or(false);
        let redo_on = project_id
            .and_then(|id| self.editor.workspace.is_redo_active(id).ok())
            .unwrap_or(false);
        ui.horizontal(|ui| {
            if ui.add_enabled(undo_on, egui::Button::new("Undo")).clicked() {
                if let Err(err) = self.editor.undo(None) {
                    log::error!("undo failed: {err}");
                }
            }
            if ui.add_enabled(redo_on, egui::Button::new("Redo")).clicked() {
                if let Err(err) = self.editor.redo(None) {
                    log::error!("redo failed: {err}");
                }
            }
        });

        ui.separator();
        ui.heading("Projects");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.new_project_name);
            if ui.button("New").clicked() {
                match self
                    .editor
                    .create_project(&self.new_project_name.clone(), 800, 800)
                {
                    Ok(_) => self.new_project_name.clear(),
                    Err(err) => log::warn!("project creation rejected: {err}"),
                }
            }
        });
        let projects: Vec<(uuid::Uuid, String)> = self
            .editor
            .workspace
            .projects
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        for (id, name) in projects {
            ui.horizontal(|ui| {
                if ui
                    .selectable_label(self.editor.workspace.active_project == Some(id), &name)
                    .clicked()
                {
                    if let Err(err) = self.editor.activate_project(id) {
                        log::error!("activating project failed: {err}");
                    }
                }
                if ui.small_button("x").clicked() {
                    if let Err(err) = self.editor.delete_project(id) {
                        log::error!("deleting project failed: {err}");
                    }
                }
            });
        }

        if let Ok(project) = self.editor.workspace.active_project() {
            ui.separator();
            ui.heading("Layers");
            let layers: Vec<(uuid::Uuid, String, bool, bool)> = project
                .layers
                .iter()
                .map(|l| (l.id, l.name.clone(), l.hidden, l.is_base))
                .collect();
            for (id, name, hidden, is_base) in layers {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(self.editor.workspace.active_layer == Some(id), &name)
                        .clicked()
                    {
                        if let Err(err) = self.editor.activate_layer(id) {
                            log::error!("activating layer failed: {err}");
                        }
                    }
                    let mut visible = !hidden;
                    if ui.checkbox(&mut visible, "").changed() {
                        if let Err(err) = self.editor.set_layer_hidden(id, !visible) {
                            log::error!("toggling layer failed: {err}");
                        }
                    }
                    if !is_base && ui.small_button("x").clicked() {
                        if let Err(err) = self.editor.delete_layer(id) {
                            log::error!("deleting layer failed: {err}");
                        }
                    }
                });
            }
            if ui.button("Add layer").clicked() {
                let count = self
                    .editor
                    .workspace
                    .active_project()
                    .map(|p| p.layers.len())
                    .unwrap_or(0);
                if let Err(err) = self.editor.add_layer(&format!("Layer {count}")) {
                    log::error!("adding layer failed: {err}");
                }
            }
            ui.separator();
            if ui.button("Export PNG").clicked() {
                match self.editor.export_active() {
                    Ok((filename, bytes)) => {
                        if let Err(err) = std::fs::write(&filename, bytes) {
                            log::error!("writing {filename} failed: {err}");
                        } else {
                            log::info!("exported {filename}");
                        }
                    }
                    Err(err) => log::error!("export failed: {err}"),
                }
            }
        }
    }

    fn canvas_panel(&mut self, ui: &mut egui::Ui) {
        let Ok(project) = self.editor.workspace.active_project() else {
            ui.centered_and_justified(|ui| {
                ui.label("Create a project to start drawing");
            });
            return;
        };
        let size = egui::vec2(project.width as f32, project.height as f32);

        // Composite the visible layers into a single frame texture.
        let flat = export::flatten(project, &self.editor.registry);
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [flat.width() as usize, flat.height() as usize],
            flat.as_raw(),
        );
        let texture = self.canvas_texture.get_or_insert_with(|| {
            ui.ctx()
                .load_texture("canvas", color_image.clone(), egui::TextureOptions::LINEAR)
        });
        texture.set(color_image, egui::TextureOptions::LINEAR);

        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = Rect::from_min_size(response.rect.min, size);
        painter.image(
            texture.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        self.ensure_tool();
        let canvas = Rect::from_min_size(Pos2::ZERO, size);
        self.route_text_input(ui.ctx(), canvas);
        self.draw_text_overlay(&painter, rect);

        let pointer = response
            .interact_pointer_pos()
            .map(|p| (p - response.rect.min).to_pos2());
        let Some(pos) = pointer else { return };
        let Some(tool) = self.active.as_mut() else {
            return;
        };
        let mut outputs = Vec::new();
        if let Ok(mut ctx) = self.editor.tool_ctx() {
            if response.drag_started() {
                tool.begin(&mut ctx, pos);
            } else if response.dragged() {
                outputs.extend(tool.update(&mut ctx, pos));
            }
            if response.drag_stopped() {
                outputs.extend(tool.commit(&mut ctx, pos));
            }
        }
        if response.drag_started() {
            self.editor.gesture_started();
        }
        if response.drag_stopped() {
            // An open text session defers the preview capture until it
            // commits or cancels.
            let editing_text = self
                .active
                .as_mut()
                .and_then(|t| t.as_text_mut())
                .is_some_and(|t| t.session().is_some());
            if !editing_text {
                self.editor.gesture_finished();
            }
        }
        for output in outputs {
            if let Err(err) = self.editor.apply(output) {
                log::error!("applying tool output failed: {err}");
            }
        }
    }

    /// The open text session is drawn as a live egui overlay; pixels only
    /// land on the layer surface at commit.
    fn draw_text_overlay(&mut self, painter: &egui::Painter, canvas_rect: Rect) {
        let font_size = self.style.font_size;
        let color = if self.style.fill.a() > 0 {
            self.style.fill
        } else {
            self.style.stroke
        };
        let Some(session) = self
            .active
            .as_mut()
            .and_then(|t| t.as_text_mut())
            .and_then(|t| t.session())
        else {
            return;
        };
        let anchor = canvas_rect.min + session.anchor.to_vec2();
        painter.text(
            anchor,
            egui::Align2::LEFT_TOP,
            format!("{}|", session.buffer),
            egui::FontId::proportional(font_size),
            color,
        );
        if session.out_of_bounds {
            painter.text(
                anchor - egui::vec2(0.0, font_size),
                egui::Align2::LEFT_BOTTOM,
                "text clipped to canvas",
                egui::FontId::proportional(10.0),
                egui::Color32::RED,
            );
        }
    }
}

impl eframe::App for PaintApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let state = PersistedState {
            workspace: self.editor.workspace.clone(),
            tool_kind: self.tool_kind,
            style: self.style,
        };
        eframe::set_value(storage, eframe::APP_KEY, &state);

        // A rotating JSON autosave alongside the key-value store, so a
        // corrupted store still leaves something to recover from.
        if let Some(dir) = eframe::storage_dir("paintboard") {
            let store = WorkspaceStore::new(dir.join("autosaves"));
            if let Err(err) = store.autosave(&self.editor.workspace) {
                log::warn!("workspace autosave failed: {err}");
            }
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.editor.poll_previews(Instant::now());

        egui::SidePanel::left("controls").show(ctx, |ui| {
            self.side_panel(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.canvas_panel(ui);
            });
        });
    }
}

/// Pull a usable font out of egui's embedded defaults so text commits can
/// rasterize without bundling a separate font file.
fn default_ui_font() -> Option<FontArc> {
    let defs = egui::FontDefinitions::default();
    let family = defs.families.get(&egui::FontFamily::Proportional)?;
    let name = family.first()?;
    let data = defs.font_data.get(name)?;
    FontArc::try_from_vec(data.font.to_vec()).ok()
}

/// Whether the current tool instance can keep handling input: same kind and
/// unchanged binding, or a text tool with an open session (rebuilding it
/// would abandon the buffer).
fn keep_active_tool(
    active: &mut Option<ActiveTool>,
    kind: ToolKind,
    bound: Option<&ToolBinding>,
    next: &ToolBinding,
) -> bool {
    let Some(tool) = active else { return false };
    if tool.kind() != kind {
        return false;
    }
    if tool.as_text_mut().is_some_and(|t| t.session().is_some()) {
        return true;
    }
    bound == Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Surface, SurfaceRegistry};
    use crate::tools::{Tool, ToolCtx};
    use egui::pos2;
    use uuid::Uuid;

    fn binding() -> ToolBinding {
        ToolBinding::new(Uuid::new_v4(), Style::default())
    }

    #[test]
    fn test_unchanged_tool_survives_across_frames() {
        let bound = binding();
        let mut active = Some(new_tool(ToolKind::Brush, bound.clone()));
        assert!(keep_active_tool(
            &mut active,
            ToolKind::Brush,
            Some(&bound),
            &bound
        ));
        assert!(active.is_some());
    }

    #[test]
    fn test_kind_or_binding_change_rebuilds() {
        let bound = binding();
        let mut active = Some(new_tool(ToolKind::Brush, bound.clone()));
        assert!(!keep_active_tool(
            &mut active,
            ToolKind::Select,
            Some(&bound),
            &bound
        ));
        let mut restyled = bound.clone();
        restyled.style.stroke_width += 1.0;
        assert!(!keep_active_tool(
            &mut active,
            ToolKind::Brush,
            Some(&bound),
            &restyled
        ));
        assert!(!keep_active_tool(&mut active, ToolKind::Brush, None, &bound));
    }

    #[test]
    fn test_open_text_session_outlives_binding_changes() {
        let layer_id = Uuid::new_v4();
        let mut registry = SurfaceRegistry::new();
        registry.insert(layer_id, Surface::new(64, 64, 1.0));
        let bound = ToolBinding::new(layer_id, Style::default());
        let mut active = Some(new_tool(ToolKind::Text, bound.clone()));
        {
            let tool = active.as_mut().unwrap();
            let mut ctx = ToolCtx {
                registry: &mut registry,
                objects: &[],
                pointer: 0,
                font: None,
            };
            tool.begin(&mut ctx, pos2(10.0, 10.0));
            tool.commit(&mut ctx, pos2(10.0, 10.0));
        }
        let mut restyled = bound.clone();
        restyled.style.font_size += 4.0;
        assert!(keep_active_tool(
            &mut active,
            ToolKind::Text,
            Some(&bound),
            &restyled
        ));
        // Switching away from the text tool still rebuilds.
        assert!(!keep_active_tool(
            &mut active,
            ToolKind::Brush,
            Some(&bound),
            &restyled
        ));
    }
}
