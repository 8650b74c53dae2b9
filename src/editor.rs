//! The dispatching caller tying the pieces together: it owns the workspace,
//! the live surface registry and the preview scheduler, applies committed
//! tool instructions as one atomic step (mutate object log, rasterize,
//! capture snapshots, append the history entry), and drives undo/redo.

use crate::autosave::PreviewScheduler;
use crate::drawable::Drawable;
use crate::error::{EditorError, EditorResult};
use crate::export;
use crate::history::ActionKind;
use crate::layer::Layer;
use crate::project::Workspace;
use crate::raster;
use crate::redraw;
use crate::snapshot::Snapshot;
use crate::surface::{Surface, SurfaceRegistry};
use crate::tools::{ToolCtx, ToolOutput};
use ab_glyph::FontArc;
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Longest edge of generated project preview thumbnails, in pixels.
const PREVIEW_MAX_DIM: u32 = 256;

pub struct Editor {
    pub workspace: Workspace,
    pub registry: SurfaceRegistry,
    pub scheduler: PreviewScheduler,
    font: Option<FontArc>,
    pixel_ratio: f32,
}

impl Editor {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            workspace: Workspace::new(),
            registry: SurfaceRegistry::new(),
            scheduler: PreviewScheduler::new(),
            font,
            pixel_ratio: 1.0,
        }
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    pub fn set_font(&mut self, font: Option<FontArc>) {
        self.font = font;
    }

    /// Backing scale for surfaces created from here on. Existing surfaces
    /// keep the ratio they were created with.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    /// Create a project and give its base layer a live surface. The project
    /// becomes active.
    pub fn create_project(&mut self, name: &str, width: u32, height: u32) -> EditorResult<Uuid> {
        let project_id = self.workspace.create_project(name, width, height)?;
        self.ensure_surfaces(project_id)?;
        Ok(project_id)
    }

    /// Delete a project, cascading its layers, history, surfaces and any
    /// pending preview deadline.
    pub fn delete_project(&mut self, project_id: Uuid) -> EditorResult<()> {
        let removed = self.workspace.delete_project(project_id)?;
        for layer in &removed.layers {
            self.registry.remove(layer.id);
        }
        self.scheduler.cancel(project_id);
        log::info!("deleted project {} ({})", removed.name, project_id);
        Ok(())
    }

    /// Switch the active project, materializing surfaces for its layers
    /// from their stored snapshots.
    pub fn activate_project(&mut self, project_id: Uuid) -> EditorResult<()> {
        self.workspace.set_active_project(project_id)?;
        self.ensure_surfaces(project_id)
    }

    /// Replace the whole workspace (e.g. restored from persistence) and
    /// rebuild the active project's surfaces.
    pub fn load_workspace(&mut self, workspace: Workspace) {
        self.workspace = workspace;
        self.registry.clear();
        if let Some(project_id) = self.workspace.active_project {
            if let Err(err) = self.ensure_surfaces(project_id) {
                log::warn!("loaded workspace with stale active project: {err}");
                self.workspace.active_project = None;
                self.workspace.active_layer = None;
            }
        }
    }

    /// Make sure every layer of a project has a live surface, filling fresh
    /// surfaces from the layer's stored snapshot.
    fn ensure_surfaces(&mut self, project_id: Uuid) -> EditorResult<()> {
        let project = self.workspace.project(project_id)?;
        let (width, height) = (project.width, project.height);
        for layer in &project.layers {
            if self.registry.contains(layer.id) {
                continue;
            }
            let mut surface = Surface::new(width, height, self.pixel_ratio);
            if let Some(snap) = &layer.snapshot {
                match snap.decode() {
                    Ok(img) => raster::blit_scaled(&mut surface, &img),
                    Err(err) => {
                        log::warn!("surface init: snapshot decode failed for {}: {err}", layer.id);
                    }
                }
            }
            self.registry.insert(layer.id, surface);
        }
        Ok(())
    }

    /// Borrow the pieces a tool needs for one pointer event.
    pub fn tool_ctx(&mut self) -> EditorResult<ToolCtx<'_>> {
        let pointer = self.workspace.active_project()?.history.pointer();
        let layer = self.workspace.active_layer()?;
        Ok(ToolCtx {
            registry: &mut self.registry,
            objects: &layer.objects,
            pointer,
            font: self.font.as_ref(),
        })
    }

    /// A pointer-down cancels the active project's pending preview capture;
    /// the matching pointer-up re-arms it.
    pub fn gesture_started(&self) {
        if let Some(project_id) = self.workspace.active_project {
            self.scheduler.cancel(project_id);
        }
    }

    pub fn gesture_finished(&self) {
        if let Some(project_id) = self.workspace.active_project {
            self.scheduler.arm(project_id, Instant::now());
        }
    }

    /// Apply one committed tool instruction to the active project and
    /// layer: mutate the object log, repaint the layer surface, then record
    /// a history entry with a full snapshot set.
    pub fn apply(&mut self, output: ToolOutput) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        let layer_id = self.workspace.active_layer()?.id;
        self.prepare_append(project_id)?;

        let action = match output {
            ToolOutput::Commit { kind, style } => {
                let project = self.workspace.project_mut(project_id)?;
                let committed_at = project.history.next_index();
                let drawable = Drawable::new(layer_id, kind, style, committed_at);
                let drawable_id = drawable.id;
                log::debug!(
                    "committing {} {} on layer {layer_id}",
                    drawable.kind.variant_name(),
                    drawable_id
                );
                project.layer_mut(layer_id)?.push_object(drawable);
                self.paint_object(project_id, layer_id, drawable_id)?;
                ActionKind::ToolCommit {
                    layer_id,
                    drawable_id,
                }
            }
            ToolOutput::Erase { drawable_id } => {
                let project = self.workspace.project_mut(project_id)?;
                let pointer = project.history.pointer();
                let obj = project
                    .layer_mut(layer_id)?
                    .object_mut(drawable_id)
                    .ok_or(EditorError::UnknownDrawable(drawable_id))?;
                obj.removed = true;
                self.replay_layer(project_id, layer_id, pointer)?;
                ActionKind::Erase {
                    layer_id,
                    drawable_id,
                }
            }
            ToolOutput::Move { drawable_id, kind } => {
                let project = self.workspace.project_mut(project_id)?;
                let pointer = project.history.pointer();
                let obj = project
                    .layer_mut(layer_id)?
                    .object_mut(drawable_id)
                    .ok_or(EditorError::UnknownDrawable(drawable_id))?;
                let from = obj.kind.clone();
                let to = kind.normalized();
                obj.kind = to.clone();
                self.replay_layer(project_id, layer_id, pointer)?;
                ActionKind::Move {
                    layer_id,
                    drawable_id,
                    from,
                    to,
                }
            }
        };
        self.commit_entry(project_id, action)
    }

    /// Step the active project's history pointer back and restore the
    /// designated state. A negative hint is rejected; undo on an empty or
    /// already-at-zero history is a no-op / idempotent.
    pub fn undo(&mut self, hint: Option<i64>) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        let (from, target) = {
            let history = self.workspace.history_mut(project_id)?;
            let from = history.pointer();
            match history.undo(hint)? {
                Some(entry) => (from, entry.id),
                None => return Ok(()),
            }
        };
        self.restore_pointer_move(project_id, from, target)?;
        self.scheduler.arm(project_id, Instant::now());
        Ok(())
    }

    /// Advance the pointer into the redo tail, if any, and restore.
    pub fn redo(&mut self, hint: Option<i64>) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        let (from, target) = {
            let history = self.workspace.history_mut(project_id)?;
            let from = history.pointer();
            match history.redo(hint) {
                Some(entry) => (from, entry.id),
                None => return Ok(()),
            }
        };
        self.restore_pointer_move(project_id, from, target)?;
        self.scheduler.arm(project_id, Instant::now());
        Ok(())
    }

    /// Add a layer above the current top and make it active.
    pub fn add_layer(&mut self, name: &str) -> EditorResult<Uuid> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        let project = self.workspace.project_mut(project_id)?;
        let layer = Layer::new(name, project.next_z_index());
        let layer_id = layer.id;
        let (width, height) = (project.width, project.height);
        project.layers.push(layer);
        self.registry
            .insert(layer_id, Surface::new(width, height, self.pixel_ratio));
        self.workspace.active_layer = Some(layer_id);
        self.commit_entry(project_id, ActionKind::LayerAdd { layer_id })?;
        Ok(layer_id)
    }

    /// Delete a layer; the base layer is never deletable. If the deleted
    /// layer was active, the first remaining layer becomes active.
    pub fn delete_layer(&mut self, layer_id: Uuid) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        if self.workspace.project(project_id)?.layer(layer_id)?.is_base {
            return Err(EditorError::BaseLayerDelete);
        }
        self.prepare_append(project_id)?;
        let project = self.workspace.project_mut(project_id)?;
        project.layers.retain(|l| l.id != layer_id);
        self.registry.remove(layer_id);
        if self.workspace.active_layer == Some(layer_id) {
            let first = self.workspace.project(project_id)?.layers.first().map(|l| l.id);
            self.workspace.active_layer = first;
        }
        self.commit_entry(project_id, ActionKind::LayerDelete { layer_id })
    }

    /// Tombstone every drawable of a layer visible at the current pointer.
    pub fn clear_layer(&mut self, layer_id: Uuid) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        let project = self.workspace.project_mut(project_id)?;
        let pointer = project.history.pointer();
        let layer = project.layer_mut(layer_id)?;
        let mut drawable_ids = Vec::new();
        for obj in &mut layer.objects {
            if obj.visible_at(pointer) {
                obj.removed = true;
                drawable_ids.push(obj.id);
            }
        }
        self.replay_layer(project_id, layer_id, pointer)?;
        self.commit_entry(
            project_id,
            ActionKind::LayerClear {
                layer_id,
                drawable_ids,
            },
        )
    }

    pub fn rename_layer(&mut self, layer_id: Uuid, name: &str) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        self.workspace
            .project_mut(project_id)?
            .layer_mut(layer_id)?
            .set_name(name.to_string());
        self.commit_entry(project_id, ActionKind::LayerRename { layer_id })
    }

    pub fn set_layer_opacity(&mut self, layer_id: Uuid, opacity: u8) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        self.workspace
            .project_mut(project_id)?
            .layer_mut(layer_id)?
            .set_opacity(opacity);
        self.commit_entry(project_id, ActionKind::LayerOpacity { layer_id })
    }

    pub fn set_layer_hidden(&mut self, layer_id: Uuid, hidden: bool) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        self.workspace
            .project_mut(project_id)?
            .layer_mut(layer_id)?
            .hidden = hidden;
        self.commit_entry(project_id, ActionKind::LayerHide { layer_id })
    }

    /// Assign a layer a new z index. The base layer keeps rendering first
    /// regardless, so reordering it is rejected like deleting it would be.
    pub fn set_layer_z(&mut self, layer_id: Uuid, z_index: i32) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.prepare_append(project_id)?;
        self.workspace
            .project_mut(project_id)?
            .layer_mut(layer_id)?
            .z_index = z_index;
        self.commit_entry(project_id, ActionKind::LayerReorder { layer_id })
    }

    /// Switch the active layer of the active project, recorded in history.
    pub fn activate_layer(&mut self, layer_id: Uuid) -> EditorResult<()> {
        let project_id = self.workspace.active_project()?.id;
        self.workspace.set_active_layer(layer_id)?;
        self.prepare_append(project_id)?;
        self.commit_entry(project_id, ActionKind::ActiveChange { layer_id })
    }

    /// Flatten the active project to PNG bytes plus a suggested filename.
    pub fn export_active(&self) -> EditorResult<(String, Vec<u8>)> {
        let project = self.workspace.active_project()?;
        let bytes = export::export_png(project, &self.registry)?;
        Ok((export::export_filename(&project.name), bytes))
    }

    /// Regenerate preview thumbnails for every project whose debounce
    /// deadline has elapsed.
    pub fn poll_previews(&mut self, now: Instant) {
        for project_id in self.scheduler.poll(now) {
            let Ok(project) = self.workspace.project(project_id) else {
                continue;
            };
            let flat = export::flatten(project, &self.registry);
            match Snapshot::thumbnail(&flat, PREVIEW_MAX_DIM) {
                Ok(snap) => {
                    if let Ok(project) = self.workspace.project_mut(project_id) {
                        project.preview = Some(snap);
                        log::debug!("captured preview for project {project_id}");
                    }
                }
                Err(err) => log::warn!("preview capture failed for {project_id}: {err}"),
            }
        }
    }

    /// An append while a redo tail exists truncates that tail; objects
    /// committed inside it must be purged first so they cannot resurface.
    fn prepare_append(&mut self, project_id: Uuid) -> EditorResult<()> {
        let project = self.workspace.project_mut(project_id)?;
        if project.history.is_redo_active() {
            project.purge_future_objects();
        }
        Ok(())
    }

    /// Rasterize one committed object onto its layer surface.
    fn paint_object(
        &mut self,
        project_id: Uuid,
        layer_id: Uuid,
        drawable_id: usize,
    ) -> EditorResult<()> {
        let layer = self.workspace.project(project_id)?.layer(layer_id)?;
        if let Some(surface) = self.registry.get_mut(layer_id) {
            if let Some(obj) = layer.object(drawable_id) {
                raster::draw_drawable(surface, obj, self.font.as_ref());
            }
        } else {
            log::debug!("no surface for layer {layer_id}, commit kept object-only");
        }
        Ok(())
    }

    /// Repaint one layer surface from its object log at a pointer.
    fn replay_layer(
        &mut self,
        project_id: Uuid,
        layer_id: Uuid,
        pointer: usize,
    ) -> EditorResult<()> {
        let layer = self.workspace.project(project_id)?.layer(layer_id)?;
        if let Some(surface) = self.registry.get_mut(layer_id) {
            redraw::replay_objects(surface, layer, pointer, self.font.as_ref());
        }
        Ok(())
    }

    /// Capture the full snapshot set, persist it on the layers, append the
    /// history entry and re-arm the preview deadline.
    fn commit_entry(&mut self, project_id: Uuid, action: ActionKind) -> EditorResult<()> {
        let snapshots = self.capture_snapshots(project_id)?;
        let project = self.workspace.project_mut(project_id)?;
        for layer in &mut project.layers {
            if let Some(snap) = snapshots.get(&layer.id) {
                layer.snapshot = Some(snap.clone());
            }
        }
        project.history.append(action, snapshots);
        self.scheduler.arm(project_id, Instant::now());
        Ok(())
    }

    fn capture_snapshots(&self, project_id: Uuid) -> EditorResult<HashMap<Uuid, Snapshot>> {
        let project = self.workspace.project(project_id)?;
        let mut snapshots = HashMap::new();
        for layer in &project.layers {
            if let Some(surface) = self.registry.get(layer.id) {
                match Snapshot::encode(surface.image()) {
                    Ok(snap) => {
                        snapshots.insert(layer.id, snap);
                    }
                    Err(err) => {
                        log::warn!("snapshot capture failed for layer {}: {err}", layer.id);
                    }
                }
            } else if let Some(snap) = &layer.snapshot {
                snapshots.insert(layer.id, snap.clone());
            }
        }
        Ok(snapshots)
    }

    /// Restore the project's visible state after the history pointer moved
    /// from `from` to `target`. Crossed erase and layer-clear entries are
    /// undone/redone by flipping their tombstones and replaying the affected
    /// layers; crossed move entries flip the object's geometry so hit
    /// testing matches the restored pixels; every other layer restores from
    /// the target entry's snapshot set.
    fn restore_pointer_move(
        &mut self,
        project_id: Uuid,
        from: usize,
        target: usize,
    ) -> EditorResult<()> {
        let font = self.font.clone();
        let project = self.workspace.project_mut(project_id)?;
        let mut touched: Vec<Uuid> = Vec::new();
        if target != from {
            let (lo, hi, removing) = if target < from {
                (target + 1, from, false)
            } else {
                (from + 1, target, true)
            };
            let mut actions: Vec<ActionKind> = project.history.entries()[lo..=hi]
                .iter()
                .map(|e| e.action.clone())
                .collect();
            if !removing {
                // Undo applies crossed entries newest-first so stacked moves
                // of one object land on the earliest geometry.
                actions.reverse();
            }
            for action in actions {
                match action {
                    ActionKind::Erase {
                        layer_id,
                        drawable_id,
                    } => {
                        if let Ok(layer) = project.layer_mut(layer_id) {
                            if let Some(obj) = layer.object_mut(drawable_id) {
                                obj.removed = removing;
                            }
                            touched.push(layer_id);
                        }
                    }
                    ActionKind::LayerClear {
                        layer_id,
                        drawable_ids,
                    } => {
                        if let Ok(layer) = project.layer_mut(layer_id) {
                            for id in drawable_ids {
                                if let Some(obj) = layer.object_mut(id) {
                                    obj.removed = removing;
                                }
                            }
                            touched.push(layer_id);
                        }
                    }
                    ActionKind::Move {
                        layer_id,
                        drawable_id,
                        from,
                        to,
                    } => {
                        if let Ok(layer) = project.layer_mut(layer_id) {
                            if let Some(obj) = layer.object_mut(drawable_id) {
                                obj.kind = if removing { to } else { from };
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        if let Some(entry) = project.history.entries().get(target) {
            redraw::redraw(&mut self.registry, &project.layers, entry);
        }
        for layer_id in touched {
            if let Ok(layer) = project.layer(layer_id) {
                if let Some(surface) = self.registry.get_mut(layer_id) {
                    redraw::replay_objects(surface, layer, target, font.as_ref());
                }
            }
        }
        Ok(())
    }
}
