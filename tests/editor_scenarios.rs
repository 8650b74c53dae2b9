use egui::{Color32, Pos2, Rect, pos2};
use paintboard::autosave::PREVIEW_DELAY;
use paintboard::drawable::{DrawableKind, Style};
use paintboard::editor::Editor;
use paintboard::error::EditorError;
use paintboard::export;
use paintboard::geometry;
use paintboard::history::ActionKind;
use paintboard::tools::ToolOutput;
use std::time::Instant;
use uuid::Uuid;

fn fill_style(fill: Color32) -> Style {
    Style {
        fill,
        stroke: Color32::TRANSPARENT,
        stroke_width: 0.0,
        font_size: 16.0,
    }
}

fn rect_commit(min: Pos2, max: Pos2, fill: Color32) -> ToolOutput {
    ToolOutput::Commit {
        kind: DrawableKind::Rect {
            rect: Rect::from_two_pos(min, max),
        },
        style: fill_style(fill),
    }
}

fn surface_pixel(editor: &Editor, layer_id: Uuid, x: u32, y: u32) -> [u8; 4] {
    editor
        .registry
        .get(layer_id)
        .unwrap()
        .image()
        .get_pixel(x, y)
        .0
}

fn editor_with_project() -> (Editor, Uuid, Uuid) {
    let mut editor = Editor::new(None);
    let project_id = editor.create_project("Sketch", 800, 800).unwrap();
    let layer_id = editor.workspace.active_layer().unwrap().id;
    (editor, project_id, layer_id)
}

#[test]
fn test_project_creation_validations() {
    let mut editor = Editor::new(None);
    editor.create_project("Sketch", 800, 800).unwrap();

    let err = editor.create_project("Sketch", 100, 100).unwrap_err();
    assert!(matches!(err, EditorError::DuplicateProjectName(_)));

    let err = editor.create_project("bad/name", 100, 100).unwrap_err();
    assert!(matches!(err, EditorError::InvalidProjectName(_)));

    let err = editor.create_project("Other", 0, 100).unwrap_err();
    assert!(matches!(err, EditorError::InvalidDimensions { .. }));

    let err = editor.create_project("   ", 100, 100).unwrap_err();
    assert!(matches!(err, EditorError::InvalidProjectName(_)));
}

#[test]
fn test_new_project_has_base_layer_and_surface() {
    let (editor, project_id, layer_id) = editor_with_project();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.layers.len(), 1);
    assert!(project.layers[0].is_base);
    assert_eq!(project.layers[0].id, layer_id);
    assert!(editor.registry.contains(layer_id));
    assert!(project.history.is_empty());
}

#[test]
fn test_rect_commit_rasterizes_and_records_history() {
    let (mut editor, project_id, layer_id) = editor_with_project();

    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();

    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.len(), 1);
    assert_eq!(project.history.pointer(), 0);
    let entry = project.history.current().unwrap();
    assert!(matches!(entry.action, ActionKind::ToolCommit { .. }));
    // The entry carries the base layer's snapshot, and the layer keeps one.
    assert!(entry.snapshots.contains_key(&layer_id));
    assert!(project.layers[0].snapshot.is_some());

    assert_eq!(surface_pixel(&editor, layer_id, 150, 150), [255, 0, 0, 255]);
    assert_eq!(surface_pixel(&editor, layer_id, 50, 50)[3], 0);
}

#[test]
fn test_undo_redo_restore_pixels() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    editor
        .apply(rect_commit(pos2(300.0, 300.0), pos2(400.0, 400.0), Color32::BLUE))
        .unwrap();
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350), [0, 0, 255, 255]);

    editor.undo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.pointer(), 0);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350)[3], 0);
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150), [255, 0, 0, 255]);

    editor.redo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.pointer(), 1);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350), [0, 0, 255, 255]);
}

#[test]
fn test_commit_after_undo_truncates_and_purges() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    editor
        .apply(rect_commit(pos2(300.0, 300.0), pos2(400.0, 400.0), Color32::BLUE))
        .unwrap();
    editor.undo(None).unwrap();

    editor
        .apply(rect_commit(pos2(500.0, 500.0), pos2(600.0, 600.0), Color32::GREEN))
        .unwrap();

    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.len(), 2);
    assert_eq!(project.history.pointer(), 1);
    assert!(!project.history.is_redo_active());
    // The blue rect lived only in the discarded redo tail; its object was
    // purged so it can never resurface.
    assert_eq!(project.layers[0].objects.len(), 2);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350)[3], 0);
    assert_eq!(surface_pixel(&editor, layer_id, 550, 550), [0, 255, 0, 255]);

    // Redo has nothing to advance into.
    editor.redo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.pointer(), 1);
}

#[test]
fn test_erase_tombstones_and_undo_restores() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    let drawable_id = {
        let project = editor.workspace.project(project_id).unwrap();
        match project.history.current().unwrap().action {
            ActionKind::ToolCommit { drawable_id, .. } => drawable_id,
            _ => unreachable!(),
        }
    };

    editor.apply(ToolOutput::Erase { drawable_id }).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert!(matches!(
        project.history.current().unwrap().action,
        ActionKind::Erase { .. }
    ));
    let layer = project.layer(layer_id).unwrap();
    assert!(layer.object(drawable_id).unwrap().removed);
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150)[3], 0);

    // Undoing the erase flips the tombstone back and repaints the object.
    editor.undo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    let layer = project.layer(layer_id).unwrap();
    assert!(!layer.object(drawable_id).unwrap().removed);
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150), [255, 0, 0, 255]);

    // And redoing re-erases.
    editor.redo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert!(project.layer(layer_id).unwrap().object(drawable_id).unwrap().removed);
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150)[3], 0);
}

#[test]
fn test_erasing_unknown_drawable_is_fatal() {
    let (mut editor, _, _) = editor_with_project();
    let err = editor.apply(ToolOutput::Erase { drawable_id: 999_999 }).unwrap_err();
    assert!(matches!(err, EditorError::UnknownDrawable(999_999)));
}

#[test]
fn test_move_repositions_object() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    let drawable_id = {
        let project = editor.workspace.project(project_id).unwrap();
        match project.history.current().unwrap().action {
            ActionKind::ToolCommit { drawable_id, .. } => drawable_id,
            _ => unreachable!(),
        }
    };

    editor
        .apply(ToolOutput::Move {
            drawable_id,
            kind: DrawableKind::Rect {
                rect: Rect::from_min_max(pos2(300.0, 300.0), pos2(400.0, 400.0)),
            },
        })
        .unwrap();

    assert_eq!(surface_pixel(&editor, layer_id, 150, 150)[3], 0);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350), [255, 0, 0, 255]);
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.len(), 2);
    assert!(matches!(
        project.history.current().unwrap().action,
        ActionKind::Move { .. }
    ));
}

#[test]
fn test_undo_restores_moved_object_geometry() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    let drawable_id = {
        let project = editor.workspace.project(project_id).unwrap();
        match project.history.current().unwrap().action {
            ActionKind::ToolCommit { drawable_id, .. } => drawable_id,
            _ => unreachable!(),
        }
    };
    editor
        .apply(ToolOutput::Move {
            drawable_id,
            kind: DrawableKind::Rect {
                rect: Rect::from_min_max(pos2(300.0, 300.0), pos2(400.0, 400.0)),
            },
        })
        .unwrap();

    // Undo puts the pixels back at the origin and the hit-test geometry
    // must follow them there.
    editor.undo(None).unwrap();
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150), [255, 0, 0, 255]);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350)[3], 0);
    let project = editor.workspace.project(project_id).unwrap();
    let objects = &project.layer(layer_id).unwrap().objects;
    let hit = geometry::hit_test(objects, pos2(150.0, 150.0), 0.0);
    assert_eq!(hit.map(|o| o.id), Some(drawable_id));
    assert!(geometry::hit_test(objects, pos2(350.0, 350.0), 0.0).is_none());

    // Redo moves both the pixels and the geometry forward again.
    editor.redo(None).unwrap();
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350), [255, 0, 0, 255]);
    let project = editor.workspace.project(project_id).unwrap();
    let objects = &project.layer(layer_id).unwrap().objects;
    let hit = geometry::hit_test(objects, pos2(350.0, 350.0), 0.0);
    assert_eq!(hit.map(|o| o.id), Some(drawable_id));
    assert!(geometry::hit_test(objects, pos2(150.0, 150.0), 0.0).is_none());
}

#[test]
fn test_layer_lifecycle() {
    let (mut editor, project_id, base_id) = editor_with_project();

    let layer_id = editor.add_layer("Layer 1").unwrap();
    assert_eq!(editor.workspace.active_layer, Some(layer_id));
    assert!(editor.registry.contains(layer_id));
    let project = editor.workspace.project(project_id).unwrap();
    assert!(matches!(
        project.history.current().unwrap().action,
        ActionKind::LayerAdd { .. }
    ));
    assert_eq!(project.layers.len(), 2);

    // The base layer is never deletable.
    let err = editor.delete_layer(base_id).unwrap_err();
    assert!(matches!(err, EditorError::BaseLayerDelete));

    // Deleting the active layer reassigns the first remaining one.
    editor.delete_layer(layer_id).unwrap();
    assert_eq!(editor.workspace.active_layer, Some(base_id));
    assert!(!editor.registry.contains(layer_id));
    assert_eq!(editor.workspace.project(project_id).unwrap().layers.len(), 1);
}

#[test]
fn test_clear_layer_tombstones_all_visible_and_undo_restores() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    editor
        .apply(rect_commit(pos2(300.0, 300.0), pos2(400.0, 400.0), Color32::BLUE))
        .unwrap();

    editor.clear_layer(layer_id).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    match &project.history.current().unwrap().action {
        ActionKind::LayerClear { drawable_ids, .. } => assert_eq!(drawable_ids.len(), 2),
        other => panic!("expected a layer clear entry, got {other:?}"),
    }
    let layer = project.layer(layer_id).unwrap();
    assert!(layer.objects.iter().all(|o| o.removed));
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150)[3], 0);

    editor.undo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    let layer = project.layer(layer_id).unwrap();
    assert!(layer.objects.iter().all(|o| !o.removed));
    assert_eq!(surface_pixel(&editor, layer_id, 150, 150), [255, 0, 0, 255]);
    assert_eq!(surface_pixel(&editor, layer_id, 350, 350), [0, 0, 255, 255]);
}

#[test]
fn test_unknown_project_history_is_fatal() {
    let (editor, _, _) = editor_with_project();
    let ghost = Uuid::new_v4();
    let err = editor.workspace.history(ghost).unwrap_err();
    assert!(matches!(err, EditorError::UnknownProject(id) if id == ghost));
    let err = editor.workspace.is_undo_active(ghost).unwrap_err();
    assert!(matches!(err, EditorError::UnknownProject(_)));
}

#[test]
fn test_delete_project_cascades() {
    let (mut editor, project_id, layer_id) = editor_with_project();
    editor.delete_project(project_id).unwrap();
    assert!(editor.workspace.projects.is_empty());
    assert!(editor.workspace.active_project.is_none());
    assert!(editor.workspace.active_layer.is_none());
    assert!(!editor.registry.contains(layer_id));
    assert!(matches!(
        editor.workspace.history(project_id).unwrap_err(),
        EditorError::UnknownProject(_)
    ));
}

#[test]
fn test_export_flattens_over_white_and_skips_hidden() {
    let (mut editor, project_id, _) = editor_with_project();
    let layer_id = editor.add_layer("Overlay").unwrap();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();

    let project = editor.workspace.project(project_id).unwrap();
    let flat = export::flatten(project, &editor.registry);
    assert_eq!(flat.get_pixel(150, 150).0, [255, 0, 0, 255]);
    assert_eq!(flat.get_pixel(50, 50).0, [255, 255, 255, 255]);

    editor.set_layer_hidden(layer_id, true).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    let flat = export::flatten(project, &editor.registry);
    assert_eq!(flat.get_pixel(150, 150).0, [255, 255, 255, 255]);

    let (filename, bytes) = editor.export_active().unwrap();
    assert_eq!(filename, "Sketch.png");
    assert!(!bytes.is_empty());
}

#[test]
fn test_preview_capture_after_debounce() {
    let (mut editor, project_id, _) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    assert!(editor.workspace.project(project_id).unwrap().preview.is_none());

    // Too early: the deadline has not elapsed.
    editor.poll_previews(Instant::now());
    assert!(editor.workspace.project(project_id).unwrap().preview.is_none());

    editor.poll_previews(Instant::now() + PREVIEW_DELAY + PREVIEW_DELAY);
    assert!(editor.workspace.project(project_id).unwrap().preview.is_some());
}

#[test]
fn test_two_layer_draw_undo_redo_scenario() {
    let (mut editor, project_id, _base_id) = editor_with_project();
    let layer_id = editor.add_layer("Layer 1").unwrap();
    editor
        .apply(rect_commit(pos2(10.0, 10.0), pos2(60.0, 60.0), Color32::RED))
        .unwrap();

    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.len(), 2);
    assert_eq!(project.history.pointer(), 1);

    editor.undo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.pointer(), 0);
    // The layer-add entry's snapshot set predates the rectangle.
    assert!(editor
        .registry
        .get(layer_id)
        .unwrap()
        .image()
        .pixels()
        .all(|p| p[3] == 0));

    editor.redo(None).unwrap();
    let project = editor.workspace.project(project_id).unwrap();
    assert_eq!(project.history.pointer(), 1);
    assert_eq!(surface_pixel(&editor, layer_id, 30, 30), [255, 0, 0, 255]);
}

#[test]
fn test_gesture_cancels_and_rearms_preview() {
    let (mut editor, project_id, _) = editor_with_project();
    editor
        .apply(rect_commit(pos2(100.0, 100.0), pos2(200.0, 200.0), Color32::RED))
        .unwrap();
    assert!(editor.scheduler.is_armed(project_id));

    editor.gesture_started();
    assert!(!editor.scheduler.is_armed(project_id));
    editor.gesture_finished();
    assert!(editor.scheduler.is_armed(project_id));
}
