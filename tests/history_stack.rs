use paintboard::history::{ActionKind, History};
use paintboard::error::EditorError;
use std::collections::HashMap;
use uuid::Uuid;

fn push(history: &mut History) -> usize {
    let entry = history.append(
        ActionKind::LayerAdd {
            layer_id: Uuid::new_v4(),
        },
        HashMap::new(),
    );
    entry.id
}

#[test]
fn test_append_assigns_sequential_ids_and_moves_pointer() {
    let mut history = History::new();
    for expected in 0..5 {
        let id = push(&mut history);
        assert_eq!(id, expected);
        assert_eq!(history.pointer(), expected);
    }
    assert_eq!(history.len(), 5);
    for (i, entry) in history.entries().iter().enumerate() {
        assert_eq!(entry.id, i);
    }
}

#[test]
fn test_empty_history_is_inert() {
    let mut history = History::new();
    assert!(history.undo(None).unwrap().is_none());
    assert!(history.redo(None).is_none());
    assert!(!history.is_undo_active());
    assert!(!history.is_redo_active());
    assert!(history.current().is_none());
}

#[test]
fn test_undo_redo_round_trip() {
    let mut history = History::new();
    push(&mut history);
    push(&mut history);
    push(&mut history);

    let entry = history.undo(None).unwrap().unwrap();
    assert_eq!(entry.id, 1);
    assert_eq!(history.pointer(), 1);

    let entry = history.redo(None).unwrap();
    assert_eq!(entry.id, 2);
    assert_eq!(history.pointer(), 2);
    // Back at the top there is nothing to redo.
    assert!(history.redo(None).is_none());
}

#[test]
fn test_undo_clamps_at_zero_and_is_idempotent() {
    let mut history = History::new();
    push(&mut history);
    push(&mut history);

    assert_eq!(history.undo(None).unwrap().unwrap().id, 0);
    assert_eq!(history.pointer(), 0);
    // Undoing again re-returns entry 0 without moving.
    assert_eq!(history.undo(None).unwrap().unwrap().id, 0);
    assert_eq!(history.pointer(), 0);
}

#[test]
fn test_negative_undo_hint_is_rejected() {
    let mut history = History::new();
    push(&mut history);
    let err = history.undo(Some(-1)).unwrap_err();
    assert!(matches!(err, EditorError::PointerOutOfRange(-1)));
    // The failed call must not have moved the pointer.
    assert_eq!(history.pointer(), 0);
}

#[test]
fn test_undo_hint_never_moves_the_pointer_forward() {
    let mut history = History::new();
    for _ in 0..4 {
        push(&mut history);
    }
    history.undo(Some(1)).unwrap();
    assert_eq!(history.pointer(), 1);

    // A hint past the pointer clamps to the pointer itself; forward motion
    // is redo's job.
    assert_eq!(history.undo(Some(3)).unwrap().unwrap().id, 1);
    assert_eq!(history.pointer(), 1);
}

#[test]
fn test_negative_redo_hint_is_a_no_op() {
    let mut history = History::new();
    push(&mut history);
    push(&mut history);
    history.undo(None).unwrap();
    assert!(history.redo(Some(-3)).is_none());
    assert_eq!(history.pointer(), 0);
}

#[test]
fn test_redo_hint_must_land_past_the_pointer() {
    let mut history = History::new();
    for _ in 0..4 {
        push(&mut history);
    }
    history.undo(Some(1)).unwrap();
    assert_eq!(history.pointer(), 1);

    // Hints at or before the pointer do nothing.
    assert!(history.redo(Some(1)).is_none());
    assert!(history.redo(Some(0)).is_none());
    // Hints past the end do nothing.
    assert!(history.redo(Some(10)).is_none());
    // A valid forward hint jumps directly.
    assert_eq!(history.redo(Some(3)).unwrap().id, 3);
    assert_eq!(history.pointer(), 3);
}

#[test]
fn test_append_after_undo_truncates_redo_tail() {
    let mut history = History::new();
    push(&mut history);
    push(&mut history);
    push(&mut history);
    history.undo(None).unwrap();
    history.undo(None).unwrap();
    assert_eq!(history.pointer(), 0);
    assert!(history.is_redo_active());

    let id = push(&mut history);
    assert_eq!(id, 1);
    assert_eq!(history.len(), 2);
    assert!(!history.is_redo_active());
    assert!(history.redo(None).is_none());
}

#[test]
fn test_activity_flags_follow_the_pointer() {
    let mut history = History::new();
    push(&mut history);
    assert!(!history.is_undo_active());
    assert!(!history.is_redo_active());

    push(&mut history);
    assert!(history.is_undo_active());
    assert!(!history.is_redo_active());

    history.undo(None).unwrap();
    assert!(!history.is_undo_active());
    assert!(history.is_redo_active());
}

#[test]
fn test_next_index_tracks_pointer_not_len() {
    let mut history = History::new();
    assert_eq!(history.next_index(), 0);
    push(&mut history);
    push(&mut history);
    push(&mut history);
    assert_eq!(history.next_index(), 3);
    history.undo(None).unwrap();
    // The next append will overwrite the redo tail starting here.
    assert_eq!(history.next_index(), 2);
}
