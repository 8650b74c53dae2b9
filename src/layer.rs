use crate::drawable::Drawable;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single layer of a project's canvas.
///
/// The distinguished base layer is created with the project, renders
/// beneath every other layer regardless of z index, and is never deletable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    /// Opacity in percent, 0..=100
    pub opacity: u8,
    /// Higher values draw later (on top); ignored for the base layer
    pub z_index: i32,
    pub hidden: bool,
    pub is_base: bool,
    /// Rasterized state at the current history pointer, if any
    pub snapshot: Option<Snapshot>,
    /// Append-only committed-object log; erased objects are tombstoned,
    /// not removed
    pub objects: Vec<Drawable>,
}

impl Layer {
    pub fn new(name: &str, z_index: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            opacity: 100,
            z_index,
            hidden: false,
            is_base: false,
            snapshot: None,
            objects: Vec::new(),
        }
    }

    pub fn new_base(name: &str) -> Self {
        Self {
            is_base: true,
            ..Self::new(name, 0)
        }
    }

    /// Per-layer alpha for compositing, from the 0..=100 opacity.
    pub fn alpha(&self) -> f32 {
        f32::from(self.opacity.min(100)) / 100.0
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity.min(100);
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn push_object(&mut self, drawable: Drawable) {
        self.objects.push(drawable);
    }

    pub fn object(&self, id: usize) -> Option<&Drawable> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: usize) -> Option<&mut Drawable> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Objects visible at the given history pointer, in commit (z) order.
    pub fn visible_objects(&self, pointer: usize) -> impl Iterator<Item = &Drawable> {
        self.objects.iter().filter(move |o| o.visible_at(pointer))
    }

    /// Drop objects committed past `pointer`. Called when an append
    /// truncates the redo tail, so stale future objects cannot resurface.
    pub fn purge_future_objects(&mut self, pointer: usize) {
        self.objects.retain(|o| o.committed_at <= pointer);
    }
}

/// Render order for a project's layers: the base layer first, then the rest
/// by ascending z index (stable for equal z).
pub fn sorted_for_render(layers: &[Layer]) -> Vec<&Layer> {
    let mut out: Vec<&Layer> = layers.iter().collect();
    out.sort_by_key(|l| (!l.is_base, l.z_index));
    out
}
