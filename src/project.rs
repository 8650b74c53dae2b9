use crate::error::{EditorError, EditorResult};
use crate::history::History;
use crate::layer::Layer;
use crate::snapshot::Snapshot;
use crate::util::time;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to the base layer every project starts with.
pub const BASE_LAYER_NAME: &str = "Background";

/// A fixed-size canvas with its layers and history. A project exclusively
/// owns both; deleting it drops them with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Thumbnail captured by the preview scheduler
    pub preview: Option<Snapshot>,
    /// Seconds since the UNIX epoch at creation
    pub created_at: u64,
    pub layers: Vec<Layer>,
    pub history: History,
}

impl Project {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            width,
            height,
            preview: None,
            created_at: time::timestamp_secs(),
            layers: vec![Layer::new_base(BASE_LAYER_NAME)],
            history: History::new(),
        }
    }

    pub fn layer(&self, layer_id: Uuid) -> EditorResult<&Layer> {
        self.layers
            .iter()
            .find(|l| l.id == layer_id)
            .ok_or(EditorError::UnknownLayer(layer_id))
    }

    pub fn layer_mut(&mut self, layer_id: Uuid) -> EditorResult<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or(EditorError::UnknownLayer(layer_id))
    }

    pub fn base_layer(&self) -> &Layer {
        // Constructed with exactly one base layer, which is never deletable.
        self.layers
            .iter()
            .find(|l| l.is_base)
            .expect("project has a base layer")
    }

    /// The next z index for a freshly added layer: one above the current top.
    pub fn next_z_index(&self) -> i32 {
        self.layers.iter().map(|l| l.z_index).max().unwrap_or(0) + 1
    }

    /// Drop objects committed past the current history pointer on every
    /// layer. Runs when an append is about to truncate the redo tail.
    pub fn purge_future_objects(&mut self) {
        let pointer = self.history.pointer();
        for layer in &mut self.layers {
            layer.purge_future_objects(pointer);
        }
    }
}

fn valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
}

/// The project directory: an ordered collection of projects plus the
/// active-project and active-layer pointers. The active layer, when set,
/// always references a layer of the active project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub projects: Vec<Project>,
    pub active_project: Option<Uuid>,
    pub active_layer: Option<Uuid>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a project after validating its name (unique within the
    /// workspace, restricted charset) and dimensions (positive). The new
    /// project becomes active with its base layer selected.
    pub fn create_project(&mut self, name: &str, width: u32, height: u32) -> EditorResult<Uuid> {
        if !valid_name(name) {
            return Err(EditorError::InvalidProjectName(name.to_string()));
        }
        if self.projects.iter().any(|p| p.name == name) {
            return Err(EditorError::DuplicateProjectName(name.to_string()));
        }
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimensions { width, height });
        }
        let project = Project::new(name, width, height);
        let id = project.id;
        let base = project.base_layer().id;
        self.projects.push(project);
        self.active_project = Some(id);
        self.active_layer = Some(base);
        Ok(id)
    }

    /// Delete a project, cascading its layers and history. Clears the
    /// active pointers if they referenced it.
    pub fn delete_project(&mut self, project_id: Uuid) -> EditorResult<Project> {
        let idx = self
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or(EditorError::UnknownProject(project_id))?;
        let removed = self.projects.remove(idx);
        if self.active_project == Some(project_id) {
            self.active_project = self.projects.first().map(|p| p.id);
            self.active_layer = self.projects.first().map(|p| p.base_layer().id);
        }
        Ok(removed)
    }

    pub fn project(&self, project_id: Uuid) -> EditorResult<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .ok_or(EditorError::UnknownProject(project_id))
    }

    pub fn project_mut(&mut self, project_id: Uuid) -> EditorResult<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or(EditorError::UnknownProject(project_id))
    }

    pub fn active_project(&self) -> EditorResult<&Project> {
        let id = self.active_project.ok_or(EditorError::NoActiveProject)?;
        self.project(id)
    }

    pub fn active_project_mut(&mut self) -> EditorResult<&mut Project> {
        let id = self.active_project.ok_or(EditorError::NoActiveProject)?;
        self.project_mut(id)
    }

    pub fn set_active_project(&mut self, project_id: Uuid) -> EditorResult<()> {
        let base = self.project(project_id)?.base_layer().id;
        self.active_project = Some(project_id);
        self.active_layer = Some(base);
        Ok(())
    }

    pub fn active_layer(&self) -> EditorResult<&Layer> {
        let layer_id = self.active_layer.ok_or(EditorError::NoActiveLayer)?;
        self.active_project()?.layer(layer_id)
    }

    /// Point tool input at another layer of the active project.
    pub fn set_active_layer(&mut self, layer_id: Uuid) -> EditorResult<()> {
        self.active_project()?.layer(layer_id)?;
        self.active_layer = Some(layer_id);
        Ok(())
    }

    /// History selectors, fail-fast on unknown project ids: a missing stack
    /// means the caller holds a stale id.
    pub fn history(&self, project_id: Uuid) -> EditorResult<&History> {
        Ok(&self.project(project_id)?.history)
    }

    pub fn history_mut(&mut self, project_id: Uuid) -> EditorResult<&mut History> {
        Ok(&mut self.project_mut(project_id)?.history)
    }

    pub fn is_undo_active(&self, project_id: Uuid) -> EditorResult<bool> {
        Ok(self.history(project_id)?.is_undo_active())
    }

    pub fn is_redo_active(&self, project_id: Uuid) -> EditorResult<bool> {
        Ok(self.history(project_id)?.is_redo_active())
    }
}
