#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod autosave;
pub mod drawable;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod layer;
pub mod persistence;
pub mod project;
pub mod raster;
pub mod redraw;
pub mod snapshot;
pub mod surface;
pub mod tools;
pub mod util;

pub use app::PaintApp;
pub use drawable::{Drawable, DrawableKind, Style};
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use history::{ActionKind, History, HistoryEntry};
pub use layer::Layer;
pub use project::{Project, Workspace};
pub use snapshot::Snapshot;
pub use surface::{Surface, SurfaceRegistry};
pub use tools::{ActiveTool, Tool, ToolBinding, ToolKind, ToolOutput};
