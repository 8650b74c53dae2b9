use thiserror::Error;
use uuid::Uuid;

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by the editor core.
///
/// These are the fatal-by-design conditions: they indicate a broken caller
/// invariant and must never be silently ignored. Recoverable conditions
/// (missing surface, failed image decode, empty stroke) are absorbed at the
/// call site and logged instead.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Operated on a project id that does not exist
    #[error("unknown project: {0}")]
    UnknownProject(Uuid),

    /// Operated on a layer id that does not exist in the project
    #[error("unknown layer: {0}")]
    UnknownLayer(Uuid),

    /// The base layer is created with the project and is never deletable
    #[error("the base layer cannot be deleted")]
    BaseLayerDelete,

    /// An explicit pointer hint was outside the valid history range
    #[error("history pointer hint {0} is out of range")]
    PointerOutOfRange(i64),

    /// Project names must be unique within the workspace
    #[error("a project named {0:?} already exists")]
    DuplicateProjectName(String),

    /// Project names are restricted to letters, digits, spaces, '-' and '_'
    #[error("invalid project name {0:?}")]
    InvalidProjectName(String),

    /// Canvas dimensions must be positive integers
    #[error("project dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// An operation required an active project but none is set
    #[error("no active project")]
    NoActiveProject,

    /// An operation required an active layer but none is set
    #[error("no active layer")]
    NoActiveLayer,

    /// Referenced a drawable id that is not in the layer's object log
    #[error("unknown drawable: {0}")]
    UnknownDrawable(usize),

    /// Flattening a project for export failed to encode
    #[error("export failed: {0}")]
    Export(#[from] crate::snapshot::SnapshotError),
}
