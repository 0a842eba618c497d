use nebula_common::ObjectId;
use nebula_scene::RenderError;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("an object with id {0} is already registered")]
    DuplicateId(ObjectId),
    #[error("engine has been disposed")]
    Disposed,
    #[error(transparent)]
    Render(#[from] RenderError),
}
