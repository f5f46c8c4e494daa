//! Pipeline error types.

use crate::build::render::RenderError;

/// Errors that can occur during pipeline processing.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("no stage named '{0}' in the pipeline")]
    UnknownStage(String),
}

impl PipelineError {
    /// Create a stage-specific error.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl From<tera::Error> for PipelineError {
    fn from(e: tera::Error) -> Self {
        Self::Render(RenderError::Template(e))
    }
}
