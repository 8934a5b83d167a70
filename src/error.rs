use thiserror::Error;

/// Errors surfaced while building or attaching a heatmap layer.
///
/// Per-frame operations never fail; degenerate and transient states are
/// reported through [`crate::diagnostics::DiagnosticSink`] instead.
#[derive(Debug, Error)]
pub enum HeatmapError {
    /// The render context lacks a GPU feature the accumulation pass needs.
    #[error("missing GPU capability: {0}")]
    Capability(String),

    /// Shader compilation or binding validation failed during pipeline creation.
    #[error("pipeline creation failed ({stage}): {message}")]
    Pipeline { stage: &'static str, message: String },

    #[error("invalid heatmap option: {0}")]
    InvalidConfig(String),

    #[error("layer '{0}' is already attached")]
    AlreadyAttached(String),

    #[error("layer '{0}' was detached and cannot be re-attached")]
    AlreadyDetached(String),
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
