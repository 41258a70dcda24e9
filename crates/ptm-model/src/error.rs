//! Error types for the model layer

/// Stored project metadata that cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SidecarError {
    /// `project.config` is not a valid config document
    #[error("corrupt project config: {0}")]
    CorruptConfig(String),

    /// `project.visibility` holds an unknown value
    #[error("corrupt project visibility: '{0}'")]
    CorruptVisibility(String),
}
