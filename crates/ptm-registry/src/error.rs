//! Error types for the registries

/// Registry and type-validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Type id registered twice
    #[error("project type already registered: {0}")]
    DuplicateType(String),

    /// No type with id
    #[error("project type not found: {0}")]
    NotFound(String),

    /// Parent must be registered before its children
    #[error("project type '{type_id}' declares unknown parent '{parent}'")]
    UnknownParent { type_id: String, parent: String },

    /// Detector pattern does not compile
    #[error("invalid detector for {type_id}.{attribute}: {message}")]
    InvalidDetector {
        type_id: String,
        attribute: String,
        message: String,
    },

    /// Config violates the type/mixin rules
    #[error("project type constraint violated: {0}")]
    ConstraintViolation(String),

    /// Type catalog could not be read or parsed
    #[error("type catalog error: {0}")]
    Catalog(String),
}

impl RegistryError {
    /// Create constraint violation
    #[inline]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation(message.into())
    }
}
