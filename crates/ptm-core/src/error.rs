//! Error types for the project manager
//!
//! [`ProjectError`] is the caller-visible taxonomy. Lower layers convert into
//! it at the crate seams so that a transport can map [`ErrorKind`] to a
//! status without inspecting messages.

use ptm_estimate::EstimateError;
use ptm_model::SidecarError;
use ptm_registry::{HandlerEvent, RegistryError};
use ptm_vfs::{PathError, VfsError};

/// Project manager error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    /// Path, project, workspace or type absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Name collision or occupied destination
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller lacks permission
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Invalid type/mixin combination or module outside its project
    #[error("project type constraint: {0}")]
    ProjectTypeConstraint(String),

    /// Attribute or sidecar value could not be computed or decoded
    #[error("value storage error: {0}")]
    ValueStorage(String),

    /// A pre-handler rejected the operation
    #[error("handler '{handler}' rejected {event} for '{project_type}': {message}")]
    Handler {
        handler: String,
        event: HandlerEvent,
        project_type: String,
        message: String,
    },

    /// Storage collaborator failed
    #[error("storage error: {0}")]
    Storage(#[source] VfsError),

    /// Malformed path or name
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
}

/// Flat discriminator of [`ProjectError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    ProjectTypeConstraint,
    ValueStorage,
    Handler,
    Storage,
    InvalidPath,
}

impl ProjectError {
    /// Discriminator for transport mapping
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ProjectTypeConstraint(_) => ErrorKind::ProjectTypeConstraint,
            Self::ValueStorage(_) => ErrorKind::ValueStorage,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::Storage(_) => ErrorKind::Storage,
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
        }
    }

    /// Check if error is retryable
    ///
    /// Only collaborator failures are; everything else fails the same way again.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    #[inline]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[inline]
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    #[inline]
    pub fn forbidden(what: impl Into<String>) -> Self {
        Self::Forbidden(what.into())
    }

    #[inline]
    pub fn constraint(what: impl Into<String>) -> Self {
        Self::ProjectTypeConstraint(what.into())
    }
}

impl From<VfsError> for ProjectError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::NotFound(path) => Self::NotFound(path.to_string()),
            VfsError::UnknownWorkspace(ws) => Self::NotFound(format!("workspace {ws}")),
            VfsError::Conflict(path) => Self::Conflict(format!("{path} already exists")),
            VfsError::NotAFolder(path) => Self::Conflict(format!("{path} is not a folder")),
            VfsError::NotAFile(path) => Self::Conflict(format!("{path} is not a file")),
            VfsError::InvalidMove { src, dst } => {
                Self::Conflict(format!("cannot move {src} into {dst}"))
            }
            VfsError::Forbidden { path, reason } => Self::Forbidden(format!("{path}: {reason}")),
            VfsError::InvalidPath(e) => Self::InvalidPath(e),
            io @ VfsError::Io { .. } => Self::Storage(io),
        }
    }
}

impl From<RegistryError> for ProjectError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(format!("project type {id}")),
            RegistryError::DuplicateType(id) => {
                Self::Conflict(format!("project type {id} already registered"))
            }
            other => Self::ProjectTypeConstraint(other.to_string()),
        }
    }
}

impl From<EstimateError> for ProjectError {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::Storage { source, .. } => Self::from(source),
            EstimateError::ValueStorage { .. } => Self::ValueStorage(err.to_string()),
            EstimateError::UnknownType(id) => {
                Self::ProjectTypeConstraint(format!("unknown project type '{id}'"))
            }
        }
    }
}

impl From<SidecarError> for ProjectError {
    fn from(err: SidecarError) -> Self {
        Self::ValueStorage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptm_vfs::TreePath;

    fn p(s: &str) -> TreePath {
        TreePath::parse(s).unwrap()
    }

    #[test]
    fn storage_failures_keep_their_kind() {
        let err = ProjectError::from(VfsError::io(&p("/a"), "disk full"));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_retryable());

        let err = ProjectError::from(VfsError::NotFound(p("/a")));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());

        let err = ProjectError::from(VfsError::Conflict(p("/a")));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = ProjectError::from(VfsError::forbidden(&p("/a"), "read-only"));
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn registry_errors_map_onto_taxonomy() {
        assert_eq!(
            ProjectError::from(RegistryError::constraint("bad mixin")).kind(),
            ErrorKind::ProjectTypeConstraint
        );
        assert_eq!(
            ProjectError::from(RegistryError::NotFound("npm".into())).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn estimate_errors_map_onto_taxonomy() {
        let listing = EstimateError::Storage {
            path: p("/x"),
            source: VfsError::NotFound(p("/x")),
        };
        assert_eq!(ProjectError::from(listing).kind(), ErrorKind::NotFound);

        let value = EstimateError::ValueStorage {
            attribute: "languageLevel".into(),
            path: p("/x/pom.xml"),
            reason: "invalid utf-8".into(),
        };
        assert_eq!(ProjectError::from(value).kind(), ErrorKind::ValueStorage);
    }

    #[test]
    fn handler_error_message() {
        let err = ProjectError::Handler {
            handler: "template".into(),
            event: HandlerEvent::BeforeCreate,
            project_type: "maven".into(),
            message: "no such template".into(),
        };
        assert_eq!(
            err.to_string(),
            "handler 'template' rejected before-create for 'maven': no such template"
        );
    }
}
