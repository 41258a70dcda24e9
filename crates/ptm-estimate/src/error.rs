//! Estimation errors

use ptm_vfs::{TreePath, VfsError};

/// Estimation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    /// Folder could not be listed or a detector file could not be read
    #[error("storage access failed at {path}: {source}")]
    Storage {
        path: TreePath,
        #[source]
        source: VfsError,
    },

    /// Detector input could not be turned into a value
    #[error("cannot compute attribute '{attribute}' from {path}: {reason}")]
    ValueStorage {
        attribute: String,
        path: TreePath,
        reason: String,
    },

    /// Candidate type is not registered
    #[error("unknown project type: {0}")]
    UnknownType(String),
}

impl EstimateError {
    pub(crate) fn storage(path: &TreePath, source: VfsError) -> Self {
        Self::Storage {
            path: path.clone(),
            source,
        }
    }
}
