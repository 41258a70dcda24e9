//! Error types for the storage abstraction

use crate::path::{PathError, TreePath};

/// Errors raised by a [`VirtualFileSystem`](crate::VirtualFileSystem) backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VfsError {
    /// No item at path
    #[error("item not found: {0}")]
    NotFound(TreePath),

    /// Destination already occupied
    #[error("item already exists: {0}")]
    Conflict(TreePath),

    /// Folder operation on a file
    #[error("not a folder: {0}")]
    NotAFolder(TreePath),

    /// File operation on a folder
    #[error("not a file: {0}")]
    NotAFile(TreePath),

    /// Backend refused the operation
    #[error("access to {path} denied: {reason}")]
    Forbidden { path: TreePath, reason: String },

    /// Moving a folder into its own subtree
    #[error("cannot move {src} into {dst}")]
    InvalidMove { src: TreePath, dst: TreePath },

    /// Backend I/O failure
    #[error("storage failure at {path}: {message}")]
    Io { path: TreePath, message: String },

    /// No backend registered for workspace
    #[error("unknown workspace: {0}")]
    UnknownWorkspace(String),

    /// Malformed path
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
}

impl VfsError {
    /// Create I/O error for path
    pub fn io(path: &TreePath, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Create forbidden error for path
    pub fn forbidden(path: &TreePath, reason: impl Into<String>) -> Self {
        Self::Forbidden {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Check if error denotes an absent item
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
