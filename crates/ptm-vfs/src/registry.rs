//! Workspace -> storage backend registry

use crate::error::VfsError;
use crate::fs::VirtualFileSystem;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a workspace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WorkspaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Maps workspace ids to their storage backends
///
/// Concurrent reads and registrations are safe; lookups clone the `Arc`.
#[derive(Debug, Default)]
pub struct VfsRegistry {
    backends: DashMap<WorkspaceId, Arc<dyn VirtualFileSystem>>,
}

impl VfsRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the backend of a workspace
    pub fn register(&self, workspace: impl Into<WorkspaceId>, backend: Arc<dyn VirtualFileSystem>) {
        let workspace = workspace.into();
        tracing::debug!(%workspace, "storage backend registered");
        self.backends.insert(workspace, backend);
    }

    /// Backend for a workspace
    ///
    /// # Errors
    /// `VfsError::UnknownWorkspace` if nothing is registered
    pub fn get(&self, workspace: &WorkspaceId) -> Result<Arc<dyn VirtualFileSystem>, VfsError> {
        self.backends
            .get(workspace)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| VfsError::UnknownWorkspace(workspace.to_string()))
    }

    /// Remove a workspace, returning its backend
    pub fn remove(&self, workspace: &WorkspaceId) -> Option<Arc<dyn VirtualFileSystem>> {
        self.backends.remove(workspace).map(|(_, backend)| backend)
    }

    /// Registered workspace ids, sorted
    #[must_use]
    pub fn workspaces(&self) -> Vec<WorkspaceId> {
        let mut ids: Vec<_> = self.backends.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
