//! Permission checks
//!
//! Authorization lives outside the manager; an [`AccessPolicy`] is the narrow
//! hook through which its decision is passed in.

use crate::error::ProjectError;
use ptm_vfs::{TreePath, WorkspaceId};
use std::fmt;

/// Access requested by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Decides whether a caller may touch a path
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// Check access
    ///
    /// # Errors
    /// `ProjectError::Forbidden` if access is denied
    fn check(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        permission: Permission,
    ) -> Result<(), ProjectError>;
}

/// Allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _: &WorkspaceId, _: &TreePath, _: Permission) -> Result<(), ProjectError> {
        Ok(())
    }
}

/// Allows reads only
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyPolicy;

impl AccessPolicy for ReadOnlyPolicy {
    fn check(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        permission: Permission,
    ) -> Result<(), ProjectError> {
        match permission {
            Permission::Read => Ok(()),
            Permission::Write => Err(ProjectError::forbidden(format!(
                "workspace {workspace} is read-only ({path})"
            ))),
        }
    }
}

/// Denies every access to the listed subtrees
#[derive(Debug, Clone, Default)]
pub struct DenyPaths {
    denied: Vec<(WorkspaceId, TreePath)>,
}

impl DenyPaths {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny `path` and everything below it
    #[must_use]
    pub fn deny(mut self, workspace: impl Into<WorkspaceId>, path: TreePath) -> Self {
        self.denied.push((workspace.into(), path));
        self
    }
}

impl AccessPolicy for DenyPaths {
    fn check(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        permission: Permission,
    ) -> Result<(), ProjectError> {
        match self
            .denied
            .iter()
            .find(|(ws, denied)| ws == workspace && denied.is_prefix_of(path))
        {
            Some((_, denied)) => Err(ProjectError::forbidden(format!(
                "{permission} access to {path} denied by rule on {denied}"
            ))),
            None => Ok(()),
        }
    }
}
