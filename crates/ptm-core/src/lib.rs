//! PTM Core - Project Tree Manager
//!
//! Owns the logical project layer of a workspace:
//! - resolves Folder / File / Project views from storage
//! - validates project types and mixins against the type registry
//! - serializes structural operations over overlapping subtrees
//! - drives lifecycle handlers around every mutation
//!
//! # Example
//!
//! ```
//! use ptm_core::{CreateOptions, ProjectManager};
//! use ptm_model::{ProjectConfig, Visibility};
//! use ptm_registry::{ProjectHandlerRegistry, ProjectTypeRegistry};
//! use ptm_vfs::{MemoryFileSystem, TreePath, VfsRegistry, WorkspaceId};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), ptm_core::ProjectError> {
//! let vfs = Arc::new(VfsRegistry::new());
//! vfs.register("ws", Arc::new(MemoryFileSystem::new()));
//! let manager = ProjectManager::new(
//!     vfs,
//!     Arc::new(ProjectTypeRegistry::with_defaults()),
//!     Arc::new(ProjectHandlerRegistry::new()),
//! );
//!
//! let ws = WorkspaceId::new("ws");
//! let created = manager.create_project(
//!     &ws,
//!     "demo",
//!     ProjectConfig::new("blank"),
//!     &CreateOptions::new(),
//!     Visibility::Public,
//! )?;
//! assert_eq!(created.value.path().to_string(), "/demo");
//!
//! let found = manager.get_project(&ws, &TreePath::parse("/demo")?)?;
//! assert_eq!(found.map(|p| p.config().clone()), Some(ProjectConfig::new("blank")));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod access;
pub mod config;
pub mod error;
pub mod lock;
pub mod manager;
pub mod operation;

pub use access::{AccessPolicy, AllowAll, DenyPaths, Permission, ReadOnlyPolicy};
pub use config::{ConfigError, ManagerConfig};
pub use error::{ErrorKind, ProjectError};
pub use lock::{PathGuard, PathLockTable};
pub use manager::{CreateOptions, ProjectManager};
pub use operation::{
    allowed_transitions, validate_transition, HandlerWarning, IllegalTransition, OperationState,
    Outcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the project manager
    pub use crate::{CreateOptions, ManagerConfig, Outcome, ProjectError, ProjectManager};
    pub use ptm_model::{Project, ProjectConfig, TreeEntry, Visibility};
    pub use ptm_vfs::{TreePath, WorkspaceId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
