//! PTM Virtual File System
//!
//! The storage collaborator below the project layer.
//!
//! # Overview
//!
//! - **TreePath**: normalized workspace-relative paths with prefix/overlap checks
//! - **VirtualFileSystem**: the narrow byte + metadata contract
//! - **MemoryFileSystem**: reference backend, atomic per call
//! - **VfsRegistry**: workspace id -> backend
//!
//! # Example
//!
//! ```rust
//! use ptm_vfs::{MemoryFileSystem, TreePath, VirtualFileSystem};
//!
//! let fs = MemoryFileSystem::new().with_file("/demo/pom.xml", "<project/>").unwrap();
//! let demo = TreePath::parse("/demo").unwrap();
//! assert_eq!(fs.list(&demo).unwrap().len(), 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod registry;

// Re-exports
pub use error::VfsError;
pub use fs::{ItemKind, Metadata, VfsItem, VirtualFileSystem};
pub use memory::MemoryFileSystem;
pub use path::{PathError, TreePath};
pub use registry::{VfsRegistry, WorkspaceId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
