//! PTM Model
//!
//! Immutable value objects of the project layer and the typed entry views
//! built from storage.
//!
//! - [`ProjectConfig`]: declared type, attributes, mixins
//! - [`AttributeValue`]: values plus their [`ValueOrigin`]
//! - [`ProjectMisc`]: transient bookkeeping stored next to the config
//! - [`TreeEntry`]: Folder / File / Project view of a stored item
//! - [`sidecar`]: how all of the above is laid out in item metadata

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod entry;
pub mod error;
pub mod misc;
pub mod sidecar;

pub use config::{AttributeValue, ProjectConfig, UnknownVisibility, ValueOrigin, Visibility};
pub use entry::{EntryKind, FileEntry, FolderEntry, Project, TreeEntry};
pub use error::SidecarError;
pub use misc::ProjectMisc;
pub use sidecar::ProjectSidecar;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
