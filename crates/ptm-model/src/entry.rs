//! Typed views over stored items
//!
//! Entries are built on demand from storage queries. They hold a path and
//! decoded sidecar data, never a reference into the backend; two lookups of
//! the same path produce equal but distinct values.

use crate::config::{ProjectConfig, Visibility};
use crate::error::SidecarError;
use crate::misc::ProjectMisc;
use crate::sidecar::{self, ProjectSidecar};
use ptm_vfs::{ItemKind, Metadata, TreePath, VfsItem, WorkspaceId};

/// Discriminator of [`TreeEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Plain folder
    Folder,
    /// File
    File,
    /// Folder carrying a project config
    Project,
}

/// A folder in a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    workspace: WorkspaceId,
    path: TreePath,
}

impl FolderEntry {
    /// View of the folder at `path`
    #[inline]
    #[must_use]
    pub fn new(workspace: WorkspaceId, path: TreePath) -> Self {
        Self { workspace, path }
    }

    /// Owning workspace
    #[inline]
    #[must_use]
    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    /// Path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &TreePath {
        &self.path
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Whether this is the workspace root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }
}

/// A file in a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    workspace: WorkspaceId,
    path: TreePath,
    media_type: Option<String>,
}

impl FileEntry {
    /// View of the file at `path`
    #[inline]
    #[must_use]
    pub fn new(workspace: WorkspaceId, path: TreePath, media_type: Option<String>) -> Self {
        Self {
            workspace,
            path,
            media_type,
        }
    }

    /// Owning workspace
    #[inline]
    #[must_use]
    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    /// Path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &TreePath {
        &self.path
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Recorded media type
    #[inline]
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

/// A folder that carries a [`ProjectConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    folder: FolderEntry,
    config: ProjectConfig,
    visibility: Visibility,
    misc: ProjectMisc,
}

impl Project {
    /// Project view from folder and decoded sidecar
    #[must_use]
    pub fn new(folder: FolderEntry, sidecar: ProjectSidecar) -> Self {
        Self {
            folder,
            config: sidecar.config,
            visibility: sidecar.visibility,
            misc: sidecar.misc,
        }
    }

    /// Underlying folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &FolderEntry {
        &self.folder
    }

    /// Owning workspace
    #[inline]
    #[must_use]
    pub fn workspace(&self) -> &WorkspaceId {
        self.folder.workspace()
    }

    /// Path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &TreePath {
        self.folder.path()
    }

    /// Project name (folder name)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.folder.name()
    }

    /// Declared config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Primary type id
    #[inline]
    #[must_use]
    pub fn project_type(&self) -> &str {
        &self.config.project_type
    }

    /// Visibility
    #[inline]
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Misc bag
    #[inline]
    #[must_use]
    pub fn misc(&self) -> &ProjectMisc {
        &self.misc
    }

    /// True if `other` lives strictly inside this project's folder
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &TreePath) -> bool {
        self.path().is_ancestor_of(other)
    }
}

/// Polymorphic view of any item in a workspace tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// Plain folder
    Folder(FolderEntry),
    /// File
    File(FileEntry),
    /// Project folder
    Project(Project),
}

impl TreeEntry {
    /// Build the view of a storage item from its metadata
    ///
    /// # Errors
    /// `SidecarError` if a folder's project metadata is corrupt
    pub fn from_item(
        workspace: &WorkspaceId,
        item: &VfsItem,
        metadata: &Metadata,
    ) -> Result<Self, SidecarError> {
        match item.kind {
            ItemKind::File => Ok(Self::File(FileEntry::new(
                workspace.clone(),
                item.path.clone(),
                sidecar::media_type(metadata).map(str::to_string),
            ))),
            ItemKind::Folder => {
                let folder = FolderEntry::new(workspace.clone(), item.path.clone());
                Ok(match ProjectSidecar::from_metadata(metadata)? {
                    Some(sidecar) => Self::Project(Project::new(folder, sidecar)),
                    None => Self::Folder(folder),
                })
            }
        }
    }

    /// Kind discriminator
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Folder(_) => EntryKind::Folder,
            Self::File(_) => EntryKind::File,
            Self::Project(_) => EntryKind::Project,
        }
    }

    /// Path
    #[must_use]
    pub fn path(&self) -> &TreePath {
        match self {
            Self::Folder(f) => f.path(),
            Self::File(f) => f.path(),
            Self::Project(p) => p.path(),
        }
    }

    /// Owning workspace
    #[must_use]
    pub fn workspace(&self) -> &WorkspaceId {
        match self {
            Self::Folder(f) => f.workspace(),
            Self::File(f) => f.workspace(),
            Self::Project(p) => p.workspace(),
        }
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.path().name()
    }

    /// Parent path, derived from the path
    #[inline]
    #[must_use]
    pub fn parent_path(&self) -> Option<TreePath> {
        self.path().parent()
    }

    /// Folder-like (plain folder or project)
    #[inline]
    #[must_use]
    pub fn is_folder(&self) -> bool {
        !matches!(self, Self::File(_))
    }

    /// Project view, if this is one
    #[inline]
    #[must_use]
    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Self::Project(p) => Some(p),
            _ => None,
        }
    }

    /// Consume into the project view, if this is one
    #[inline]
    #[must_use]
    pub fn into_project(self) -> Option<Project> {
        match self {
            Self::Project(p) => Some(p),
            _ => None,
        }
    }
}
