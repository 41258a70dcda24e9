//! The narrow storage contract the project layer depends on

use crate::error::VfsError;
use crate::path::TreePath;
use std::collections::BTreeMap;
use std::fmt;

/// Sidecar key/value metadata attached to an item
pub type Metadata = BTreeMap<String, String>;

/// Kind of a stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Directory-like container
    Folder,
    /// Byte content
    File,
}

/// Listing entry returned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsItem {
    /// Full path of the item
    pub path: TreePath,
    /// Folder or file
    pub kind: ItemKind,
}

impl VfsItem {
    /// Last path segment
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Check if item is a folder
    #[inline]
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}

/// Byte-level storage for one workspace
///
/// Every call is expected to be atomic on its own: readers observe either
/// the state before or after a single mutating call, never a mix.
pub trait VirtualFileSystem: Send + Sync + fmt::Debug {
    /// Stat a single item
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent
    fn get_item(&self, path: &TreePath) -> Result<VfsItem, VfsError>;

    /// Direct children of a folder, sorted by name
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent, `VfsError::NotAFolder` for files
    fn list(&self, path: &TreePath) -> Result<Vec<VfsItem>, VfsError>;

    /// Create a folder whose parent exists
    ///
    /// # Errors
    /// `VfsError::Conflict` if occupied, `VfsError::NotFound` if the parent is missing
    fn create_folder(&self, path: &TreePath) -> Result<(), VfsError>;

    /// Create a file whose parent exists
    ///
    /// # Errors
    /// `VfsError::Conflict` if occupied, `VfsError::NotFound` if the parent is missing
    fn create_file(&self, path: &TreePath, content: &[u8]) -> Result<(), VfsError>;

    /// Read file content
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent, `VfsError::NotAFile` for folders
    fn read_file(&self, path: &TreePath) -> Result<Vec<u8>, VfsError>;

    /// Move an item (and its subtree and metadata) to `dst`
    ///
    /// # Errors
    /// `VfsError::Conflict` if `dst` is occupied
    fn move_item(&self, src: &TreePath, dst: &TreePath) -> Result<(), VfsError>;

    /// Delete an item and everything below it
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent
    fn delete_subtree(&self, path: &TreePath) -> Result<(), VfsError>;

    /// Read the sidecar metadata of an item
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent
    fn get_metadata(&self, path: &TreePath) -> Result<Metadata, VfsError>;

    /// Replace the sidecar metadata of an item
    ///
    /// # Errors
    /// `VfsError::NotFound` if absent
    fn set_metadata(&self, path: &TreePath, metadata: Metadata) -> Result<(), VfsError>;

    /// Check if an item exists
    fn exists(&self, path: &TreePath) -> bool {
        self.get_item(path).is_ok()
    }

    /// Create a folder and any missing ancestors
    ///
    /// Existing folders along the way are accepted.
    ///
    /// # Errors
    /// `VfsError::NotAFolder` if a file sits on the way
    fn create_folders(&self, path: &TreePath) -> Result<(), VfsError> {
        for step in path.ancestors().into_iter().chain(std::iter::once(path.clone())) {
            match self.get_item(&step) {
                Ok(item) if item.is_folder() => {}
                Ok(_) => return Err(VfsError::NotAFolder(step)),
                Err(VfsError::NotFound(_)) => match self.create_folder(&step) {
                    Ok(()) | Err(VfsError::Conflict(_)) => {}
                    Err(e) => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Create a folder with metadata attached
    ///
    /// The default runs two calls; backends that can do it in one step should override.
    ///
    /// # Errors
    /// Same as [`create_folder`](Self::create_folder) and [`set_metadata`](Self::set_metadata)
    fn create_folder_with_metadata(
        &self,
        path: &TreePath,
        metadata: Metadata,
    ) -> Result<(), VfsError> {
        self.create_folder(path)?;
        self.set_metadata(path, metadata)
    }
}
