//! In-memory storage backend
//!
//! Reference implementation of [`VirtualFileSystem`]: a single ordered map
//! guarded by one `RwLock`, so every trait call is atomic.

use crate::error::VfsError;
use crate::fs::{ItemKind, Metadata, VfsItem, VirtualFileSystem};
use crate::path::TreePath;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Clone)]
enum Content {
    Folder,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    content: Content,
    metadata: Metadata,
}

impl Node {
    fn folder() -> Self {
        Self {
            content: Content::Folder,
            metadata: Metadata::new(),
        }
    }

    fn kind(&self) -> ItemKind {
        match self.content {
            Content::Folder => ItemKind::Folder,
            Content::File(_) => ItemKind::File,
        }
    }
}

/// Memory-backed workspace storage
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: RwLock<BTreeMap<TreePath, Node>>,
}

impl MemoryFileSystem {
    /// Create storage holding only the root folder
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(TreePath::root(), Node::folder());
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Seed a file, creating missing parent folders
    ///
    /// # Errors
    /// Returns error if the path is malformed or collides with a file
    pub fn with_file(self, path: &str, content: impl AsRef<[u8]>) -> Result<Self, VfsError> {
        let path = TreePath::parse(path)?;
        if let Some(parent) = path.parent() {
            self.create_folders(&parent)?;
        }
        self.create_file(&path, content.as_ref())?;
        Ok(self)
    }

    /// Seed a folder (and ancestors)
    ///
    /// # Errors
    /// Returns error if the path is malformed or collides with a file
    pub fn with_folder(self, path: &str) -> Result<Self, VfsError> {
        let path = TreePath::parse(path)?;
        self.create_folders(&path)?;
        Ok(self)
    }

    /// All stored paths in order (root included)
    #[must_use]
    pub fn paths(&self) -> Vec<TreePath> {
        self.nodes.read().keys().cloned().collect()
    }

    /// Number of stored items, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Always false: the root folder is never removed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn subtree_keys(nodes: &BTreeMap<TreePath, Node>, path: &TreePath) -> Vec<TreePath> {
        nodes
            .range::<TreePath, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(|(key, _)| path.is_prefix_of(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn check_parent(nodes: &BTreeMap<TreePath, Node>, path: &TreePath) -> Result<(), VfsError> {
        let parent = path
            .parent()
            .ok_or_else(|| VfsError::Conflict(path.clone()))?;
        match nodes.get(&parent) {
            None => Err(VfsError::NotFound(parent)),
            Some(node) if node.kind() != ItemKind::Folder => Err(VfsError::NotAFolder(parent)),
            Some(_) => Ok(()),
        }
    }

    fn insert_new(&self, path: &TreePath, node: Node) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write();
        if nodes.contains_key(path) {
            return Err(VfsError::Conflict(path.clone()));
        }
        Self::check_parent(&nodes, path)?;
        nodes.insert(path.clone(), node);
        Ok(())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileSystem for MemoryFileSystem {
    fn get_item(&self, path: &TreePath) -> Result<VfsItem, VfsError> {
        let nodes = self.nodes.read();
        nodes
            .get(path)
            .map(|node| VfsItem {
                path: path.clone(),
                kind: node.kind(),
            })
            .ok_or_else(|| VfsError::NotFound(path.clone()))
    }

    fn list(&self, path: &TreePath) -> Result<Vec<VfsItem>, VfsError> {
        let nodes = self.nodes.read();
        match nodes.get(path) {
            None => return Err(VfsError::NotFound(path.clone())),
            Some(node) if node.kind() != ItemKind::Folder => {
                return Err(VfsError::NotAFolder(path.clone()))
            }
            Some(_) => {}
        }
        let depth = path.depth() + 1;
        Ok(nodes
            .range::<TreePath, _>((Bound::Excluded(path), Bound::Unbounded))
            .take_while(|(key, _)| path.is_prefix_of(key))
            .filter(|(key, _)| key.depth() == depth)
            .map(|(key, node)| VfsItem {
                path: key.clone(),
                kind: node.kind(),
            })
            .collect())
    }

    fn create_folder(&self, path: &TreePath) -> Result<(), VfsError> {
        self.insert_new(path, Node::folder())?;
        tracing::trace!(%path, "folder created");
        Ok(())
    }

    fn create_file(&self, path: &TreePath, content: &[u8]) -> Result<(), VfsError> {
        self.insert_new(
            path,
            Node {
                content: Content::File(content.to_vec()),
                metadata: Metadata::new(),
            },
        )?;
        tracing::trace!(%path, bytes = content.len(), "file created");
        Ok(())
    }

    fn read_file(&self, path: &TreePath) -> Result<Vec<u8>, VfsError> {
        let nodes = self.nodes.read();
        match nodes.get(path) {
            None => Err(VfsError::NotFound(path.clone())),
            Some(Node {
                content: Content::File(bytes),
                ..
            }) => Ok(bytes.clone()),
            Some(_) => Err(VfsError::NotAFile(path.clone())),
        }
    }

    fn move_item(&self, src: &TreePath, dst: &TreePath) -> Result<(), VfsError> {
        if src.is_root() {
            return Err(VfsError::forbidden(src, "the root cannot be moved"));
        }
        if src.is_prefix_of(dst) {
            return Err(VfsError::InvalidMove {
                src: src.clone(),
                dst: dst.clone(),
            });
        }
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(src) {
            return Err(VfsError::NotFound(src.clone()));
        }
        if nodes.contains_key(dst) {
            return Err(VfsError::Conflict(dst.clone()));
        }
        Self::check_parent(&nodes, dst)?;

        for key in Self::subtree_keys(&nodes, src) {
            if let (Some(node), Some(target)) = (nodes.remove(&key), key.rebase(src, dst)) {
                nodes.insert(target, node);
            }
        }
        tracing::trace!(%src, %dst, "item moved");
        Ok(())
    }

    fn delete_subtree(&self, path: &TreePath) -> Result<(), VfsError> {
        if path.is_root() {
            return Err(VfsError::forbidden(path, "the root cannot be deleted"));
        }
        let mut nodes = self.nodes.write();
        if !nodes.contains_key(path) {
            return Err(VfsError::NotFound(path.clone()));
        }
        let keys = Self::subtree_keys(&nodes, path);
        for key in &keys {
            nodes.remove(key);
        }
        tracing::trace!(%path, removed = keys.len(), "subtree deleted");
        Ok(())
    }

    fn get_metadata(&self, path: &TreePath) -> Result<Metadata, VfsError> {
        self.nodes
            .read()
            .get(path)
            .map(|node| node.metadata.clone())
            .ok_or_else(|| VfsError::NotFound(path.clone()))
    }

    fn set_metadata(&self, path: &TreePath, metadata: Metadata) -> Result<(), VfsError> {
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(path)
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        node.metadata = metadata;
        Ok(())
    }

    fn create_folder_with_metadata(
        &self,
        path: &TreePath,
        metadata: Metadata,
    ) -> Result<(), VfsError> {
        self.insert_new(
            path,
            Node {
                content: Content::Folder,
                metadata,
            },
        )?;
        tracing::trace!(%path, "folder created with metadata");
        Ok(())
    }
}
