//! Workspace-relative tree paths
//!
//! Provides [`TreePath`] for addressing folders, files and projects inside a workspace.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Normalized, slash-separated path inside a workspace
///
/// Always absolute. The root is `/`; there is never a trailing slash and
/// never a `..` segment.
///
/// # Examples
/// - `"/a//b/"` → `/a/b`
/// - `"a/./b"` → `/a/b`
/// - `""` → `/`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreePath(Vec<String>);

impl TreePath {
    /// Workspace root (`/`)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse and normalize a path
    ///
    /// # Errors
    /// Returns error if the path contains a `..` segment or a NUL byte
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for seg in raw.split('/') {
            match seg {
                "" | "." => {}
                ".." => return Err(PathError::ParentSegment(raw.to_string())),
                other => {
                    validate_segment(other)?;
                    segments.push(other.to_string());
                }
            }
        }
        Ok(Self(segments))
    }

    /// Path segments from root to leaf
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments (root is 0)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the workspace root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, empty string for the root
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a single segment
    ///
    /// # Errors
    /// Returns error if `name` is empty, `.`/`..`, or contains a separator
    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        if name.is_empty() || name == "." {
            return Err(PathError::EmptySegment);
        }
        if name == ".." {
            return Err(PathError::ParentSegment(name.to_string()));
        }
        if name.contains('/') {
            return Err(PathError::NotASegment(name.to_string()));
        }
        validate_segment(name)?;
        let mut next = self.clone();
        next.0.push(name.to_string());
        Ok(next)
    }

    /// Append a relative path (leading slashes are ignored)
    ///
    /// # Errors
    /// Returns error if `relative` does not normalize
    pub fn join(&self, relative: &str) -> Result<Self, PathError> {
        let tail = Self::parse(relative)?;
        let mut next = self.clone();
        next.0.extend(tail.0);
        Ok(next)
    }

    /// Check if this path is a prefix of (or equal to) another
    ///
    /// # Examples
    /// - `/a/b` is prefix of `/a/b/c`
    /// - `/a/b` is NOT prefix of `/a/bc`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Strict ancestor check
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Check if paths overlap (one is prefix of other)
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Relative remainder below `ancestor`
    ///
    /// # Errors
    /// Returns error if `self` is not `ancestor` or below it
    pub fn relative_to(&self, ancestor: &Self) -> Result<Vec<String>, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(self.0[ancestor.0.len()..].to_vec())
    }

    /// Replace the `from` prefix with `to`
    ///
    /// Used to rekey a moved subtree. Returns `None` if `from` is not a prefix.
    #[must_use]
    pub fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        if !from.is_prefix_of(self) {
            return None;
        }
        let mut segments = to.0.clone();
        segments.extend_from_slice(&self.0[from.0.len()..]);
        Some(Self(segments))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// All strict ancestors from the root down, excluding `self`
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        (0..self.0.len()).map(|n| Self(self.0[..n].to_vec())).collect()
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.contains('\0') {
        Err(PathError::InvalidSegment(seg.replace('\0', "\\0")))
    } else {
        Ok(())
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TreePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TreePath> for String {
    fn from(path: TreePath) -> Self {
        path.to_string()
    }
}

impl Default for TreePath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to tree paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty name where a segment was required
    #[error("path segment cannot be empty")]
    EmptySegment,

    /// `..` is never allowed
    #[error("path '{0}' contains a parent segment")]
    ParentSegment(String),

    /// Name contains a separator
    #[error("'{0}' is not a single path segment")]
    NotASegment(String),

    /// Invalid characters
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> TreePath {
        TreePath::parse(s).unwrap()
    }

    #[test]
    fn parse_normalizes() {
        assert_eq!(p("/a//b/").to_string(), "/a/b");
        assert_eq!(p("a/./b").to_string(), "/a/b");
        assert_eq!(p("").to_string(), "/");
        assert_eq!(p("/").to_string(), "/");
    }

    #[test]
    fn parse_rejects_parent_segment() {
        assert!(matches!(
            TreePath::parse("/a/../b"),
            Err(PathError::ParentSegment(_))
        ));
    }

    #[test]
    fn root_has_no_parent_or_name() {
        let root = TreePath::root();
        assert!(root.is_root());
        assert!(root.parent().is_none());
        assert_eq!(root.name(), "");
    }

    #[test]
    fn name_and_parent() {
        let path = p("/ws/demo/pom.xml");
        assert_eq!(path.name(), "pom.xml");
        assert_eq!(path.parent().unwrap(), p("/ws/demo"));
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn child_requires_single_segment() {
        let root = TreePath::root();
        assert_eq!(root.child("x").unwrap(), p("/x"));
        assert!(matches!(root.child("a/b"), Err(PathError::NotASegment(_))));
        assert!(matches!(root.child(""), Err(PathError::EmptySegment)));
        assert!(matches!(root.child(".."), Err(PathError::ParentSegment(_))));
    }

    #[test]
    fn join_relative() {
        assert_eq!(p("/proj").join("mod/sub").unwrap(), p("/proj/mod/sub"));
        assert_eq!(p("/proj").join("/mod").unwrap(), p("/proj/mod"));
    }

    #[test]
    fn prefix_is_segment_aware() {
        assert!(p("/a/b").is_prefix_of(&p("/a/b/c")));
        assert!(!p("/a/b").is_prefix_of(&p("/a/bc")));
        assert!(TreePath::root().is_prefix_of(&p("/a")));
    }

    #[test]
    fn ancestor_is_strict() {
        assert!(p("/a").is_ancestor_of(&p("/a/b")));
        assert!(!p("/a").is_ancestor_of(&p("/a")));
    }

    #[test]
    fn overlaps_both_directions() {
        assert!(p("/a/b").overlaps(&p("/a/b/c")));
        assert!(p("/a/b/c").overlaps(&p("/a/b")));
        assert!(!p("/a/b").overlaps(&p("/a/x")));
    }

    #[test]
    fn relative_to_descendant() {
        let rel = p("/a/b/c").relative_to(&p("/a")).unwrap();
        assert_eq!(rel, vec!["b".to_string(), "c".to_string()]);
        assert!(p("/a").relative_to(&p("/x")).is_err());
    }

    #[test]
    fn rebase_moves_prefix() {
        let moved = p("/old/src/Main.java").rebase(&p("/old"), &p("/new")).unwrap();
        assert_eq!(moved, p("/new/src/Main.java"));
        assert!(p("/other").rebase(&p("/old"), &p("/new")).is_none());
    }

    #[test]
    fn ancestors_from_root() {
        let list = p("/a/b/c").ancestors();
        assert_eq!(list, vec![TreePath::root(), p("/a"), p("/a/b")]);
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&p("/a/b")).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: TreePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p("/a/b"));
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(segs in proptest::collection::vec("[a-zA-Z0-9_.-]{1,8}", 0..6)) {
            let segs: Vec<String> = segs.into_iter().filter(|s| s != "." && s != "..").collect();
            let raw = format!("/{}", segs.join("/"));
            let parsed = TreePath::parse(&raw).unwrap();
            prop_assert_eq!(TreePath::parse(&parsed.to_string()).unwrap(), parsed.clone());
            prop_assert!(!parsed.to_string().ends_with('/') || parsed.is_root());
        }

        #[test]
        fn parent_is_ancestor(segs in proptest::collection::vec("[a-z]{1,5}", 1..6)) {
            let path = TreePath::parse(&segs.join("/")).unwrap();
            let parent = path.parent().unwrap();
            prop_assert!(parent.is_ancestor_of(&path));
            prop_assert!(parent.overlaps(&path));
        }
    }
}
