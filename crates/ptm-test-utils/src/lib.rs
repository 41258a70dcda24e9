//! Testing utilities for the PTM workspace
//!
//! Shared fixtures: a demo type catalog, seeded workspaces, a storage
//! wrapper that injects failures, and handlers that record their calls.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use parking_lot::Mutex;
use ptm_registry::{
    HandlerContext, HandlerError, HandlerEvent, ProjectHandler, ProjectTypeRegistry, TypeCatalog,
};
use ptm_vfs::{
    MemoryFileSystem, Metadata, TreePath, VfsError, VfsItem, VirtualFileSystem, WorkspaceId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Types used across tests
///
/// - `java`: constant `language`
/// - `maven`: primary-only child of `java`, `languageLevel` required and
///   read from `pom.xml`
/// - `node`: `packageManager` required, implied by `package.json`
/// - `git`: mixin-only, constant `vcs`
/// - `docs`: `generator` required and never detectable
pub const DEMO_CATALOG: &str = r#"
[[project_type]]
id = "java"
display_name = "Java"

[[project_type.attribute]]
name = "language"
constant = ["java"]

[[project_type]]
id = "maven"
display_name = "Maven"
parents = ["java"]
mixable = false
auto_detect = true

[[project_type.attribute]]
name = "languageLevel"
required = true

[project_type.attribute.detector]
file = "pom.xml"
pattern = "<source>([^<]+)</source>"

[[project_type.attribute]]
name = "artifactId"

[project_type.attribute.detector]
file = "pom.xml"
pattern = "<artifactId>([^<]+)</artifactId>"

[[project_type]]
id = "node"
display_name = "Node.js"
auto_detect = true

[[project_type.attribute]]
name = "packageManager"
required = true

[project_type.attribute.detector]
file = "package.json"
values = ["npm"]

[[project_type]]
id = "git"
display_name = "Git"
primary = false

[[project_type.attribute]]
name = "vcs"
constant = ["git"]

[[project_type]]
id = "docs"
display_name = "Documentation"

[[project_type.attribute]]
name = "generator"
required = true
"#;

/// Maven descriptor with `<source>1.8</source>`
pub const DEMO_POM: &str = "<project>\n  <artifactId>demo</artifactId>\n  <build><source>1.8</source></build>\n</project>\n";

/// Registry holding `blank` and the demo catalog
pub fn demo_registry() -> Arc<ProjectTypeRegistry> {
    let registry = ProjectTypeRegistry::with_defaults();
    TypeCatalog::from_toml_str(DEMO_CATALOG)
        .unwrap()
        .register_into(&registry)
        .unwrap();
    Arc::new(registry)
}

/// Default workspace id
pub fn ws() -> WorkspaceId {
    WorkspaceId::new("ws")
}

/// Parse a path
pub fn p(path: &str) -> TreePath {
    TreePath::parse(path).unwrap()
}

/// Workspace with a maven source folder and a node source folder
///
/// ```text
/// /sources/demo/pom.xml
/// /sources/demo/src/main/java/App.java
/// /sources/web/package.json
/// /notes/readme.txt
/// ```
pub fn seeded_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_file("/sources/demo/pom.xml", DEMO_POM)
        .unwrap()
        .with_file("/sources/demo/src/main/java/App.java", "class App {}")
        .unwrap()
        .with_file("/sources/web/package.json", "{}")
        .unwrap()
        .with_file("/notes/readme.txt", "hello")
        .unwrap()
}

/// Route test logs through the test harness; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Storage call that [`FlakyFileSystem`] can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    List,
    CreateFolder,
    CreateFile,
    ReadFile,
    MoveItem,
    DeleteSubtree,
    SetMetadata,
}

/// Storage wrapper injecting I/O failures and counting mutations
#[derive(Debug)]
pub struct FlakyFileSystem {
    inner: Arc<dyn VirtualFileSystem>,
    failing: Mutex<HashSet<FailPoint>>,
    mutations: AtomicUsize,
    reverse_listings: AtomicBool,
}

impl FlakyFileSystem {
    pub fn new(inner: Arc<dyn VirtualFileSystem>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            mutations: AtomicUsize::new(0),
            reverse_listings: AtomicBool::new(false),
        }
    }

    /// Return folder listings in descending name order
    pub fn reverse_listings(&self) {
        self.reverse_listings.store(true, Ordering::SeqCst);
    }

    /// Make `point` fail until [`heal`](Self::heal)
    pub fn fail_on(&self, point: FailPoint) {
        self.failing.lock().insert(point);
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    /// Number of successful mutating calls
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailPoint, path: &TreePath) -> Result<(), VfsError> {
        if self.failing.lock().contains(&point) {
            Err(VfsError::io(path, format!("injected failure at {point:?}")))
        } else {
            Ok(())
        }
    }

    fn mutated<T>(&self, result: Result<T, VfsError>) -> Result<T, VfsError> {
        if result.is_ok() {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

impl VirtualFileSystem for FlakyFileSystem {
    fn get_item(&self, path: &TreePath) -> Result<VfsItem, VfsError> {
        self.inner.get_item(path)
    }

    fn list(&self, path: &TreePath) -> Result<Vec<VfsItem>, VfsError> {
        self.check(FailPoint::List, path)?;
        let mut items = self.inner.list(path)?;
        if self.reverse_listings.load(Ordering::SeqCst) {
            items.reverse();
        }
        Ok(items)
    }

    fn create_folder(&self, path: &TreePath) -> Result<(), VfsError> {
        self.check(FailPoint::CreateFolder, path)?;
        self.mutated(self.inner.create_folder(path))
    }

    fn create_file(&self, path: &TreePath, content: &[u8]) -> Result<(), VfsError> {
        self.check(FailPoint::CreateFile, path)?;
        self.mutated(self.inner.create_file(path, content))
    }

    fn read_file(&self, path: &TreePath) -> Result<Vec<u8>, VfsError> {
        self.check(FailPoint::ReadFile, path)?;
        self.inner.read_file(path)
    }

    fn move_item(&self, src: &TreePath, dst: &TreePath) -> Result<(), VfsError> {
        self.check(FailPoint::MoveItem, src)?;
        self.mutated(self.inner.move_item(src, dst))
    }

    fn delete_subtree(&self, path: &TreePath) -> Result<(), VfsError> {
        self.check(FailPoint::DeleteSubtree, path)?;
        self.mutated(self.inner.delete_subtree(path))
    }

    fn get_metadata(&self, path: &TreePath) -> Result<Metadata, VfsError> {
        self.inner.get_metadata(path)
    }

    fn set_metadata(&self, path: &TreePath, metadata: Metadata) -> Result<(), VfsError> {
        self.check(FailPoint::SetMetadata, path)?;
        self.mutated(self.inner.set_metadata(path, metadata))
    }

    fn create_folder_with_metadata(
        &self,
        path: &TreePath,
        metadata: Metadata,
    ) -> Result<(), VfsError> {
        self.check(FailPoint::CreateFolder, path)?;
        self.check(FailPoint::SetMetadata, path)?;
        self.mutated(self.inner.create_folder_with_metadata(path, metadata))
    }
}

/// One recorded handler call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCall {
    pub handler: String,
    pub event: HandlerEvent,
    pub project_type: String,
    pub path: String,
}

/// Shared log of handler calls, in call order
pub type CallLog = Arc<Mutex<Vec<HandlerCall>>>;

/// Handler that records every call and optionally fails
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    log: CallLog,
    fail_with: Option<String>,
}

impl RecordingHandler {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: Arc::clone(log),
            fail_with: None,
        }
    }

    /// Record, then fail with `message`
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn into_arc(self) -> Arc<dyn ProjectHandler> {
        Arc::new(self)
    }
}

impl ProjectHandler for RecordingHandler {
    fn handle(&self, ctx: &HandlerContext) -> Result<(), HandlerError> {
        self.log.lock().push(HandlerCall {
            handler: self.name.clone(),
            event: ctx.event,
            project_type: ctx.project_type.clone(),
            path: ctx.path.to_string(),
        });
        match &self.fail_with {
            Some(message) => Err(HandlerError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Empty shared call log
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Recorded `(handler, event)` pairs
pub fn recorded(log: &CallLog) -> Vec<(String, HandlerEvent)> {
    log.lock()
        .iter()
        .map(|call| (call.handler.clone(), call.event))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_registry_loads() {
        let registry = demo_registry();
        assert_eq!(
            registry.ids(),
            vec!["blank", "java", "maven", "node", "git", "docs"]
        );
        assert!(registry.get("maven").unwrap().is_primary_only());
        assert!(!registry.get("git").unwrap().is_primary());
    }

    #[test]
    fn flaky_fs_injects_and_heals() {
        let fs = FlakyFileSystem::new(Arc::new(seeded_fs()));
        fs.fail_on(FailPoint::CreateFolder);
        assert!(matches!(
            fs.create_folder(&p("/new")),
            Err(VfsError::Io { .. })
        ));
        fs.heal();
        fs.create_folder(&p("/new")).unwrap();
        assert_eq!(fs.mutations(), 1);
    }
}
