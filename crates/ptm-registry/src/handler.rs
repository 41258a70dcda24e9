//! Lifecycle handlers keyed by (event, project type)

use parking_lot::RwLock;
use ptm_model::ProjectConfig;
use ptm_vfs::{TreePath, WorkspaceId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Lifecycle point at which handlers run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerEvent {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeRename,
    AfterRename,
    BeforeDelete,
    AfterDelete,
    BeforeImport,
    AfterImport,
}

impl HandlerEvent {
    /// Runs before the storage mutation (and may veto it)
    #[inline]
    #[must_use]
    pub fn is_pre(self) -> bool {
        matches!(
            self,
            Self::BeforeCreate
                | Self::BeforeUpdate
                | Self::BeforeRename
                | Self::BeforeDelete
                | Self::BeforeImport
        )
    }

    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeCreate => "before-create",
            Self::AfterCreate => "after-create",
            Self::BeforeUpdate => "before-update",
            Self::AfterUpdate => "after-update",
            Self::BeforeRename => "before-rename",
            Self::AfterRename => "after-rename",
            Self::BeforeDelete => "before-delete",
            Self::AfterDelete => "after-delete",
            Self::BeforeImport => "before-import",
            Self::AfterImport => "after-import",
        }
    }
}

impl fmt::Display for HandlerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler gets to see
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub event: HandlerEvent,
    pub workspace: WorkspaceId,
    /// Target path (the new path for renames)
    pub path: TreePath,
    /// Path before a rename
    pub previous_path: Option<TreePath>,
    /// Type the handler was registered for
    pub project_type: String,
    /// Config involved in the operation, if any
    pub config: Option<ProjectConfig>,
    /// Type-specific creation options, passed through untouched
    pub options: BTreeMap<String, String>,
}

impl HandlerContext {
    /// Option value by key
    #[inline]
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Failure reported by a handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    /// Create handler error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Callback run at a lifecycle point
pub trait ProjectHandler: Send + Sync {
    /// Run the handler
    ///
    /// # Errors
    /// A pre-event error aborts the operation; a post-event error becomes a warning
    fn handle(&self, ctx: &HandlerContext) -> Result<(), HandlerError>;

    /// Name used in logs and warnings
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Handler backed by a closure
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&HandlerContext) -> Result<(), HandlerError> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ProjectHandler for FnHandler<F>
where
    F: Fn(&HandlerContext) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &HandlerContext) -> Result<(), HandlerError> {
        (self.f)(ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

type HandlerList = Vec<Arc<dyn ProjectHandler>>;

/// Ordered handler lists keyed by (event, project type)
#[derive(Default)]
pub struct ProjectHandlerRegistry {
    handlers: RwLock<HashMap<(HandlerEvent, String), HandlerList>>,
}

impl ProjectHandlerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler; handlers for one key run in registration order
    pub fn add_handler(
        &self,
        event: HandlerEvent,
        project_type: impl Into<String>,
        handler: Arc<dyn ProjectHandler>,
    ) {
        let project_type = project_type.into();
        tracing::debug!(%event, %project_type, handler = handler.name(), "handler registered");
        self.handlers
            .write()
            .entry((event, project_type))
            .or_default()
            .push(handler);
    }

    /// Append a closure handler
    pub fn add_fn<F>(
        &self,
        event: HandlerEvent,
        project_type: impl Into<String>,
        name: impl Into<String>,
        f: F,
    ) where
        F: Fn(&HandlerContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.add_handler(event, project_type, Arc::new(FnHandler::new(name, f)));
    }

    /// Handlers for a key; empty if none
    ///
    /// Returns a snapshot so the registry lock is not held while handlers run.
    #[must_use]
    pub fn handlers(&self, event: HandlerEvent, project_type: &str) -> HandlerList {
        self.handlers
            .read()
            .get(&(event, project_type.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Check if no handler is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProjectHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectHandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}
