//! Project manager
//!
//! Orchestrates the logical project layer above per-workspace storage:
//! - reads build [`TreeEntry`] views on demand and never lock
//! - structural calls validate, run pre-handlers, mutate storage, run
//!   post-handlers, all inside an exclusive section over the touched subtrees
//!
//! The manager keeps no cached tree. Every answer comes from storage, so two
//! reads of one path may return distinct but equal views.

use crate::access::{AccessPolicy, AllowAll, Permission};
use crate::config::ManagerConfig;
use crate::error::ProjectError;
use crate::lock::PathLockTable;
use crate::operation::{HandlerWarning, Operation, OperationState, Outcome};
use chrono::Utc;
use ptm_estimate::{ScanMode, SourceEstimation, SourceEstimator};
use ptm_model::sidecar::{self, KEY_MEDIA_TYPE};
use ptm_model::{
    AttributeValue, FileEntry, FolderEntry, Project, ProjectConfig, ProjectMisc, ProjectSidecar,
    TreeEntry, Visibility,
};
use ptm_registry::{HandlerContext, HandlerEvent, ProjectHandlerRegistry, ProjectTypeRegistry};
use ptm_vfs::{PathError, TreePath, VfsError, VfsRegistry, VirtualFileSystem, WorkspaceId};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Creation options passed through to handlers
pub type CreateOptions = BTreeMap<String, String>;

/// What a handler invocation is about
struct HandlerTarget<'a> {
    workspace: &'a WorkspaceId,
    path: &'a TreePath,
    previous_path: Option<&'a TreePath>,
    config: &'a ProjectConfig,
    options: &'a CreateOptions,
}

/// Where a new project's folder comes from
enum FolderSource {
    /// Create it (and missing ancestors)
    Create,
    /// Reuse an existing plain folder
    Adopt,
}

/// Project tree manager
#[derive(Debug)]
pub struct ProjectManager {
    vfs: Arc<VfsRegistry>,
    types: Arc<ProjectTypeRegistry>,
    handlers: Arc<ProjectHandlerRegistry>,
    estimator: SourceEstimator,
    locks: PathLockTable,
    policy: Arc<dyn AccessPolicy>,
    config: ManagerConfig,
}

impl ProjectManager {
    /// Create manager with default config and no access restrictions
    #[must_use]
    pub fn new(
        vfs: Arc<VfsRegistry>,
        types: Arc<ProjectTypeRegistry>,
        handlers: Arc<ProjectHandlerRegistry>,
    ) -> Self {
        let config = ManagerConfig::default();
        Self {
            vfs,
            estimator: SourceEstimator::new(Arc::clone(&types)).with_limits(config.estimate_limits()),
            types,
            handlers,
            locks: PathLockTable::new(),
            policy: Arc::new(AllowAll),
            config,
        }
    }

    /// With config
    #[must_use]
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.estimator = SourceEstimator::new(Arc::clone(&self.types))
            .with_limits(config.estimate_limits());
        self.config = config;
        self
    }

    /// With access policy
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Manager settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Workspace storage registry
    #[inline]
    #[must_use]
    pub fn vfs_registry(&self) -> &Arc<VfsRegistry> {
        &self.vfs
    }

    /// Project type registry
    #[inline]
    #[must_use]
    pub fn type_registry(&self) -> &Arc<ProjectTypeRegistry> {
        &self.types
    }

    /// Lifecycle handler registry
    #[inline]
    #[must_use]
    pub fn handlers(&self) -> &Arc<ProjectHandlerRegistry> {
        &self.handlers
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Root folder of a workspace
    ///
    /// # Errors
    /// `NotFound` if the workspace is unknown
    pub fn get_projects_root(&self, workspace: &WorkspaceId) -> Result<FolderEntry, ProjectError> {
        let root = TreePath::root();
        self.policy.check(workspace, &root, Permission::Read)?;
        self.storage(workspace)?;
        Ok(FolderEntry::new(workspace.clone(), root))
    }

    /// Top-level projects, sorted by name
    ///
    /// # Errors
    /// `NotFound` if the workspace is unknown, `ValueStorage` on corrupt metadata
    pub fn get_projects(&self, workspace: &WorkspaceId) -> Result<Vec<Project>, ProjectError> {
        let root = TreePath::root();
        self.policy.check(workspace, &root, Permission::Read)?;
        let fs = self.storage(workspace)?;
        let mut projects = Vec::new();
        for item in fs.list(&root)? {
            if !item.is_folder() {
                continue;
            }
            if let Some(TreeEntry::Project(project)) = load_entry(fs.as_ref(), workspace, &item.path)? {
                projects.push(project);
            }
        }
        projects.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(projects)
    }

    /// Project at `path`; `None` if absent or not a project
    ///
    /// # Errors
    /// `NotFound` if the workspace is unknown, `ValueStorage` on corrupt metadata
    pub fn get_project(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<Option<Project>, ProjectError> {
        Ok(self
            .get_entry(workspace, path)?
            .and_then(TreeEntry::into_project))
    }

    /// Entry at `path`; `None` if absent
    ///
    /// # Errors
    /// `NotFound` if the workspace is unknown, `ValueStorage` on corrupt metadata
    pub fn get_entry(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<Option<TreeEntry>, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        let fs = self.storage(workspace)?;
        load_entry(fs.as_ref(), workspace, path)
    }

    /// Direct children of a folder, sorted by name
    ///
    /// # Errors
    /// `NotFound` if the folder is absent
    pub fn list_children(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<Vec<TreeEntry>, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        let fs = self.storage(workspace)?;
        let mut entries = Vec::new();
        for item in fs.list(path)? {
            // vanished since listing
            if let Some(entry) = load_entry(fs.as_ref(), workspace, &item.path)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Projects nested below the project at `path`, sorted by path
    ///
    /// The search is bounded by `max_module_depth` folder levels.
    ///
    /// # Errors
    /// `NotFound` if there is no project at `path`
    pub fn get_project_modules(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<Vec<Project>, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        let fs = self.storage(workspace)?;
        require_project(fs.as_ref(), workspace, path)?;

        let mut modules = Vec::new();
        let mut queue = VecDeque::from([(path.clone(), 0usize)]);
        while let Some((folder, depth)) = queue.pop_front() {
            if depth >= self.config.max_module_depth {
                continue;
            }
            let items = match fs.list(&folder) {
                Ok(items) => items,
                Err(VfsError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            for item in items.into_iter().filter(|i| i.is_folder()) {
                if let Some(entry) = load_entry(fs.as_ref(), workspace, &item.path)? {
                    if let TreeEntry::Project(module) = entry {
                        modules.push(module);
                    }
                    queue.push_back((item.path, depth + 1));
                }
            }
        }
        modules.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(modules)
    }

    /// Misc bag of the project at `path`
    ///
    /// # Errors
    /// `NotFound` if there is no project at `path`
    pub fn get_project_misc(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<ProjectMisc, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        let fs = self.storage(workspace)?;
        Ok(require_project(fs.as_ref(), workspace, path)?.misc().clone())
    }

    /// Replace the misc bag of the project at `path`
    ///
    /// No handler runs, but the project's section is held across the
    /// read-modify-write of its metadata. Calling this from a handler for a
    /// path the operation holds gives `Conflict`.
    ///
    /// # Errors
    /// - `NotFound` if there is no project at `path`
    /// - `Conflict` if the calling thread holds an overlapping section
    pub fn save_project_misc(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        misc: &ProjectMisc,
    ) -> Result<(), ProjectError> {
        self.policy.check(workspace, path, Permission::Write)?;
        let fs = self.storage(workspace)?;
        let _section = self.locks.acquire(workspace, std::slice::from_ref(path))?;
        let mut metadata = fs.get_metadata(path)?;
        if !sidecar::is_project(&metadata) {
            return Err(ProjectError::not_found(format!("project {path}")));
        }
        sidecar::encode_misc(&mut metadata, misc);
        fs.set_metadata(path, metadata)?;
        tracing::debug!(%workspace, %path, entries = misc.len(), "project misc saved");
        Ok(())
    }

    /// Attributes of `type_id` derivable from the folder at `path`
    ///
    /// # Errors
    /// - `ProjectTypeConstraint` if `type_id` is not registered
    /// - `NotFound` if the folder is absent
    /// - `ValueStorage` if a detector cannot read its input
    pub fn estimate_project(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        type_id: &str,
    ) -> Result<BTreeMap<String, AttributeValue>, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        if !self.types.contains(type_id) {
            return Err(ProjectError::constraint(format!(
                "unknown project type '{type_id}'"
            )));
        }
        let fs = self.storage(workspace)?;
        Ok(self
            .estimator
            .estimate(fs.as_ref(), path, type_id, ScanMode::Full)?)
    }

    /// Auto-detectable types matching the folder at `path`, best first
    ///
    /// `transient_only` restricts the scan to detectors that look directly
    /// under the folder.
    ///
    /// # Errors
    /// `NotFound` if the folder is absent, `ValueStorage` if a detector fails
    pub fn resolve_sources(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        transient_only: bool,
    ) -> Result<Vec<SourceEstimation>, ProjectError> {
        self.policy.check(workspace, path, Permission::Read)?;
        let fs = self.storage(workspace)?;
        let ranked = self.estimator.resolve(
            fs.as_ref(),
            path,
            ScanMode::from_transient_only(transient_only),
        )?;
        tracing::debug!(%workspace, %path, candidates = ranked.len(), "sources resolved");
        Ok(ranked)
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Create a top-level project named `name`
    ///
    /// # Errors
    /// - `InvalidPath` if `name` is not a single segment
    /// - `ProjectTypeConstraint` if `config` is invalid
    /// - `Conflict` if `name` is taken
    /// - `Handler` if a pre-handler rejects
    pub fn create_project(
        &self,
        workspace: &WorkspaceId,
        name: &str,
        config: ProjectConfig,
        options: &CreateOptions,
        visibility: Visibility,
    ) -> Result<Outcome<Project>, ProjectError> {
        let path = TreePath::root().child(name)?;
        let mut op = Operation::start("create_project", workspace, &path);
        let result = (|| -> Result<Project, ProjectError> {
            let fs = self.prepare_write(workspace, &path, Some(&config))?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(&path))?;
            let source = match load_entry(fs.as_ref(), workspace, &path)? {
                None => FolderSource::Create,
                Some(TreeEntry::Folder(_)) if !self.config.strict_create => FolderSource::Adopt,
                Some(_) => return Err(ProjectError::conflict(format!("{path} already exists"))),
            };
            self.attach_project(
                &mut op,
                fs.as_ref(),
                workspace,
                &path,
                source,
                config,
                options,
                visibility,
                false,
            )
        })();
        op.finish(result)
    }

    /// Replace the config of the project at `path`
    ///
    /// `visibility: None` keeps the current visibility.
    ///
    /// # Errors
    /// - `NotFound` if there is no project at `path`
    /// - `ProjectTypeConstraint` if `config` is invalid
    /// - `Handler` if a pre-handler rejects
    pub fn update_project(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        config: ProjectConfig,
        visibility: Option<Visibility>,
    ) -> Result<Outcome<Project>, ProjectError> {
        let mut op = Operation::start("update_project", workspace, path);
        let result = (|| -> Result<Project, ProjectError> {
            let fs = self.prepare_write(workspace, path, Some(&config))?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(path))?;
            let current = require_project(fs.as_ref(), workspace, path)?;

            let options = CreateOptions::new();
            let target = HandlerTarget {
                workspace,
                path,
                previous_path: None,
                config: &config,
                options: &options,
            };
            op.advance(OperationState::PreHandlers);
            self.fire(&mut op, HandlerEvent::BeforeUpdate, &target)?;

            op.advance(OperationState::Mutating);
            let mut misc = current.misc().clone();
            misc.touch(Utc::now());
            let sidecar = ProjectSidecar::new(
                config.clone(),
                visibility.unwrap_or(current.visibility()),
                misc,
            );
            let mut metadata = fs.get_metadata(path)?;
            sidecar.write_into(&mut metadata)?;
            fs.set_metadata(path, metadata)?;

            op.advance(OperationState::PostHandlers);
            self.fire(&mut op, HandlerEvent::AfterUpdate, &target)?;
            Ok(Project::new(current.folder().clone(), sidecar))
        })();
        op.finish(result)
    }

    /// Create a module of the project at `project_path`
    ///
    /// `module_path` is absolute when it starts with `/`, otherwise relative
    /// to the project. Missing folders on the way are created; an existing
    /// plain folder at the module path is adopted.
    ///
    /// # Errors
    /// - `ProjectTypeConstraint` if the module is not strictly below the
    ///   project, is deeper than `max_module_depth`, or `config` is invalid
    /// - `NotFound` if there is no project at `project_path`
    /// - `Conflict` if a project or file occupies the module path
    /// - `Handler` if a pre-handler rejects
    pub fn add_module(
        &self,
        workspace: &WorkspaceId,
        project_path: &TreePath,
        module_path: &str,
        config: ProjectConfig,
        options: &CreateOptions,
        visibility: Visibility,
    ) -> Result<Outcome<Project>, ProjectError> {
        let module = if module_path.starts_with('/') {
            TreePath::parse(module_path)?
        } else {
            project_path.join(module_path).map_err(|e| match e {
                PathError::ParentSegment(_) => ProjectError::constraint(format!(
                    "module {module_path} is outside project {project_path}"
                )),
                other => other.into(),
            })?
        };
        let mut op = Operation::start("add_module", workspace, &module);
        let result = (|| -> Result<Project, ProjectError> {
            if !project_path.is_ancestor_of(&module) {
                return Err(ProjectError::constraint(format!(
                    "module {module} is outside project {project_path}"
                )));
            }
            if module.depth() - project_path.depth() > self.config.max_module_depth {
                return Err(ProjectError::constraint(format!(
                    "module {module} is more than {} levels below {project_path}",
                    self.config.max_module_depth
                )));
            }
            let fs = self.prepare_write(workspace, &module, Some(&config))?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(&module))?;
            require_project(fs.as_ref(), workspace, project_path)?;
            let source = match load_entry(fs.as_ref(), workspace, &module)? {
                None => FolderSource::Create,
                Some(TreeEntry::Folder(_)) => FolderSource::Adopt,
                Some(_) => return Err(ProjectError::conflict(format!("{module} already exists"))),
            };
            self.attach_project(
                &mut op,
                fs.as_ref(),
                workspace,
                &module,
                source,
                config,
                options,
                visibility,
                false,
            )
        })();
        op.finish(result)
    }

    /// Turn the existing plain folder at `path` into a project
    ///
    /// Fires import events around the create events.
    ///
    /// # Errors
    /// - `Forbidden` for the workspace root
    /// - `NotFound` if nothing is at `path`
    /// - `Conflict` if `path` is already a project or is a file
    pub fn convert_folder_to_project(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        config: ProjectConfig,
        visibility: Visibility,
    ) -> Result<Outcome<Project>, ProjectError> {
        let mut op = Operation::start("convert_folder_to_project", workspace, path);
        let result = (|| -> Result<Project, ProjectError> {
            if path.is_root() {
                return Err(ProjectError::forbidden("the workspace root cannot be a project"));
            }
            let fs = self.prepare_write(workspace, path, Some(&config))?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(path))?;
            match load_entry(fs.as_ref(), workspace, path)? {
                None => Err(ProjectError::not_found(path.to_string())),
                Some(TreeEntry::Project(_)) => {
                    Err(ProjectError::conflict(format!("{path} is already a project")))
                }
                Some(TreeEntry::File(_)) => {
                    Err(ProjectError::conflict(format!("{path} is not a folder")))
                }
                Some(TreeEntry::Folder(_)) => self.attach_project(
                    &mut op,
                    fs.as_ref(),
                    workspace,
                    path,
                    FolderSource::Adopt,
                    config,
                    &CreateOptions::new(),
                    visibility,
                    true,
                ),
            }
        })();
        op.finish(result)
    }

    /// Rename the entry at `path` within its folder
    ///
    /// Returns the entry at its new path, or `None` if nothing was at `path`.
    /// A project keeps its config. `new_media_type` is recorded on files.
    ///
    /// # Errors
    /// - `Forbidden` for the workspace root
    /// - `InvalidPath` if `new_name` is not a single segment
    /// - `Conflict` if `new_name` is taken
    /// - `Handler` if a pre-handler rejects
    pub fn rename(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        new_name: &str,
        new_media_type: Option<&str>,
    ) -> Result<Outcome<Option<TreeEntry>>, ProjectError> {
        let mut op = Operation::start("rename", workspace, path);
        let result = (|| -> Result<Option<TreeEntry>, ProjectError> {
            let Some(parent) = path.parent() else {
                return Err(ProjectError::forbidden("the workspace root cannot be renamed"));
            };
            let dst = parent.child(new_name)?;
            self.policy.check(workspace, &dst, Permission::Write)?;
            let fs = self.prepare_write(workspace, path, None)?;

            let section: Vec<TreePath> = if dst == *path {
                vec![path.clone()]
            } else {
                vec![path.clone(), dst.clone()]
            };
            let _section = self.locks.acquire(workspace, &section)?;

            let Some(entry) = load_entry(fs.as_ref(), workspace, path)? else {
                tracing::debug!("nothing to rename");
                return Ok(None);
            };
            if dst != *path && fs.exists(&dst) {
                return Err(ProjectError::conflict(format!("{dst} already exists")));
            }

            let options = CreateOptions::new();
            let target = entry.as_project().map(|project| HandlerTarget {
                workspace,
                path: &dst,
                previous_path: Some(path),
                config: project.config(),
                options: &options,
            });

            op.advance(OperationState::PreHandlers);
            if let Some(target) = &target {
                self.fire(&mut op, HandlerEvent::BeforeRename, target)?;
            }

            op.advance(OperationState::Mutating);
            if dst != *path {
                fs.move_item(path, &dst)?;
            }
            if let Some(media_type) = new_media_type {
                if matches!(entry, TreeEntry::File(_)) {
                    let mut metadata = fs.get_metadata(&dst)?;
                    metadata.insert(KEY_MEDIA_TYPE.to_string(), media_type.to_string());
                    fs.set_metadata(&dst, metadata)?;
                } else {
                    tracing::debug!(media_type, "media type ignored for folder");
                }
            }

            op.advance(OperationState::PostHandlers);
            if let Some(target) = &target {
                self.fire(&mut op, HandlerEvent::AfterRename, target)?;
            }
            load_entry(fs.as_ref(), workspace, &dst)
        })();
        op.finish(result)
    }

    /// Delete the subtree at `path`, or at `module_path` below it
    ///
    /// `module_path` is always relative to `path`. Returns `false` if the
    /// target did not exist.
    ///
    /// # Errors
    /// - `Forbidden` for the workspace root
    /// - `Handler` if a pre-handler rejects
    pub fn delete(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        module_path: Option<&str>,
    ) -> Result<Outcome<bool>, ProjectError> {
        let target = match module_path {
            Some(module) => path.join(module)?,
            None => path.clone(),
        };
        let mut op = Operation::start("delete", workspace, &target);
        let result = (|| -> Result<bool, ProjectError> {
            if target.is_root() {
                return Err(ProjectError::forbidden("the workspace root cannot be deleted"));
            }
            let fs = self.prepare_write(workspace, &target, None)?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(&target))?;

            let Some(entry) = load_entry(fs.as_ref(), workspace, &target)? else {
                tracing::debug!("nothing to delete");
                return Ok(false);
            };
            let options = CreateOptions::new();
            let handler_target = entry.as_project().map(|project| HandlerTarget {
                workspace,
                path: &target,
                previous_path: None,
                config: project.config(),
                options: &options,
            });

            op.advance(OperationState::PreHandlers);
            if let Some(t) = &handler_target {
                self.fire(&mut op, HandlerEvent::BeforeDelete, t)?;
            }

            op.advance(OperationState::Mutating);
            fs.delete_subtree(&target)?;

            op.advance(OperationState::PostHandlers);
            if let Some(t) = &handler_target {
                self.fire(&mut op, HandlerEvent::AfterDelete, t)?;
            }
            Ok(true)
        })();
        op.finish(result)
    }

    /// Create a plain folder; its parent must exist
    ///
    /// # Errors
    /// `Conflict` if `path` exists, `NotFound` if the parent is absent
    pub fn create_folder(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
    ) -> Result<Outcome<FolderEntry>, ProjectError> {
        let mut op = Operation::start("create_folder", workspace, path);
        let result = (|| -> Result<FolderEntry, ProjectError> {
            let fs = self.prepare_write(workspace, path, None)?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(path))?;
            if fs.exists(path) {
                return Err(ProjectError::conflict(format!("{path} already exists")));
            }
            op.advance(OperationState::PreHandlers);
            op.advance(OperationState::Mutating);
            fs.create_folder(path)?;
            op.advance(OperationState::PostHandlers);
            Ok(FolderEntry::new(workspace.clone(), path.clone()))
        })();
        op.finish(result)
    }

    /// Create a file; its parent must exist
    ///
    /// # Errors
    /// `Conflict` if `path` exists, `NotFound` if the parent is absent
    pub fn create_file(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        content: &[u8],
        media_type: Option<&str>,
    ) -> Result<Outcome<FileEntry>, ProjectError> {
        let mut op = Operation::start("create_file", workspace, path);
        let result = (|| -> Result<FileEntry, ProjectError> {
            let fs = self.prepare_write(workspace, path, None)?;
            let _section = self.locks.acquire(workspace, std::slice::from_ref(path))?;
            if fs.exists(path) {
                return Err(ProjectError::conflict(format!("{path} already exists")));
            }
            op.advance(OperationState::PreHandlers);
            op.advance(OperationState::Mutating);
            fs.create_file(path, content)?;
            if let Some(media_type) = media_type {
                let mut metadata = fs.get_metadata(path)?;
                metadata.insert(KEY_MEDIA_TYPE.to_string(), media_type.to_string());
                fs.set_metadata(path, metadata)?;
            }
            op.advance(OperationState::PostHandlers);
            Ok(FileEntry::new(
                workspace.clone(),
                path.clone(),
                media_type.map(str::to_string),
            ))
        })();
        op.finish(result)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn storage(&self, workspace: &WorkspaceId) -> Result<Arc<dyn VirtualFileSystem>, ProjectError> {
        Ok(self.vfs.get(workspace)?)
    }

    /// Checks shared by every structural call, before any section is taken
    fn prepare_write(
        &self,
        workspace: &WorkspaceId,
        path: &TreePath,
        config: Option<&ProjectConfig>,
    ) -> Result<Arc<dyn VirtualFileSystem>, ProjectError> {
        self.policy.check(workspace, path, Permission::Write)?;
        let fs = self.storage(workspace)?;
        if let Some(config) = config {
            self.types.validate_config(config)?;
        }
        Ok(fs)
    }

    /// Pre-handlers, sidecar write, post-handlers for a new project
    #[allow(clippy::too_many_arguments)]
    fn attach_project(
        &self,
        op: &mut Operation,
        fs: &dyn VirtualFileSystem,
        workspace: &WorkspaceId,
        path: &TreePath,
        source: FolderSource,
        config: ProjectConfig,
        options: &CreateOptions,
        visibility: Visibility,
        import: bool,
    ) -> Result<Project, ProjectError> {
        let target = HandlerTarget {
            workspace,
            path,
            previous_path: None,
            config: &config,
            options,
        };

        op.advance(OperationState::PreHandlers);
        if import {
            self.fire(op, HandlerEvent::BeforeImport, &target)?;
        }
        self.fire(op, HandlerEvent::BeforeCreate, &target)?;

        op.advance(OperationState::Mutating);
        let mut misc = ProjectMisc::new();
        misc.mark_created(Utc::now());
        let sidecar = ProjectSidecar::new(config.clone(), visibility, misc);
        match source {
            FolderSource::Create => {
                if let Some(parent) = path.parent() {
                    fs.create_folders(&parent)?;
                }
                fs.create_folder_with_metadata(path, sidecar.to_metadata()?)?;
            }
            FolderSource::Adopt => {
                let mut metadata = fs.get_metadata(path)?;
                sidecar.write_into(&mut metadata)?;
                fs.set_metadata(path, metadata)?;
            }
        }

        op.advance(OperationState::PostHandlers);
        self.fire(op, HandlerEvent::AfterCreate, &target)?;
        if import {
            self.fire(op, HandlerEvent::AfterImport, &target)?;
        }
        Ok(Project::new(
            FolderEntry::new(workspace.clone(), path.clone()),
            sidecar,
        ))
    }

    /// Run the handlers of `event` for the primary type, then each mixin
    ///
    /// A failing pre-handler stops the run with `ProjectError::Handler`;
    /// failing post-handlers become warnings on `op`.
    fn fire(
        &self,
        op: &mut Operation,
        event: HandlerEvent,
        target: &HandlerTarget<'_>,
    ) -> Result<(), ProjectError> {
        for type_id in target.config.type_ids() {
            for handler in self.handlers.handlers(event, type_id) {
                let ctx = HandlerContext {
                    event,
                    workspace: target.workspace.clone(),
                    path: target.path.clone(),
                    previous_path: target.previous_path.cloned(),
                    project_type: type_id.to_string(),
                    config: Some(target.config.clone()),
                    options: target.options.clone(),
                };
                let Err(err) = handler.handle(&ctx) else {
                    continue;
                };
                if event.is_pre() {
                    return Err(ProjectError::Handler {
                        handler: handler.name().to_string(),
                        event,
                        project_type: type_id.to_string(),
                        message: err.message,
                    });
                }
                op.warn(HandlerWarning {
                    handler: handler.name().to_string(),
                    event,
                    project_type: type_id.to_string(),
                    message: err.message,
                });
            }
        }
        Ok(())
    }
}

/// Entry at `path`, `None` if absent
fn load_entry(
    fs: &dyn VirtualFileSystem,
    workspace: &WorkspaceId,
    path: &TreePath,
) -> Result<Option<TreeEntry>, ProjectError> {
    let item = match fs.get_item(path) {
        Ok(item) => item,
        Err(VfsError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let metadata = match fs.get_metadata(path) {
        Ok(metadata) => metadata,
        // removed between the two calls
        Err(VfsError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(TreeEntry::from_item(workspace, &item, &metadata)?))
}

/// Project at `path` or `NotFound`
fn require_project(
    fs: &dyn VirtualFileSystem,
    workspace: &WorkspaceId,
    path: &TreePath,
) -> Result<Project, ProjectError> {
    load_entry(fs, workspace, path)?
        .and_then(TreeEntry::into_project)
        .ok_or_else(|| ProjectError::not_found(format!("project {path}")))
}
