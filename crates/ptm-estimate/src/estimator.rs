//! Source estimator
//!
//! Evaluates the detectors of a candidate type against a folder. Nothing is
//! written: the estimator only lists folders and reads detector files.

use crate::error::EstimateError;
use ptm_model::AttributeValue;
use ptm_registry::{Detector, ProjectTypeRegistry, RegistryError};
use ptm_vfs::{ItemKind, TreePath, VirtualFileSystem};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// How much of the folder is inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Every detector, recursive ones included
    #[default]
    Full,
    /// Only detectors looking directly under the folder
    Shallow,
}

impl ScanMode {
    /// Mode for a `transient_only` request flag
    #[inline]
    #[must_use]
    pub fn from_transient_only(transient_only: bool) -> Self {
        if transient_only {
            Self::Shallow
        } else {
            Self::Full
        }
    }
}

/// Bounds on what detectors may inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateLimits {
    /// Folder levels below the estimated folder searched by recursive detectors
    pub max_depth: usize,
    /// Largest detector file read, in bytes
    pub max_file_bytes: usize,
}

impl Default for EstimateLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_file_bytes: 1024 * 1024,
        }
    }
}

/// Outcome of estimating one candidate type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEstimation {
    pub project_type: String,
    /// Detected attributes only
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Required detector-backed attributes that were detected
    pub matched_required: usize,
    /// Required detector-backed attributes evaluated in this scan
    pub total_required: usize,
}

impl SourceEstimation {
    /// Something was detected and no evaluated required attribute is missing
    #[inline]
    #[must_use]
    pub fn matches(&self) -> bool {
        !self.attributes.is_empty() && self.matched_required == self.total_required
    }
}

/// Read-only attribute estimation over a [`VirtualFileSystem`]
#[derive(Debug, Clone)]
pub struct SourceEstimator {
    registry: Arc<ProjectTypeRegistry>,
    limits: EstimateLimits,
}

impl SourceEstimator {
    /// Create estimator with default limits
    #[must_use]
    pub fn new(registry: Arc<ProjectTypeRegistry>) -> Self {
        Self {
            registry,
            limits: EstimateLimits::default(),
        }
    }

    /// With limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: EstimateLimits) -> Self {
        self.limits = limits;
        self
    }

    #[inline]
    #[must_use]
    pub fn limits(&self) -> EstimateLimits {
        self.limits
    }

    /// Attributes of `type_id` derivable from `folder`
    ///
    /// Attributes without a satisfied detector are absent from the result.
    ///
    /// # Errors
    /// - `EstimateError::Storage` if the folder cannot be listed
    /// - `EstimateError::ValueStorage` if a detector file is not UTF-8 or too large
    /// - `EstimateError::UnknownType` if `type_id` is not registered
    pub fn estimate(
        &self,
        fs: &dyn VirtualFileSystem,
        folder: &TreePath,
        type_id: &str,
        mode: ScanMode,
    ) -> Result<BTreeMap<String, AttributeValue>, EstimateError> {
        Ok(self.evaluate(fs, folder, type_id, mode)?.attributes)
    }

    /// Full estimation record of `type_id` for `folder`
    ///
    /// # Errors
    /// Same as [`estimate`](Self::estimate)
    pub fn evaluate(
        &self,
        fs: &dyn VirtualFileSystem,
        folder: &TreePath,
        type_id: &str,
        mode: ScanMode,
    ) -> Result<SourceEstimation, EstimateError> {
        let children = fs
            .list(folder)
            .map_err(|e| EstimateError::storage(folder, e))?;
        let definitions = self
            .registry
            .resolve_attribute_definitions(type_id)
            .map_err(|e| match e {
                RegistryError::NotFound(id) => EstimateError::UnknownType(id),
                other => EstimateError::UnknownType(other.to_string()),
            })?;

        let mut estimation = SourceEstimation {
            project_type: type_id.to_string(),
            attributes: BTreeMap::new(),
            matched_required: 0,
            total_required: 0,
        };

        for (name, definition) in &definitions {
            let Some(detector) = definition.detector() else {
                continue;
            };
            if detector.is_recursive() && mode == ScanMode::Shallow {
                continue;
            }
            if definition.required {
                estimation.total_required += 1;
            }

            let files = if detector.is_recursive() {
                self.find_recursive(fs, folder, detector.file())?
            } else {
                children
                    .iter()
                    .filter(|item| item.kind == ItemKind::File && item.name() == detector.file())
                    .map(|item| item.path.clone())
                    .collect()
            };

            if let Some(values) = self.detect(fs, name, detector, &files)? {
                if definition.required {
                    estimation.matched_required += 1;
                }
                estimation
                    .attributes
                    .insert(name.clone(), AttributeValue::estimated(values));
            }
        }

        tracing::debug!(
            type_id,
            %folder,
            detected = estimation.attributes.len(),
            matched_required = estimation.matched_required,
            total_required = estimation.total_required,
            "estimated"
        );
        Ok(estimation)
    }

    /// Estimations of every auto-detectable type that matches `folder`
    ///
    /// Ranked by matched required attributes, descending; ties keep
    /// registration order.
    ///
    /// # Errors
    /// First estimation error encountered
    pub fn resolve(
        &self,
        fs: &dyn VirtualFileSystem,
        folder: &TreePath,
        mode: ScanMode,
    ) -> Result<Vec<SourceEstimation>, EstimateError> {
        let mut out = Vec::new();
        for descriptor in self.registry.detectable_types() {
            let estimation = self.evaluate(fs, folder, descriptor.id(), mode)?;
            if estimation.matches() {
                out.push(estimation);
            }
        }
        // stable sort keeps registration order among equals
        out.sort_by(|a, b| b.matched_required.cmp(&a.matched_required));
        Ok(out)
    }

    /// Values the detector yields over `files`, or `None` if unsatisfied
    fn detect(
        &self,
        fs: &dyn VirtualFileSystem,
        attribute: &str,
        detector: &Detector,
        files: &[TreePath],
    ) -> Result<Option<Vec<String>>, EstimateError> {
        if files.is_empty() {
            return Ok(None);
        }
        if detector.pattern().is_none() {
            return Ok(Some(detector.values().to_vec()));
        }

        let mut values: Vec<String> = Vec::new();
        for file in files {
            let bytes = fs
                .read_file(file)
                .map_err(|e| EstimateError::storage(file, e))?;
            if bytes.len() > self.limits.max_file_bytes {
                return Err(EstimateError::ValueStorage {
                    attribute: attribute.to_string(),
                    path: file.clone(),
                    reason: format!(
                        "file is {} bytes, limit is {}",
                        bytes.len(),
                        self.limits.max_file_bytes
                    ),
                });
            }
            let text = String::from_utf8(bytes).map_err(|e| EstimateError::ValueStorage {
                attribute: attribute.to_string(),
                path: file.clone(),
                reason: e.to_string(),
            })?;
            for value in detector.extract(&text) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        Ok((!values.is_empty()).then_some(values))
    }

    /// Files named `file_name` anywhere below `folder`, breadth-first
    fn find_recursive(
        &self,
        fs: &dyn VirtualFileSystem,
        folder: &TreePath,
        file_name: &str,
    ) -> Result<Vec<TreePath>, EstimateError> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([(folder.clone(), 0usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            let items = fs
                .list(&current)
                .map_err(|e| EstimateError::storage(&current, e))?;
            for item in items {
                match item.kind {
                    ItemKind::File if item.name() == file_name => found.push(item.path),
                    ItemKind::Folder if depth < self.limits.max_depth => {
                        queue.push_back((item.path, depth + 1));
                    }
                    _ => {}
                }
            }
        }
        Ok(found)
    }
}
