//! Project type registry
//!
//! Types are registered at startup and read concurrently afterwards.
//! Registration takes the single write lock; lookups clone `Arc`s out so no
//! lock is held while callers work with a descriptor.

use crate::error::RegistryError;
use crate::project_type::{AttributeDefinition, ProjectTypeDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use ptm_model::{AttributeValue, ProjectConfig, ValueOrigin};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Id of the built-in fallback type
pub const BLANK_TYPE: &str = "blank";

/// Registry of project types, in registration order
#[derive(Debug, Default)]
pub struct ProjectTypeRegistry {
    types: RwLock<IndexMap<String, Arc<ProjectTypeDescriptor>>>,
}

impl ProjectTypeRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `blank` type
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let blank = ProjectTypeDescriptor::new(BLANK_TYPE, "Blank");
        // an empty registry cannot already hold `blank`
        let _ = registry.register(blank);
        registry
    }

    /// Register a type
    ///
    /// # Errors
    /// - `RegistryError::DuplicateType` if the id is taken
    /// - `RegistryError::UnknownParent` if a parent is not registered yet
    pub fn register(&self, descriptor: ProjectTypeDescriptor) -> Result<(), RegistryError> {
        let mut types = self.types.write();
        if types.contains_key(descriptor.id()) {
            return Err(RegistryError::DuplicateType(descriptor.id().to_string()));
        }
        if let Some(parent) = descriptor.parents().iter().find(|p| !types.contains_key(*p)) {
            return Err(RegistryError::UnknownParent {
                type_id: descriptor.id().to_string(),
                parent: parent.clone(),
            });
        }
        tracing::debug!(
            type_id = descriptor.id(),
            attributes = descriptor.attributes().len(),
            "project type registered"
        );
        types.insert(descriptor.id().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// Lookup a type
    ///
    /// # Errors
    /// `RegistryError::NotFound` if absent
    pub fn get(&self, id: &str) -> Result<Arc<ProjectTypeDescriptor>, RegistryError> {
        self.types
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Check if a type is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.types.read().contains_key(id)
    }

    /// Registered ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Types eligible for source resolution, in registration order
    #[must_use]
    pub fn detectable_types(&self) -> Vec<Arc<ProjectTypeDescriptor>> {
        self.types
            .read()
            .values()
            .filter(|d| d.is_auto_detect())
            .cloned()
            .collect()
    }

    /// Attribute definitions of `id` and all its ancestors
    ///
    /// Depth-first, parents before children, so a child's definition
    /// replaces an inherited one with the same name.
    ///
    /// # Errors
    /// `RegistryError::NotFound` if `id` is absent
    pub fn resolve_attribute_definitions(
        &self,
        id: &str,
    ) -> Result<IndexMap<String, AttributeDefinition>, RegistryError> {
        let types = self.types.read();
        let mut visited = HashSet::new();
        let mut out = IndexMap::new();
        collect_definitions(&types, id, &mut visited, &mut out)?;
        Ok(out)
    }

    /// Check a config against the type rules
    ///
    /// - primary type registered and allowed as primary
    /// - every mixin registered, mixable, and distinct from the primary
    /// - every required attribute that cannot be detected is declared
    /// - declared values of constant attributes match the constant
    ///
    /// # Errors
    /// `RegistryError::ConstraintViolation` describing the first violation
    pub fn validate_config(&self, config: &ProjectConfig) -> Result<(), RegistryError> {
        let primary = self.get(&config.project_type).map_err(|_| {
            RegistryError::constraint(format!("unknown project type '{}'", config.project_type))
        })?;
        if !primary.is_primary() {
            return Err(RegistryError::constraint(format!(
                "'{}' can only be used as a mixin",
                primary.id()
            )));
        }

        for mixin in &config.mixins {
            if mixin == &config.project_type {
                return Err(RegistryError::constraint(format!(
                    "'{mixin}' is both primary type and mixin"
                )));
            }
            let descriptor = self.get(mixin).map_err(|_| {
                RegistryError::constraint(format!("unknown mixin type '{mixin}'"))
            })?;
            if !descriptor.is_mixable() {
                return Err(RegistryError::constraint(format!(
                    "'{mixin}' is primary-only and cannot be a mixin"
                )));
            }
        }

        for type_id in config.type_ids() {
            for (name, definition) in self.resolve_attribute_definitions(type_id)? {
                if definition.must_be_declared() && config.attribute(&name).is_none() {
                    return Err(RegistryError::constraint(format!(
                        "required attribute '{name}' of type '{type_id}' is not set"
                    )));
                }
                if let (Some(constant), Some(declared)) =
                    (definition.constant_values(), config.attribute(&name))
                {
                    if constant != declared {
                        return Err(RegistryError::constraint(format!(
                            "attribute '{name}' of type '{type_id}' is constant"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Declared attributes overlaid with the constants of all involved types
    ///
    /// # Errors
    /// `RegistryError::NotFound` if a type of the config is not registered
    pub fn effective_attributes(
        &self,
        config: &ProjectConfig,
    ) -> Result<BTreeMap<String, AttributeValue>, RegistryError> {
        let mut out: BTreeMap<String, AttributeValue> = config
            .attributes
            .iter()
            .map(|(name, values)| (name.clone(), AttributeValue::declared(values.clone())))
            .collect();
        for type_id in config.type_ids() {
            for (name, definition) in self.resolve_attribute_definitions(type_id)? {
                if let Some(values) = definition.constant_values() {
                    out.insert(
                        name,
                        AttributeValue::new(values.to_vec(), ValueOrigin::Constant),
                    );
                }
            }
        }
        Ok(out)
    }
}

fn collect_definitions(
    types: &IndexMap<String, Arc<ProjectTypeDescriptor>>,
    id: &str,
    visited: &mut HashSet<String>,
    out: &mut IndexMap<String, AttributeDefinition>,
) -> Result<(), RegistryError> {
    if !visited.insert(id.to_string()) {
        return Ok(());
    }
    let descriptor = types
        .get(id)
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
    for parent in descriptor.parents() {
        collect_definitions(types, parent, visited, out)?;
    }
    for (name, definition) in descriptor.attributes() {
        out.insert(name.clone(), definition.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::project_type::Detector;

    fn registry() -> ProjectTypeRegistry {
        let registry = ProjectTypeRegistry::with_defaults();
        registry
            .register(
                ProjectTypeDescriptor::new("java", "Java")
                    .with_attribute(AttributeDefinition::variable("languageLevel"))
                    .with_attribute(AttributeDefinition::constant("language", ["java"])),
            )
            .unwrap();
        registry
            .register(
                ProjectTypeDescriptor::new("maven", "Maven")
                    .with_parent("java")
                    .primary_only()
                    .auto_detect()
                    .with_attribute(
                        AttributeDefinition::variable("languageLevel")
                            .required()
                            .detected_by(
                                Detector::capture("pom.xml", r"<source>([^<]+)</source>").unwrap(),
                            ),
                    )
                    .with_attribute(AttributeDefinition::variable("artifactId").required()),
            )
            .unwrap();
        registry
            .register(ProjectTypeDescriptor::new("git", "Git").mixin_only())
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = registry();
        assert_eq!(
            registry.register(ProjectTypeDescriptor::new("maven", "Again")),
            Err(RegistryError::DuplicateType("maven".into()))
        );
    }

    #[test]
    fn unknown_parent_fails() {
        let registry = ProjectTypeRegistry::new();
        assert!(matches!(
            registry.register(ProjectTypeDescriptor::new("child", "Child").with_parent("nope")),
            Err(RegistryError::UnknownParent { .. })
        ));
    }

    #[test]
    fn get_missing_is_not_found() {
        assert_eq!(
            registry().get("npm").unwrap_err(),
            RegistryError::NotFound("npm".into())
        );
    }

    #[test]
    fn ids_keep_registration_order() {
        assert_eq!(registry().ids(), vec!["blank", "java", "maven", "git"]);
    }

    #[test]
    fn child_definition_overrides_parent() {
        let defs = registry().resolve_attribute_definitions("maven").unwrap();
        let names: Vec<_> = defs.keys().cloned().collect();
        assert_eq!(names, vec!["languageLevel", "language", "artifactId"]);
        assert!(defs["languageLevel"].required);
        assert!(defs["languageLevel"].detector().is_some());
    }

    #[test]
    fn detectable_types_filtered() {
        let ids: Vec<_> = registry()
            .detectable_types()
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(ids, vec!["maven"]);
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let config = ProjectConfig::new("maven")
            .with_attribute("artifactId", ["demo"])
            .with_mixin("git");
        assert!(registry().validate_config(&config).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_type() {
        let err = registry().validate_config(&ProjectConfig::new("npm")).unwrap_err();
        assert!(matches!(err, RegistryError::ConstraintViolation(_)));
    }

    #[test]
    fn validate_rejects_primary_only_mixin() {
        let config = ProjectConfig::new("blank").with_mixin("maven");
        assert!(matches!(
            registry().validate_config(&config),
            Err(RegistryError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn validate_rejects_mixin_only_primary() {
        assert!(registry().validate_config(&ProjectConfig::new("git")).is_err());
    }

    #[test]
    fn validate_rejects_missing_required() {
        // languageLevel is detectable, artifactId is not
        let err = registry()
            .validate_config(&ProjectConfig::new("maven"))
            .unwrap_err();
        assert!(err.to_string().contains("artifactId"));
    }

    #[test]
    fn validate_rejects_overridden_constant() {
        let config = ProjectConfig::new("java").with_attribute("language", ["kotlin"]);
        assert!(registry().validate_config(&config).is_err());
    }

    #[test]
    fn effective_attributes_overlay_constants() {
        let config = ProjectConfig::new("maven")
            .with_attribute("artifactId", ["demo"])
            .with_attribute("language", ["ignored"]);
        let attrs = registry().effective_attributes(&config).unwrap();
        assert_eq!(attrs["artifactId"].origin(), ValueOrigin::Declared);
        assert_eq!(attrs["language"].values().to_vec(), vec!["java".to_string()]);
        assert_eq!(attrs["language"].origin(), ValueOrigin::Constant);
    }
}
