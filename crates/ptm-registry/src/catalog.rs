//! TOML type catalog
//!
//! Project types declared in configuration instead of code:
//!
//! ```toml
//! [[project_type]]
//! id = "maven"
//! display_name = "Maven"
//! parents = ["java"]
//! mixable = false
//! auto_detect = true
//!
//! [[project_type.attribute]]
//! name = "languageLevel"
//! required = true
//!
//! [project_type.attribute.detector]
//! file = "pom.xml"
//! pattern = "<source>([^<]+)</source>"
//! ```

use crate::error::RegistryError;
use crate::project_type::{AttributeDefinition, Detector, ProjectTypeDescriptor};
use crate::type_registry::ProjectTypeRegistry;
use serde::Deserialize;
use std::path::Path;

/// Parsed catalog document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeCatalog {
    #[serde(default, rename = "project_type")]
    pub types: Vec<TypeSpec>,
}

/// One `[[project_type]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct TypeSpec {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default = "default_true")]
    pub primary: bool,
    #[serde(default = "default_true")]
    pub mixable: bool,
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeSpec>,
}

/// One `[[project_type.attribute]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Makes the attribute constant
    #[serde(default)]
    pub constant: Option<Vec<String>>,
    #[serde(default)]
    pub detector: Option<DetectorSpec>,
}

/// `[project_type.attribute.detector]` table
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSpec {
    pub file: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
}

fn default_true() -> bool {
    true
}

impl TypeCatalog {
    /// Parse a catalog document
    ///
    /// # Errors
    /// `RegistryError::Catalog` on malformed TOML
    pub fn from_toml_str(raw: &str) -> Result<Self, RegistryError> {
        toml::from_str(raw).map_err(|e| RegistryError::Catalog(e.to_string()))
    }

    /// Read and parse a catalog file
    ///
    /// # Errors
    /// `RegistryError::Catalog` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Build descriptors, compiling detector patterns
    ///
    /// # Errors
    /// `RegistryError::InvalidDetector` if a pattern does not compile
    pub fn descriptors(&self) -> Result<Vec<ProjectTypeDescriptor>, RegistryError> {
        self.types.iter().map(TypeSpec::to_descriptor).collect()
    }

    /// Register every type, in document order
    ///
    /// Returns the number of registered types.
    ///
    /// # Errors
    /// Stops at the first descriptor or registration error
    pub fn register_into(&self, registry: &ProjectTypeRegistry) -> Result<usize, RegistryError> {
        let descriptors = self.descriptors()?;
        let count = descriptors.len();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        tracing::info!(count, "type catalog registered");
        Ok(count)
    }
}

impl TypeSpec {
    fn to_descriptor(&self) -> Result<ProjectTypeDescriptor, RegistryError> {
        let display_name = self.display_name.clone().unwrap_or_else(|| self.id.clone());
        let mut descriptor = ProjectTypeDescriptor::new(&self.id, display_name)
            .with_roles(self.primary, self.mixable);
        if self.auto_detect {
            descriptor = descriptor.auto_detect();
        }
        for parent in &self.parents {
            descriptor = descriptor.with_parent(parent);
        }
        for attribute in &self.attributes {
            descriptor = descriptor.with_attribute(attribute.to_definition(&self.id)?);
        }
        Ok(descriptor)
    }
}

impl AttributeSpec {
    fn to_definition(&self, type_id: &str) -> Result<AttributeDefinition, RegistryError> {
        let mut definition = match &self.constant {
            Some(values) => AttributeDefinition::constant(&self.name, values.clone()),
            None => AttributeDefinition::variable(&self.name),
        }
        .with_description(&self.description);
        if self.required {
            definition = definition.required();
        }
        if let Some(spec) = &self.detector {
            let detector = match &spec.pattern {
                Some(pattern) => Detector::capture(&spec.file, pattern).map_err(|e| {
                    RegistryError::InvalidDetector {
                        type_id: type_id.to_string(),
                        attribute: self.name.clone(),
                        message: e.to_string(),
                    }
                })?,
                None => Detector::presence(&spec.file, spec.values.clone()),
            };
            definition = definition.detected_by(if spec.recursive {
                detector.recursive()
            } else {
                detector
            });
        }
        Ok(definition)
    }
}
