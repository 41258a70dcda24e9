//! Declared project configuration and attribute values

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Declared configuration of a project
///
/// Immutable value: builders return a new config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Primary project type id
    #[serde(rename = "type")]
    pub project_type: String,
    /// Declared attribute values (multi-valued)
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Secondary types contributing attributes
    #[serde(default)]
    pub mixins: BTreeSet<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectConfig {
    /// Config of the given primary type with nothing else declared
    #[inline]
    #[must_use]
    pub fn new(project_type: impl Into<String>) -> Self {
        Self {
            project_type: project_type.into(),
            attributes: BTreeMap::new(),
            mixins: BTreeSet::new(),
            description: None,
        }
    }

    /// With an attribute (replaces an existing one of the same name)
    #[must_use]
    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// With a mixin type
    #[inline]
    #[must_use]
    pub fn with_mixin(mut self, mixin: impl Into<String>) -> Self {
        self.mixins.insert(mixin.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declared values of an attribute
    ///
    /// `Some(&[])` and `None` differ: the first is declared-but-empty.
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Primary type followed by mixins in sorted order
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.project_type.as_str()).chain(self.mixins.iter().map(String::as_str))
    }
}

/// Where an attribute value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrigin {
    /// Set explicitly in a [`ProjectConfig`]
    Declared,
    /// Inferred from folder contents
    Estimated,
    /// Fixed by the project type definition
    Constant,
}

/// Value of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    values: Vec<String>,
    origin: ValueOrigin,
}

impl AttributeValue {
    /// Create value with explicit origin
    #[inline]
    #[must_use]
    pub fn new(values: Vec<String>, origin: ValueOrigin) -> Self {
        Self { values, origin }
    }

    /// Explicitly declared value
    #[inline]
    #[must_use]
    pub fn declared(values: Vec<String>) -> Self {
        Self::new(values, ValueOrigin::Declared)
    }

    /// Value derived by estimation
    #[inline]
    #[must_use]
    pub fn estimated(values: Vec<String>) -> Self {
        Self::new(values, ValueOrigin::Estimated)
    }

    /// All values
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// First value, if any
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Origin of the value
    #[inline]
    #[must_use]
    pub fn origin(&self) -> ValueOrigin {
        self.origin
    }

    /// True if the value was set rather than derived
    #[inline]
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.origin == ValueOrigin::Declared
    }

    /// True if present but holding no values
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume into values
    #[inline]
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Who can see a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to every workspace member
    #[default]
    Public,
    /// Visible to the owner only
    Private,
}

impl Visibility {
    /// Canonical string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = UnknownVisibility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(UnknownVisibility(s.to_string())),
        }
    }
}

/// Unparseable visibility string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown visibility: '{0}'")]
pub struct UnknownVisibility(pub String);
