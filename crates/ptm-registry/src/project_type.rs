//! Project type descriptors
//!
//! A descriptor declares which attributes a type contributes, how each one
//! is valued (constant, declared, or detected from folder contents), and
//! where the type may appear in a config (primary, mixin, or both).

use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeSet;

/// Structural rule deriving an attribute value from folder contents
///
/// - without a pattern, the presence of `file` yields `values`
/// - with a pattern, each match in the file's text yields its first
///   capture group (or the whole match when the pattern has no groups)
#[derive(Debug, Clone)]
pub struct Detector {
    file: String,
    pattern: Option<Regex>,
    values: Vec<String>,
    recursive: bool,
}

impl Detector {
    /// Presence of `file` implies `values`
    #[must_use]
    pub fn presence<I, S>(file: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file: file.into(),
            pattern: None,
            values: values.into_iter().map(Into::into).collect(),
            recursive: false,
        }
    }

    /// Values captured from the text of `file`
    ///
    /// # Errors
    /// Returns the regex error if `pattern` does not compile
    pub fn capture(file: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            file: file.into(),
            pattern: Some(Regex::new(pattern)?),
            values: Vec::new(),
            recursive: false,
        })
    }

    /// Search the whole subtree instead of the folder itself
    #[inline]
    #[must_use]
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// File name the detector looks for
    #[inline]
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Compiled content pattern
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Values implied by presence
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether the subtree is searched
    #[inline]
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Extract values from file text; empty when nothing matches
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return self.values.clone();
        };
        let mut out: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(text) {
            let found = caps.get(1).or_else(|| caps.get(0));
            if let Some(m) = found {
                let value = m.as_str().trim().to_string();
                if !value.is_empty() && !out.contains(&value) {
                    out.push(value);
                }
            }
        }
        out
    }
}

/// How an attribute gets its value
#[derive(Debug, Clone)]
pub enum AttributeKind {
    /// Fixed by the type
    Constant(Vec<String>),
    /// Declared in the config, optionally detectable
    Variable { detector: Option<Detector> },
}

/// Attribute declared by a project type
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub kind: AttributeKind,
}

impl AttributeDefinition {
    /// Optional declared attribute without detection
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
            kind: AttributeKind::Variable { detector: None },
        }
    }

    /// Constant attribute
    #[must_use]
    pub fn constant<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
            kind: AttributeKind::Constant(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach a detector (turns a constant into a variable)
    #[inline]
    #[must_use]
    pub fn detected_by(mut self, detector: Detector) -> Self {
        self.kind = AttributeKind::Variable {
            detector: Some(detector),
        };
        self
    }

    /// Detector, if any
    #[inline]
    #[must_use]
    pub fn detector(&self) -> Option<&Detector> {
        match &self.kind {
            AttributeKind::Variable { detector } => detector.as_ref(),
            AttributeKind::Constant(_) => None,
        }
    }

    /// Constant values, if constant
    #[inline]
    #[must_use]
    pub fn constant_values(&self) -> Option<&[String]> {
        match &self.kind {
            AttributeKind::Constant(values) => Some(values),
            AttributeKind::Variable { .. } => None,
        }
    }

    /// Required and only obtainable by declaration
    #[inline]
    #[must_use]
    pub fn must_be_declared(&self) -> bool {
        self.required && matches!(self.kind, AttributeKind::Variable { detector: None })
    }
}

/// Registered project type
#[derive(Debug, Clone)]
pub struct ProjectTypeDescriptor {
    id: String,
    display_name: String,
    parents: BTreeSet<String>,
    attributes: IndexMap<String, AttributeDefinition>,
    primary: bool,
    mixable: bool,
    auto_detect: bool,
}

impl ProjectTypeDescriptor {
    /// Type usable both as primary and as mixin, not auto-detected
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            parents: BTreeSet::new(),
            attributes: IndexMap::new(),
            primary: true,
            mixable: true,
            auto_detect: false,
        }
    }

    /// Inherit attribute definitions from `parent`
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.insert(parent.into());
        self
    }

    /// Declare an attribute (replaces one with the same name)
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    /// Only allowed as the primary type
    #[inline]
    #[must_use]
    pub fn primary_only(mut self) -> Self {
        self.primary = true;
        self.mixable = false;
        self
    }

    /// Only allowed as a mixin
    #[inline]
    #[must_use]
    pub fn mixin_only(mut self) -> Self {
        self.primary = false;
        self.mixable = true;
        self
    }

    /// Eligible for source resolution
    #[inline]
    #[must_use]
    pub fn auto_detect(mut self) -> Self {
        self.auto_detect = true;
        self
    }

    /// Set role flags explicitly
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, primary: bool, mixable: bool) -> Self {
        self.primary = primary;
        self.mixable = mixable;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    /// Attributes declared directly on this type, in declaration order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, AttributeDefinition> {
        &self.attributes
    }

    #[inline]
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    #[inline]
    #[must_use]
    pub fn is_mixable(&self) -> bool {
        self.mixable
    }

    /// Can only be the sole top-level type
    #[inline]
    #[must_use]
    pub fn is_primary_only(&self) -> bool {
        self.primary && !self.mixable
    }

    #[inline]
    #[must_use]
    pub fn is_auto_detect(&self) -> bool {
        self.auto_detect
    }
}
