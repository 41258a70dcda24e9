//! Encoding of the project layer into storage metadata
//!
//! Keys:
//! - `project.config` – JSON of [`ProjectConfig`]; its presence marks a folder as a project
//! - `project.visibility` – `public` / `private`
//! - `project.misc.<key>` – one entry per [`ProjectMisc`] key
//! - `file.mediaType` – media type of a file

use crate::config::{ProjectConfig, Visibility};
use crate::error::SidecarError;
use crate::misc::ProjectMisc;
use ptm_vfs::Metadata;
use std::collections::BTreeMap;

/// Metadata key holding the JSON config
pub const KEY_CONFIG: &str = "project.config";
/// Metadata key holding the visibility
pub const KEY_VISIBILITY: &str = "project.visibility";
/// Prefix of misc entries
pub const MISC_PREFIX: &str = "project.misc.";
/// Metadata key holding a file's media type
pub const KEY_MEDIA_TYPE: &str = "file.mediaType";

/// Project layer state of one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSidecar {
    /// Declared config
    pub config: ProjectConfig,
    /// Visibility
    pub visibility: Visibility,
    /// Misc bag
    pub misc: ProjectMisc,
}

impl ProjectSidecar {
    /// Build from parts
    #[inline]
    #[must_use]
    pub fn new(config: ProjectConfig, visibility: Visibility, misc: ProjectMisc) -> Self {
        Self {
            config,
            visibility,
            misc,
        }
    }

    /// Decode from item metadata; `Ok(None)` for plain folders
    ///
    /// # Errors
    /// `SidecarError` if the stored config or visibility is corrupt
    pub fn from_metadata(metadata: &Metadata) -> Result<Option<Self>, SidecarError> {
        let Some(raw) = metadata.get(KEY_CONFIG) else {
            return Ok(None);
        };
        let config: ProjectConfig =
            serde_json::from_str(raw).map_err(|e| SidecarError::CorruptConfig(e.to_string()))?;
        let visibility = match metadata.get(KEY_VISIBILITY) {
            Some(raw) => raw
                .parse()
                .map_err(|e: crate::config::UnknownVisibility| SidecarError::CorruptVisibility(e.0))?,
            None => Visibility::default(),
        };
        Ok(Some(Self {
            config,
            visibility,
            misc: decode_misc(metadata),
        }))
    }

    /// Write into `metadata`, replacing any previous project keys
    ///
    /// Keys outside the project namespace are preserved.
    ///
    /// # Errors
    /// `SidecarError::CorruptConfig` if the config cannot be serialized
    pub fn write_into(&self, metadata: &mut Metadata) -> Result<(), SidecarError> {
        strip_project(metadata);
        let raw = serde_json::to_string(&self.config)
            .map_err(|e| SidecarError::CorruptConfig(e.to_string()))?;
        metadata.insert(KEY_CONFIG.to_string(), raw);
        metadata.insert(
            KEY_VISIBILITY.to_string(),
            self.visibility.as_str().to_string(),
        );
        encode_misc(metadata, &self.misc);
        Ok(())
    }

    /// Fresh metadata holding only this sidecar
    ///
    /// # Errors
    /// `SidecarError::CorruptConfig` if the config cannot be serialized
    pub fn to_metadata(&self) -> Result<Metadata, SidecarError> {
        let mut metadata = Metadata::new();
        self.write_into(&mut metadata)?;
        Ok(metadata)
    }
}

/// Check if metadata marks a project
#[inline]
#[must_use]
pub fn is_project(metadata: &Metadata) -> bool {
    metadata.contains_key(KEY_CONFIG)
}

/// Read the misc bag (empty if none stored)
#[must_use]
pub fn decode_misc(metadata: &Metadata) -> ProjectMisc {
    let entries: BTreeMap<String, String> = metadata
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(MISC_PREFIX)
                .map(|key| (key.to_string(), v.clone()))
        })
        .collect();
    ProjectMisc::from_entries(entries)
}

/// Replace the misc bag in `metadata`
pub fn encode_misc(metadata: &mut Metadata, misc: &ProjectMisc) {
    metadata.retain(|k, _| !k.starts_with(MISC_PREFIX));
    for (key, value) in misc.iter() {
        metadata.insert(format!("{MISC_PREFIX}{key}"), value.to_string());
    }
}

/// Remove every project key, leaving a plain folder
pub fn strip_project(metadata: &mut Metadata) {
    metadata.retain(|k, _| k != KEY_CONFIG && k != KEY_VISIBILITY && !k.starts_with(MISC_PREFIX));
}

/// Media type of a file, if recorded
#[inline]
#[must_use]
pub fn media_type(metadata: &Metadata) -> Option<&str> {
    metadata.get(KEY_MEDIA_TYPE).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ProjectSidecar {
        let mut misc = ProjectMisc::new();
        misc.set("synchronized", "true");
        ProjectSidecar::new(
            ProjectConfig::new("maven").with_attribute("languageLevel", ["1.8"]),
            Visibility::Private,
            misc,
        )
    }

    #[test]
    fn plain_folder_has_no_sidecar() {
        assert_eq!(ProjectSidecar::from_metadata(&Metadata::new()).unwrap(), None);
    }

    #[test]
    fn write_then_read() {
        let sidecar = sample();
        let metadata = sidecar.to_metadata().unwrap();
        assert!(is_project(&metadata));
        assert_eq!(metadata.get("project.misc.synchronized").map(String::as_str), Some("true"));
        assert_eq!(ProjectSidecar::from_metadata(&metadata).unwrap(), Some(sidecar));
    }

    #[test]
    fn write_preserves_foreign_keys_and_drops_old_misc() {
        let mut metadata = sample().to_metadata().unwrap();
        metadata.insert("vcs.branch".into(), "main".into());

        let replacement = ProjectSidecar::new(
            ProjectConfig::new("blank"),
            Visibility::Public,
            ProjectMisc::new(),
        );
        replacement.write_into(&mut metadata).unwrap();

        assert_eq!(metadata.get("vcs.branch").map(String::as_str), Some("main"));
        assert!(!metadata.contains_key("project.misc.synchronized"));
    }

    #[test]
    fn corrupt_config_is_reported() {
        let mut metadata = Metadata::new();
        metadata.insert(KEY_CONFIG.into(), "{not json".into());
        assert!(matches!(
            ProjectSidecar::from_metadata(&metadata),
            Err(SidecarError::CorruptConfig(_))
        ));
    }

    #[test]
    fn corrupt_visibility_is_reported() {
        let mut metadata = sample().to_metadata().unwrap();
        metadata.insert(KEY_VISIBILITY.into(), "hidden".into());
        assert!(matches!(
            ProjectSidecar::from_metadata(&metadata),
            Err(SidecarError::CorruptVisibility(_))
        ));
    }

    #[test]
    fn strip_leaves_plain_folder() {
        let mut metadata = sample().to_metadata().unwrap();
        metadata.insert(KEY_MEDIA_TYPE.into(), "text/plain".into());
        strip_project(&mut metadata);
        assert!(!is_project(&metadata));
        assert_eq!(media_type(&metadata), Some("text/plain"));
    }
}
