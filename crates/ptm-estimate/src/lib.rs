//! PTM Estimate
//!
//! Read-only inference of a candidate project type's attributes from folder
//! contents, and ranking of all auto-detectable types for a folder.
//!
//! # Example
//!
//! ```
//! use ptm_estimate::{ScanMode, SourceEstimator};
//! use ptm_registry::{AttributeDefinition, Detector, ProjectTypeDescriptor, ProjectTypeRegistry};
//! use ptm_vfs::{MemoryFileSystem, TreePath};
//! use std::sync::Arc;
//!
//! let registry = ProjectTypeRegistry::with_defaults();
//! registry
//!     .register(
//!         ProjectTypeDescriptor::new("maven", "Maven").with_attribute(
//!             AttributeDefinition::variable("languageLevel")
//!                 .required()
//!                 .detected_by(Detector::capture("pom.xml", r"<source>([^<]+)</source>").unwrap()),
//!         ),
//!     )
//!     .unwrap();
//!
//! let fs = MemoryFileSystem::new()
//!     .with_file("/demo/pom.xml", "<source>1.8</source>")
//!     .unwrap();
//! let attrs = SourceEstimator::new(Arc::new(registry))
//!     .estimate(&fs, &TreePath::parse("/demo").unwrap(), "maven", ScanMode::Full)
//!     .unwrap();
//! assert_eq!(attrs["languageLevel"].first(), Some("1.8"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod estimator;

pub use error::EstimateError;
pub use estimator::{EstimateLimits, ScanMode, SourceEstimation, SourceEstimator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
