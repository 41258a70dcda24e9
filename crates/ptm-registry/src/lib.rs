//! PTM Registry
//!
//! Process-wide registries populated at startup and read concurrently
//! afterwards:
//!
//! - [`ProjectTypeRegistry`]: type descriptors, inheritance, config validation
//! - [`ProjectHandlerRegistry`]: lifecycle callbacks keyed by (event, type)
//! - [`TypeCatalog`]: TOML declaration of project types
//!
//! # Example
//!
//! ```
//! use ptm_registry::{AttributeDefinition, Detector, ProjectTypeDescriptor, ProjectTypeRegistry};
//!
//! let registry = ProjectTypeRegistry::with_defaults();
//! registry
//!     .register(
//!         ProjectTypeDescriptor::new("maven", "Maven")
//!             .primary_only()
//!             .auto_detect()
//!             .with_attribute(
//!                 AttributeDefinition::variable("languageLevel")
//!                     .required()
//!                     .detected_by(Detector::capture("pom.xml", r"<source>([^<]+)</source>").unwrap()),
//!             ),
//!     )
//!     .unwrap();
//! assert_eq!(registry.ids(), vec!["blank", "maven"]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod error;
pub mod handler;
pub mod project_type;
pub mod type_registry;

pub use catalog::TypeCatalog;
pub use error::RegistryError;
pub use handler::{
    FnHandler, HandlerContext, HandlerError, HandlerEvent, ProjectHandler, ProjectHandlerRegistry,
};
pub use project_type::{AttributeDefinition, AttributeKind, Detector, ProjectTypeDescriptor};
pub use type_registry::{ProjectTypeRegistry, BLANK_TYPE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
