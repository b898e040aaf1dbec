//! The package model: parts, relationships, content types, and the physical
//! ZIP container.

pub mod constants;
pub mod content_types;
mod error;
pub mod package;
pub mod part;
pub mod partname;
pub mod phys;
pub mod rel;

pub use content_types::ContentTypes;
pub use error::{OpcError, Result};
pub use package::Package;
pub use part::{Part, PartContent};
pub use partname::{CONTENT_TYPES_NAME, PACKAGE_ROOT, PartName};
pub use rel::{Relationship, Relationships};
