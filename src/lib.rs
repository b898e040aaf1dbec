//! Quince - a structured WordprocessingML document model for Rust
//!
//! This library builds and reads ZIP-packaged, multi-part XML office
//! documents through an in-memory tree of typed nodes. Producers assemble
//! paragraphs, runs, and tracked insertions/deletions; the library
//! legalizes the tree against its node-type registry, serializes it into a
//! compliant package, and parses existing packages back into the same tree
//! shape.
//!
//! # Features
//!
//! - **Node registry**: extensible node types with a parent/child
//!   acceptance contract and predicate-based decode dispatch
//! - **Structural repair**: invalid nesting is legalized before encoding,
//!   preserving every text leaf
//! - **Package model**: parts, relationships, and content types over a ZIP
//!   container, reading and writing
//! - **Tracked changes**: insertion/deletion metadata with millisecond
//!   round-trip of timestamps
//!
//! # Example - Building and reopening a document
//!
//! ```
//! use quince::model::{Node, Registry};
//! use quince::wml::{self, DocumentPackage, Settings};
//!
//! # fn main() -> Result<(), quince::Error> {
//! let mut registry = Registry::new();
//! wml::register_base_types(&mut registry)?;
//!
//! let document = Node::new("document").child(
//!     Node::new("body").child(
//!         Node::new("paragraph").child(Node::new("run").child("Hello, world")),
//!     ),
//! );
//!
//! let package = DocumentPackage::build(document, &Settings::new())?;
//! let bytes = package.to_bytes(&registry)?;
//!
//! let reopened = DocumentPackage::open(&bytes)?;
//! let tree = reopened.document(&registry)?;
//! assert_eq!(tree.leaf_text(), vec!["Hello, world"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Structural repair
//!
//! A tree violating the acceptance contract is split rather than rejected:
//! a paragraph nested inside a paragraph becomes two paragraphs around it.
//!
//! ```
//! use quince::model::{Node, Registry};
//! use quince::wml;
//!
//! # fn main() -> Result<(), quince::Error> {
//! let mut registry = Registry::new();
//! wml::register_base_types(&mut registry)?;
//!
//! let body = Node::new("body").child(
//!     Node::new("paragraph")
//!         .child(Node::new("run").child("before"))
//!         .child(Node::new("paragraph").child(Node::new("run").child("inner")))
//!         .child(Node::new("run").child("after")),
//! );
//!
//! let repaired = quince::model::repair_tree(&registry, body)?;
//! assert_eq!(repaired.children().len(), 3);
//! assert_eq!(repaired.leaf_text(), vec!["before", "inner", "after"]);
//! # Ok(())
//! # }
//! ```

/// Crate-level error type
mod error;

/// The in-memory document model: nodes, registry, repair, change metadata
pub mod model;

/// The package model: parts, relationships, content types, ZIP container
pub mod opc;

/// WordprocessingML node set and package assembly
pub mod wml;

/// XML node values and the injected transform capability
pub mod xml;

pub use error::{Error, Result};

// Re-export commonly used types for convenience
pub use model::{ChangeInformation, Node, NodeChild, PropBag, PropValue, Registry};
pub use opc::{Package, Part, PartName};
pub use wml::{DocumentPackage, Settings};
