/// Error types for document model operations.
use thiserror::Error;

/// Result type for document model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Error types for the node registry, tree repair, and node codecs.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A node type with this name is already registered
    #[error("duplicate node type: {0}")]
    DuplicateType(String),

    /// No node type with this name is registered
    #[error("unknown node type: {0}")]
    UnknownType(String),

    /// Decode found no acceptable type for an element in its context
    #[error("no accepted type matches <{element}> under '{context}'")]
    NoMatchingType { element: String, context: String },

    /// The tree cannot be legalized into a single root
    #[error("structural repair failed: {0}")]
    StructuralRepair(String),

    /// Required change-tracking attribute absent or unparsable
    #[error("malformed change metadata: {0}")]
    MalformedChangeMetadata(String),

    /// A numeric prop held a non-finite value
    #[error("invalid parameter at '{path}': {reason}")]
    InvalidParameter { path: String, reason: String },

    /// Registration attempted after the registry started encoding/decoding
    #[error("registry is sealed; register node types before first use")]
    SealedRegistry,

    /// XML tree error
    #[error("XML error: {0}")]
    Xml(#[from] crate::xml::XmlError),
}
