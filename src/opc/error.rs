/// Error types for package operations.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpcError>;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("duplicate part: {0}")]
    DuplicatePart(String),

    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("invalid part name: {0}")]
    InvalidPartName(String),

    #[error("no resolvable content type for part: {0}")]
    UnresolvedContentType(String),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("model error: {0}")]
    Model(#[from] crate::model::ModelError),

    #[error("XML error: {0}")]
    Xml(#[from] crate::xml::XmlError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
