/// Crate-level error type wrapping the module errors.
use thiserror::Error;

/// Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Document model error
    #[error("model error: {0}")]
    Model(#[from] crate::model::ModelError),

    /// Package error
    #[error("package error: {0}")]
    Opc(#[from] crate::opc::OpcError),

    /// XML tree error
    #[error("XML error: {0}")]
    Xml(#[from] crate::xml::XmlError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
