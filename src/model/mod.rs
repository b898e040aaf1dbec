//! The in-memory document model: typed nodes, the node-type registry, the
//! structural validator, and change-tracking metadata.

pub mod change;
pub mod compose;
mod error;
pub mod node;
pub mod props;
pub mod registry;
pub mod repair;

pub use change::ChangeInformation;
pub use error::{ModelError, Result};
pub use node::{Ancestry, Node, NodeChild};
pub use props::{PropBag, PropValue};
pub use registry::{DecodeContext, EncodeContext, NodeType, Registry};
pub use repair::repair_tree;
