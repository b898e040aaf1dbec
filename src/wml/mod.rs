//! WordprocessingML: the built-in node set, document settings, and
//! whole-package assembly.

pub mod package;
pub mod settings;
pub mod types;

pub use package::{DOCUMENT_PART, DocumentPackage, SETTINGS_PART};
pub use settings::Settings;
pub use types::register_base_types;
