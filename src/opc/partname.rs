//! The part-name value type.
//!
//! A part name is the case-significant, slash-separated path of a resource
//! inside the package, always written with a leading slash. The package
//! itself is addressed by the pseudo-name `/`.

use super::error::{OpcError, Result};

/// Pseudo part name addressing the package itself.
pub const PACKAGE_ROOT: &str = "/";

/// Part name of the content-type declaration stream.
pub const CONTENT_TYPES_NAME: &str = "/[Content_Types].xml";

/// A validated part name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartName(String);

impl PartName {
    /// Create a part name, validating the leading slash.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if !name.starts_with('/') {
            return Err(OpcError::InvalidPartName(format!(
                "part name must begin with a slash, got '{name}'"
            )));
        }
        if name.len() > 1 && name.ends_with('/') {
            return Err(OpcError::InvalidPartName(format!(
                "part name must not end with a slash, got '{name}'"
            )));
        }
        Ok(PartName(name))
    }

    /// Resolve a relative reference from a `.rels` file against a base URI
    /// into an absolute part name.
    ///
    /// `resolve("/word", "../styles.xml")` yields `/styles.xml`.
    pub fn resolve(base_uri: &str, reference: &str) -> Result<Self> {
        let joined = if reference.starts_with('/') {
            reference.to_string()
        } else if base_uri.ends_with('/') {
            format!("{base_uri}{reference}")
        } else {
            format!("{base_uri}/{reference}")
        };

        let mut parts: Vec<&str> = Vec::new();
        for segment in joined.split('/') {
            match segment {
                "" | "." => {},
                ".." => {
                    if parts.pop().is_none() {
                        return Err(OpcError::InvalidPartName(format!(
                            "reference '{reference}' escapes the package root"
                        )));
                    }
                },
                other => parts.push(other),
            }
        }
        Self::new(format!("/{}", parts.join("/")))
    }

    /// The directory portion, e.g. `/word` for `/word/document.xml`.
    pub fn base_uri(&self) -> &str {
        match self.0.rfind('/') {
            Some(0) => "/",
            Some(pos) => &self.0[..pos],
            None => "/",
        }
    }

    /// The file portion, e.g. `document.xml`.
    pub fn filename(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => "",
        }
    }

    /// The extension without its period, e.g. `xml`; empty when absent.
    pub fn ext(&self) -> &str {
        match self.filename().rfind('.') {
            Some(pos) => &self.filename()[pos + 1..],
            None => "",
        }
    }

    /// The ZIP member name: the part name with its leading slash stripped.
    pub fn membername(&self) -> &str {
        if self.0 == PACKAGE_ROOT { "" } else { &self.0[1..] }
    }

    /// The name of this part's `.rels` companion,
    /// e.g. `/word/_rels/document.xml.rels` for `/word/document.xml` and
    /// `/_rels/.rels` for the package root.
    pub fn rels_name(&self) -> PartName {
        let dir = self.base_uri();
        let name = if dir == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{dir}/_rels/{}.rels", self.filename())
        };
        PartName(name)
    }

    /// The relative reference from `base_uri` to this part, the form used
    /// as a relationship target.
    pub fn relative_from(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = String::new();
        for _ in common..from.len() {
            out.push_str("../");
        }
        out.push_str(&to[common..].join("/"));
        out
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PartName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
