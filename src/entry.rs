//! Abstract entries and bound results
//!
//! An [`AbstractEntry`] is what a client asks for: a tag, a name and some
//! requested attributes. Binding fills in the attributes and text and also
//! returns them as a standalone [`BoundResult`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A request for one configuration artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbstractEntry {
    /// Entry kind, e.g. `Path`
    pub tag: String,
    /// Absolute entry name, e.g. `/etc/motd`
    pub name: String,
    /// Requested and, after binding, resolved attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Bound text; `None` until bound or when the content is empty
    #[serde(default)]
    pub text: Option<String>,
    /// Set when binding produced zero-length content
    #[serde(default)]
    pub empty: bool,
}

impl AbstractEntry {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// A `Path` entry, the common case
    pub fn path(name: impl Into<String>) -> Self {
        Self::new("Path", name)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Name the client sees, which may differ from the repository name.
    pub fn realname(&self) -> &str {
        self.get("realname").unwrap_or(&self.name)
    }

    /// Whether the entry asks for base64 transport
    pub fn is_base64(&self) -> bool {
        self.get("encoding")
            .is_some_and(|e| e.eq_ignore_ascii_case("base64"))
    }

    /// Whether permissions should be taken from the source file on disk
    pub fn inherits_perms(&self) -> bool {
        self.get("perms")
            .is_some_and(|p| p.eq_ignore_ascii_case("inherit"))
    }
}

/// File data as it moves through the pipeline.
///
/// Generators that render templates produce text directly; everything else
/// produces raw bytes that the encode stage decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Bytes(Vec<u8>),
    Text(String),
}

impl Data {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Data::Bytes(bytes) => bytes,
            Data::Text(text) => text.as_bytes(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Data::Bytes(bytes) => bytes,
            Data::Text(text) => text.into_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Content of a bound entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum BoundContent {
    Text(String),
    /// Explicitly empty, distinct from "no text set"
    Empty,
}

/// How the bound text is carried to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportEncoding {
    Text,
    Base64,
}

/// Outcome of a successful bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundResult {
    pub content: BoundContent,
    pub attributes: BTreeMap<String, String>,
    pub encoding: TransportEncoding,
    /// Non-fatal diagnostics raised while binding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl BoundResult {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BoundContent::Text(text) => Some(text),
            BoundContent::Empty => None,
        }
    }

    /// Write the result onto the requesting entry.
    pub fn apply_to(&self, entry: &mut AbstractEntry) {
        entry.attributes = self.attributes.clone();
        match &self.content {
            BoundContent::Text(text) => {
                entry.text = Some(text.clone());
                entry.empty = false;
                entry.attributes.remove("empty");
            }
            BoundContent::Empty => {
                entry.text = None;
                entry.empty = true;
                entry.set("empty", "true");
            }
        }
    }
}
